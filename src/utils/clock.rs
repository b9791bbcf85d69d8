use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// 时间源，返回 Unix 毫秒时间戳
///
/// 令牌的分数、桶的 TTL 都以毫秒计，所以这里只暴露毫秒。
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// 手动推进的时钟，测试里用来固定 "now"
///
/// 克隆出来的实例共享同一个时间。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    /// 从 RFC 3339 时间字符串创建，例如 `2023-12-25T00:00:00.000Z`
    pub fn at(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(rfc3339)?;
        Ok(Self::new(instant.timestamp_millis()))
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
