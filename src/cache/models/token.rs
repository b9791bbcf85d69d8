use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 漏桶中的令牌
///
/// `id` 在同一个桶内严格递增，`expires_at` 是 Unix 毫秒时间戳，
/// 不晚于 "now" 的令牌视为过期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub id: u64,
    pub expires_at: i64,
}

impl Token {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at)
    }
}

impl From<(u64, i64)> for Token {
    fn from((id, expires_at): (u64, i64)) -> Self {
        Self { id, expires_at }
    }
}
