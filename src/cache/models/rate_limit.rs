use std::time::Duration;

/// 默认令牌寿命：2 分钟
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(2 * 60);

/// 默认桶 TTL：20 分钟
pub const DEFAULT_RESET_EXPIRATION: Duration = Duration::from_secs(20 * 60);

/// 并发插入冲突时的重试策略（指数退避，有上限）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次失败后的等待时间（从 1 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// 漏桶参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketOptions {
    /// 单个令牌的寿命
    pub expiration: Duration,
    /// 每次 increment 后刷新的整桶 TTL，防止桶被遗弃后一直占用存储
    pub reset_expiration: Duration,
    pub retry: RetryPolicy,
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRATION, DEFAULT_RESET_EXPIRATION)
    }
}

impl BucketOptions {
    pub fn new(expiration: Duration, reset_expiration: Duration) -> Self {
        Self {
            expiration,
            reset_expiration,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn expiration_ms(&self) -> i64 {
        i64::try_from(self.expiration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { count: u64 },
    /// 超出上限，预留的令牌已回滚
    Rejected { count: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.backoff(1), Duration::from_millis(1));
        assert_eq!(retry.backoff(2), Duration::from_millis(2));
        assert_eq!(retry.backoff(4), Duration::from_millis(8));
        assert_eq!(retry.backoff(7), Duration::from_millis(50));
        assert_eq!(retry.backoff(u32::MAX), Duration::from_millis(50));
    }

    #[test]
    fn default_options_match_two_and_twenty_minutes() {
        let options = BucketOptions::default();
        assert_eq!(options.expiration_ms(), 120_000);
        assert_eq!(options.reset_expiration, Duration::from_millis(1_200_000));
    }
}
