use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::models::{Admission, BucketOptions, Token};
use crate::cache::store::{OrderedStore, ScoreBound};
use crate::error::BucketError;
use crate::utils::{Clock, SystemClock};

/// 新令牌的过期时间
///
/// 新令牌排在最后一个令牌之后，间隔随桶内令牌数线性增长：
/// `last_expires_at + expiration * count`。空桶时 `last_expires_at` 取 now。
pub fn next_expiry(last_expires_at: i64, expiration_ms: i64, count: u64) -> i64 {
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    last_expires_at.saturating_add(expiration_ms.saturating_mul(count))
}

/// 基于有序集合的分布式漏桶
///
/// 桶本身不保存任何状态，所有状态都在存储的 `key` 下。多个进程可以同时
/// 操作同一个桶：`increment` 以 "成员不存在才插入" 作为唯一的并发控制点，
/// 冲突时重新读取状态并重试。
pub struct LeakyBucket<S: OrderedStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    key: String,
    options: BucketOptions,
}

impl<S: OrderedStore> LeakyBucket<S> {
    pub fn new(store: Arc<S>, key: impl Into<String>, options: BucketOptions) -> Self {
        Self::with_clock(store, key, options, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<S>,
        key: impl Into<String>,
        options: BucketOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            clock,
            key: key.into(),
            options,
        }
    }

    /// 放入一个令牌，返回放入后桶内的令牌数
    ///
    /// 插入冲突会按 [`RetryPolicy`](crate::cache::models::RetryPolicy) 退避重试，
    /// 次数耗尽时返回 [`BucketError::AdmissionTimedOut`]。存储错误直接返回，不重试。
    pub async fn increment(&self) -> Result<u64, BucketError> {
        let retry = self.options.retry;
        let max_attempts = retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if let Some(count) = self.try_increment().await? {
                debug!(key = %self.key, count, attempt, "token admitted");
                return Ok(count);
            }

            debug!(key = %self.key, attempt, "token id already claimed, retrying");
            if attempt < max_attempts {
                tokio::time::sleep(retry.backoff(attempt)).await;
            }
        }

        warn!(key = %self.key, attempts = max_attempts, "increment gave up after conflicts");
        Err(BucketError::AdmissionTimedOut {
            key: self.key.clone(),
            attempts: max_attempts,
        })
    }

    /// 单次尝试，成员 ID 已被其他调用方占用时返回 `None`
    async fn try_increment(&self) -> Result<Option<u64>, BucketError> {
        let now = self.clock.now_ms();

        self.store
            .range_remove_by_score(&self.key, ScoreBound::NegInf, ScoreBound::Inclusive(now))
            .await?;

        let tokens = self
            .store
            .range_query_by_score(&self.key, ScoreBound::NegInf, ScoreBound::PosInf)
            .await?;

        let (last_id, last_expires_at) = tokens.last().copied().unwrap_or((0, now));
        let count = tokens.len() as u64 + 1;
        let expires_at = next_expiry(last_expires_at, self.options.expiration_ms(), count);

        let inserted = self
            .store
            .conditional_insert(&self.key, expires_at, last_id.saturating_add(1))
            .await?;

        // 无论是否插入成功都刷新 TTL
        self.store
            .set_ttl(&self.key, self.options.reset_expiration)
            .await?;

        Ok(inserted.then_some(count))
    }

    /// 撤销最近放入的令牌（分数最高的那个），空桶时什么也不做，不刷新 TTL
    pub async fn decrement(&self) -> Result<(), BucketError> {
        self.store.range_remove_by_rank(&self.key, -1, -1).await?;
        Ok(())
    }

    /// 未过期的令牌数（分数 >= now），不会清理过期令牌
    pub async fn count(&self) -> Result<u64, BucketError> {
        let now = self.clock.now_ms();
        let count = self
            .store
            .count_by_score(&self.key, ScoreBound::Inclusive(now), ScoreBound::PosInf)
            .await?;
        Ok(count)
    }

    /// 桶内全部令牌，按过期时间升序，不做过滤
    pub async fn debug(&self) -> Result<Vec<Token>, BucketError> {
        let tokens = self
            .store
            .range_query_by_score(&self.key, ScoreBound::NegInf, ScoreBound::PosInf)
            .await?;
        Ok(tokens.into_iter().map(Token::from).collect())
    }

    /// 删除整个桶
    pub async fn reset(&self) -> Result<bool, BucketError> {
        Ok(self.store.delete(&self.key).await?)
    }

    /// 桶的剩余 TTL
    pub async fn ttl(&self) -> Result<Option<std::time::Duration>, BucketError> {
        Ok(self.store.ttl(&self.key).await?)
    }

    /// 放入令牌并和上限比较，超出时回滚刚放入的令牌
    pub async fn try_admit(&self, limit: u64) -> Result<Admission, BucketError> {
        let count = self.increment().await?;
        if count <= limit {
            return Ok(Admission::Admitted { count });
        }

        self.decrement().await?;
        info!(key = %self.key, count, limit, "admission rejected");
        Ok(Admission::Rejected { count })
    }
}
