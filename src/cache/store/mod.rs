/// 有序集合存储
/// 漏桶只通过这里的原语访问外部存储，每条命令由存储端保证原子性

mod memory;
mod redis_store;

use std::future::Future;
use std::time::Duration;

use redis::{RedisWrite, ToRedisArgs};

use crate::error::StoreError;

pub use self::memory::MemoryOrderedStore;
pub use self::redis_store::RedisOrderedStore;

/// 分数区间的端点（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBound {
    NegInf,
    Inclusive(i64),
    PosInf,
}

impl ScoreBound {
    fn allows_from_below(self, score: i64) -> bool {
        match self {
            ScoreBound::NegInf => true,
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::PosInf => false,
        }
    }

    fn allows_from_above(self, score: i64) -> bool {
        match self {
            ScoreBound::NegInf => false,
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::PosInf => true,
        }
    }

    /// `score` 是否落在 `[min, max]` 内
    pub fn contains(min: ScoreBound, max: ScoreBound, score: i64) -> bool {
        min.allows_from_below(score) && max.allows_from_above(score)
    }
}

impl ToRedisArgs for ScoreBound {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        match self {
            ScoreBound::NegInf => out.write_arg(b"-inf"),
            ScoreBound::Inclusive(score) => score.write_redis_args(out),
            ScoreBound::PosInf => out.write_arg(b"+inf"),
        }
    }
}

/// 带分数的有序集合原语
///
/// 成员是令牌 ID，分数是毫秒时间戳。查询结果按分数升序返回 `(member, score)`。
pub trait OrderedStore: Send + Sync {
    /// 删除分数在 `[min, max]` 内的成员，返回删除数量
    fn range_remove_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    fn range_query_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> impl Future<Output = Result<Vec<(u64, i64)>, StoreError>> + Send;

    /// 仅当成员不存在时插入，返回是否插入
    fn conditional_insert(
        &self,
        key: &str,
        score: i64,
        member: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// 刷新整个键的过期时间（毫秒精度），键不存在时返回 false
    fn set_ttl(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn count_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// 按排名删除，支持负数下标（-1 为分数最高的成员）
    fn range_remove_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// 剩余过期时间，键不存在或没有过期时间时为 None
    fn ttl(&self, key: &str) -> impl Future<Output = Result<Option<Duration>, StoreError>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// 运行时选择的存储后端
pub enum StoreBackend {
    Redis(RedisOrderedStore),
    Memory(MemoryOrderedStore),
}

impl OrderedStore for StoreBackend {
    async fn range_remove_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.range_remove_by_score(key, min, max).await,
            StoreBackend::Memory(store) => store.range_remove_by_score(key, min, max).await,
        }
    }

    async fn range_query_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(u64, i64)>, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.range_query_by_score(key, min, max).await,
            StoreBackend::Memory(store) => store.range_query_by_score(key, min, max).await,
        }
    }

    async fn conditional_insert(
        &self,
        key: &str,
        score: i64,
        member: u64,
    ) -> Result<bool, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.conditional_insert(key, score, member).await,
            StoreBackend::Memory(store) => store.conditional_insert(key, score, member).await,
        }
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.set_ttl(key, ttl).await,
            StoreBackend::Memory(store) => store.set_ttl(key, ttl).await,
        }
    }

    async fn count_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.count_by_score(key, min, max).await,
            StoreBackend::Memory(store) => store.count_by_score(key, min, max).await,
        }
    }

    async fn range_remove_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<u64, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.range_remove_by_rank(key, start, stop).await,
            StoreBackend::Memory(store) => store.range_remove_by_rank(key, start, stop).await,
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.ttl(key).await,
            StoreBackend::Memory(store) => store.ttl(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            StoreBackend::Redis(store) => store.delete(key).await,
            StoreBackend::Memory(store) => store.delete(key).await,
        }
    }
}
