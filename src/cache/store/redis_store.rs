use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client as RedisClient};

use super::{OrderedStore, ScoreBound};
use crate::error::StoreError;

/// 基于 Redis 有序集合的存储
///
/// 持有一个多路复用连接，每次调用克隆一份句柄。
#[derive(Clone)]
pub struct RedisOrderedStore {
    conn: MultiplexedConnection,
}

impl RedisOrderedStore {
    pub async fn connect(redis: &RedisClient) -> Result<Self, StoreError> {
        let conn = redis.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

fn parse_member(key: &str, member: String) -> Result<u64, StoreError> {
    member
        .parse::<u64>()
        .map_err(|_| StoreError::CorruptedMember {
            key: key.to_string(),
            member,
        })
}

impl OrderedStore for RedisOrderedStore {
    async fn range_remove_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.zrembyscore(key, min, max).await?;
        Ok(removed)
    }

    async fn range_query_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(u64, i64)>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Vec<(String, f64)> = conn.zrangebyscore_withscores(key, min, max).await?;

        raw.into_iter()
            .map(|(member, score)| Ok((parse_member(key, member)?, score as i64)))
            .collect()
    }

    async fn conditional_insert(
        &self,
        key: &str,
        score: i64,
        member: u64,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // ZADD NX 只在成员不存在时添加，返回新增数量
        let added: u64 = redis::cmd("ZADD")
            .arg(key)
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added > 0)
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let updated: bool = conn.pexpire(key, ms).await?;
        Ok(updated)
    }

    async fn count_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.zcount(key, min, max).await?;
        Ok(count)
    }

    async fn range_remove_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.zremrangebyrank(key, start, stop).await?;
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        // -2 表示键不存在，-1 表示没有过期时间
        let ms: i64 = conn.pttl(key).await?;
        Ok(u64::try_from(ms).ok().map(Duration::from_millis))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(key).await?;
        Ok(deleted > 0)
    }
}
