use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{OrderedStore, ScoreBound};
use crate::error::StoreError;
use crate::utils::{Clock, SystemClock};

/// 单个键下的有序集合
#[derive(Debug, Default)]
struct SortedSet {
    /// 按 (score, member) 排序
    ordered: BTreeSet<(i64, u64)>,
    scores: HashMap<u64, i64>,
    expires_at_ms: Option<i64>,
}

impl SortedSet {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms.is_some_and(|at| at <= now_ms)
    }

    fn remove(&mut self, entries: Vec<(i64, u64)>) -> u64 {
        let removed = entries.len() as u64;
        for (score, member) in entries {
            self.ordered.remove(&(score, member));
            self.scores.remove(&member);
        }
        removed
    }

    fn in_range(&self, min: ScoreBound, max: ScoreBound) -> impl Iterator<Item = &(i64, u64)> {
        self.ordered
            .iter()
            .filter(move |(score, _)| ScoreBound::contains(min, max, *score))
    }
}

/// 进程内的有序集合存储
///
/// 每个原语都在同一把锁下完成，和 Redis 单条命令一样是原子的。
/// 过期时间按注入的时钟判断，访问时惰性清理。
pub struct MemoryOrderedStore {
    sets: Mutex<HashMap<String, SortedSet>>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryOrderedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOrderedStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sets: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SortedSet>> {
        let mut sets = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        let now_ms = self.clock.now_ms();
        sets.retain(|_, set| !set.is_expired(now_ms));
        sets
    }

    /// 清空后的集合和 Redis 一样连同键一起删除
    fn drop_if_empty(sets: &mut HashMap<String, SortedSet>, key: &str) {
        if sets.get(key).is_some_and(|set| set.ordered.is_empty()) {
            sets.remove(key);
        }
    }
}

/// 把 Redis 风格的排名区间（支持负数）换算成 `[start, stop]`，越界或为空时返回 None
fn resolve_rank_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };

    if len == 0 || start >= len || stop < 0 || start > stop {
        return None;
    }
    Some((start as usize, stop as usize))
}

impl OrderedStore for MemoryOrderedStore {
    async fn range_remove_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        let mut sets = self.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };

        let doomed: Vec<(i64, u64)> = set.in_range(min, max).copied().collect();
        let removed = set.remove(doomed);
        Self::drop_if_empty(&mut sets, key);
        Ok(removed)
    }

    async fn range_query_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(u64, i64)>, StoreError> {
        let sets = self.lock();
        Ok(sets
            .get(key)
            .map(|set| {
                set.in_range(min, max)
                    .map(|&(score, member)| (member, score))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn conditional_insert(
        &self,
        key: &str,
        score: i64,
        member: u64,
    ) -> Result<bool, StoreError> {
        let mut sets = self.lock();
        let set = sets.entry(key.to_string()).or_default();

        if set.scores.contains_key(&member) {
            return Ok(false);
        }
        set.scores.insert(member, score);
        set.ordered.insert((score, member));
        Ok(true)
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now_ms = self.clock.now_ms();
        let mut sets = self.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };

        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        set.expires_at_ms = Some(now_ms.saturating_add(ttl_ms));
        Ok(true)
    }

    async fn count_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        let sets = self.lock();
        Ok(sets
            .get(key)
            .map(|set| set.in_range(min, max).count() as u64)
            .unwrap_or(0))
    }

    async fn range_remove_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<u64, StoreError> {
        let mut sets = self.lock();
        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };
        let Some((start, stop)) = resolve_rank_range(set.ordered.len(), start, stop) else {
            return Ok(0);
        };

        let doomed: Vec<(i64, u64)> = set
            .ordered
            .iter()
            .skip(start)
            .take(stop - start + 1)
            .copied()
            .collect();
        let removed = set.remove(doomed);
        Self::drop_if_empty(&mut sets, key);
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let now_ms = self.clock.now_ms();
        let sets = self.lock();
        Ok(sets
            .get(key)
            .and_then(|set| set.expires_at_ms)
            .and_then(|at| u64::try_from(at - now_ms).ok())
            .map(Duration::from_millis))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut sets = self.lock();
        Ok(sets.remove(key).is_some())
    }
}
