use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use leaky_bucket_backend::cache::{
    BucketOptions, LeakyBucket, MemoryOrderedStore, OrderedStore, RetryPolicy, ScoreBound,
};
use leaky_bucket_backend::error::{BucketError, StoreError};
use leaky_bucket_backend::utils::ManualClock;
use tokio::task::JoinSet;

const NOW: i64 = 1_703_462_400_000;

/// 在真正插入之前先替 "另一个进程" 抢占同一个成员 ID，模拟读写之间的竞争
struct RacingStore {
    inner: MemoryOrderedStore,
    races_left: AtomicU32,
    inserts: AtomicU32,
    broken: bool,
}

impl RacingStore {
    fn new(inner: MemoryOrderedStore, races: u32) -> Self {
        Self {
            inner,
            races_left: AtomicU32::new(races),
            inserts: AtomicU32::new(0),
            broken: false,
        }
    }

    /// 插入总是失败的存储
    fn broken(inner: MemoryOrderedStore) -> Self {
        Self {
            broken: true,
            ..Self::new(inner, 0)
        }
    }
}

impl OrderedStore for RacingStore {
    async fn range_remove_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        self.inner.range_remove_by_score(key, min, max).await
    }

    async fn range_query_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(u64, i64)>, StoreError> {
        self.inner.range_query_by_score(key, min, max).await
    }

    async fn conditional_insert(
        &self,
        key: &str,
        score: i64,
        member: u64,
    ) -> Result<bool, StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(StoreError::CorruptedMember {
                key: key.to_string(),
                member: "garbage".to_string(),
            });
        }
        let raced = self
            .races_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if raced {
            self.inner.conditional_insert(key, score, member).await?;
        }
        self.inner.conditional_insert(key, score, member).await
    }

    async fn set_ttl(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        self.inner.set_ttl(key, ttl).await
    }

    async fn count_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<u64, StoreError> {
        self.inner.count_by_score(key, min, max).await
    }

    async fn range_remove_by_rank(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<u64, StoreError> {
        self.inner.range_remove_by_rank(key, start, stop).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        self.inner.ttl(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }
}

fn clock() -> ManualClock {
    ManualClock::new(NOW)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_return_each_count_once() {
    const CALLERS: u64 = 32;

    let clock = clock();
    let store = Arc::new(MemoryOrderedStore::with_clock(Arc::new(clock.clone())));

    let mut tasks = JoinSet::new();
    for _ in 0..CALLERS {
        // 每个调用方各自构建桶，和多个进程共享同一个键一样
        let bucket = LeakyBucket::with_clock(
            store.clone(),
            "shared",
            BucketOptions::default(),
            Arc::new(clock.clone()),
        );
        tasks.spawn(async move { bucket.increment().await });
    }

    let mut counts = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        counts.push(joined.unwrap().unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=CALLERS).collect::<Vec<_>>());

    let members = store
        .range_query_by_score("shared", ScoreBound::NegInf, ScoreBound::PosInf)
        .await
        .unwrap();
    let ids: Vec<u64> = members.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (1..=CALLERS).collect::<Vec<_>>());

    // 每个令牌都按占用数错开
    let mut previous = NOW;
    for (i, (_, score)) in members.iter().enumerate() {
        assert_eq!(*score, previous + 120_000 * (i as i64 + 1));
        previous = *score;
    }
}

#[tokio::test]
async fn lost_insert_is_retried_with_fresh_state() {
    let clock = clock();
    let store = Arc::new(RacingStore::new(
        MemoryOrderedStore::with_clock(Arc::new(clock.clone())),
        1,
    ));
    let bucket = LeakyBucket::with_clock(
        store.clone(),
        "leaky",
        BucketOptions::default(),
        Arc::new(clock),
    );

    assert_eq!(bucket.increment().await.unwrap(), 2);
    assert_eq!(store.inserts.load(Ordering::SeqCst), 2);
    assert_eq!(
        bucket
            .debug()
            .await
            .unwrap()
            .iter()
            .map(|t| (t.id, t.expires_at))
            .collect::<Vec<_>>(),
        vec![(1, NOW + 120_000), (2, NOW + 360_000)]
    );
}

#[tokio::test]
async fn exhausted_retries_time_out() {
    let clock = clock();
    let store = Arc::new(RacingStore::new(
        MemoryOrderedStore::with_clock(Arc::new(clock.clone())),
        u32::MAX,
    ));
    let retry = RetryPolicy {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(2),
    };
    let bucket = LeakyBucket::with_clock(
        store.clone(),
        "leaky",
        BucketOptions::default().with_retry(retry),
        Arc::new(clock),
    );

    let err = bucket.increment().await.unwrap_err();
    assert!(matches!(
        err,
        BucketError::AdmissionTimedOut { ref key, attempts: 3 } if key == "leaky"
    ));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 3);
    // 每次尝试都被抢走一个 ID
    assert_eq!(bucket.debug().await.unwrap().len(), 3);
    // 插入全部落空，TTL 仍然被刷新
    assert_eq!(
        store.ttl("leaky").await.unwrap(),
        Some(Duration::from_millis(1_200_000))
    );
}

#[tokio::test]
async fn lost_insert_still_refreshes_ttl() {
    let clock = clock();
    let store = Arc::new(RacingStore::new(
        MemoryOrderedStore::with_clock(Arc::new(clock.clone())),
        u32::MAX,
    ));
    store.inner.conditional_insert("leaky", NOW + 60_000, 7).await.unwrap();
    store.set_ttl("leaky", Duration::from_millis(400)).await.unwrap();

    let retry = RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    };
    let bucket = LeakyBucket::with_clock(
        store.clone(),
        "leaky",
        BucketOptions::default().with_retry(retry),
        Arc::new(clock),
    );

    assert!(matches!(
        bucket.increment().await.unwrap_err(),
        BucketError::AdmissionTimedOut { attempts: 1, .. }
    ));
    assert_eq!(
        store.ttl("leaky").await.unwrap(),
        Some(Duration::from_millis(1_200_000))
    );
}

#[tokio::test]
async fn store_failure_is_returned_without_retry() {
    let clock = clock();
    let store = Arc::new(RacingStore::broken(MemoryOrderedStore::with_clock(Arc::new(
        clock.clone(),
    ))));
    let bucket = LeakyBucket::with_clock(
        store.clone(),
        "leaky",
        BucketOptions::default(),
        Arc::new(clock),
    );

    let err = bucket.increment().await.unwrap_err();
    assert!(matches!(
        err,
        BucketError::Store(StoreError::CorruptedMember { ref member, .. }) if member == "garbage"
    ));
    assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    assert!(bucket.debug().await.unwrap().is_empty());
}

#[tokio::test]
async fn zero_attempts_still_tries_once() {
    let clock = clock();
    let store = Arc::new(MemoryOrderedStore::with_clock(Arc::new(clock.clone())));
    let retry = RetryPolicy {
        max_attempts: 0,
        ..RetryPolicy::default()
    };
    let bucket = LeakyBucket::with_clock(
        store,
        "leaky",
        BucketOptions::default().with_retry(retry),
        Arc::new(clock),
    );

    assert_eq!(bucket.increment().await.unwrap(), 1);
}
