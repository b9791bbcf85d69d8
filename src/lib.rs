use std::sync::Arc;

use cache::{LeakyBucket, StoreBackend, keys::bucket_key};
use config::Config;
use utils::{Clock, SystemClock};

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod result;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<StoreBackend>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<StoreBackend>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// 桶只是按键寻址的值，每次请求现建；键落在 `bucket:` 命名空间下
    pub fn bucket(&self, key: &str) -> LeakyBucket<StoreBackend> {
        LeakyBucket::with_clock(
            self.store.clone(),
            bucket_key(key),
            self.config.bucket_options(),
            self.clock.clone(),
        )
    }
}
