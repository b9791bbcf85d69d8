// 缓存模块
// 包含漏桶的数据结构、存储原语和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use models::{Admission, BucketOptions, RetryPolicy, Token};
pub use operations::LeakyBucket;
pub use store::{MemoryOrderedStore, OrderedStore, RedisOrderedStore, ScoreBound, StoreBackend};
