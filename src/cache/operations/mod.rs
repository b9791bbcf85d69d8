/// 缓存操作
/// 提供漏桶在有序集合存储上的操作

pub mod leaky_bucket;

// 重新导出常用操作
pub use leaky_bucket::*;
