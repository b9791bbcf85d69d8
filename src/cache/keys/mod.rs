/// 缓存键模块
/// 提供各种缓存键生成函数

// 查看接口键模块
pub mod bucket_keys;
// 限流键模块
pub mod rate_limit_keys;

// 重新导出常用的键生成函数
pub use bucket_keys::bucket_key;
pub use rate_limit_keys::rate_limit_key;
