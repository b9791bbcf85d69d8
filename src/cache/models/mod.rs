/// 缓存数据模型
/// 定义漏桶相关的数据结构

pub mod rate_limit;
pub mod token;

// 重新导出常用类型
pub use rate_limit::*;
pub use token::*;
