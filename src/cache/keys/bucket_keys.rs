/// 查看接口操作的桶键前缀，和限流键不重叠
const BUCKET_PREFIX: &str = "bucket:";

/// 生成查看接口的桶键
pub fn bucket_key(name: &str) -> String {
    format!("{}{}", BUCKET_PREFIX, name)
}
