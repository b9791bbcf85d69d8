/// 按客户端限流的桶键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 生成客户端限流桶的键
pub fn rate_limit_key(client: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, client)
}
