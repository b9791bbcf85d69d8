use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cache::models::{BucketOptions, RetryPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("unknown store backend '{0}', expected 'redis' or 'memory'")]
    UnknownBackend(String),
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreKind::Redis),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreKind,
    pub redis_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub bucket_expiration_ms: u64,
    pub bucket_reset_expiration_ms: u64,
    pub bucket_max_attempts: u32,
    pub bucket_initial_backoff_ms: u64,
    pub bucket_max_backoff_ms: u64,
    pub rate_limit_requests: u64,
}

/// 读取并解析数值，缺失或非法时取默认值
fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    lookup(name)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意键值来源构建配置
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_backend = match lookup("STORE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StoreKind::Redis,
        };

        let redis_url = lookup("REDIS_URL");
        if store_backend == StoreKind::Redis && redis_url.is_none() {
            return Err(ConfigError::Missing("REDIS_URL"));
        }

        Ok(Config {
            store_backend,
            redis_url,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000),
            bucket_expiration_ms: parse_or(&lookup, "BUCKET_EXPIRATION_MS", 2 * 60 * 1000),
            bucket_reset_expiration_ms: parse_or(
                &lookup,
                "BUCKET_RESET_EXPIRATION_MS",
                20 * 60 * 1000,
            ),
            bucket_max_attempts: parse_or(&lookup, "BUCKET_MAX_ATTEMPTS", 100),
            bucket_initial_backoff_ms: parse_or(&lookup, "BUCKET_INITIAL_BACKOFF_MS", 1),
            bucket_max_backoff_ms: parse_or(&lookup, "BUCKET_MAX_BACKOFF_MS", 50),
            rate_limit_requests: parse_or(&lookup, "RATE_LIMIT_REQUESTS", 100),
        })
    }

    pub fn bucket_expiration(&self) -> Duration {
        Duration::from_millis(self.bucket_expiration_ms)
    }

    pub fn bucket_reset_expiration(&self) -> Duration {
        Duration::from_millis(self.bucket_reset_expiration_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.bucket_max_attempts,
            initial_backoff: Duration::from_millis(self.bucket_initial_backoff_ms),
            max_backoff: Duration::from_millis(self.bucket_max_backoff_ms),
        }
    }

    pub fn bucket_options(&self) -> BucketOptions {
        BucketOptions::new(self.bucket_expiration(), self.bucket_reset_expiration())
            .with_retry(self.retry_policy())
    }
}
