use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::Token;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenInfo {
    pub id: u64,
    pub expires_at: i64,
    pub expires_at_utc: Option<DateTime<Utc>>,
}

impl From<Token> for TokenInfo {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            expires_at: token.expires_at,
            expires_at_utc: token.expires_at_utc(),
        }
    }
}

/// 桶的快照
#[derive(Debug, Serialize, Deserialize)]
pub struct BucketSnapshot {
    pub key: String,
    pub count: u64,
    pub ttl_ms: Option<u64>,
    pub tokens: Vec<TokenInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub removed: bool,
}
