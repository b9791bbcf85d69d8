use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::result::ApiResult;
use crate::utils::error_codes;

/// 有序集合存储的错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis command failed: {0}")]
    Redis(#[from] redis::RedisError),

    /// 成员不是非负整数，无法作为令牌 ID
    #[error("member '{member}' in '{key}' is not a token id")]
    CorruptedMember { key: String, member: String },
}

/// 漏桶操作的错误
#[derive(Debug, Error)]
pub enum BucketError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// 并发冲突重试次数耗尽
    #[error("admission to '{key}' timed out after {attempts} attempts")]
    AdmissionTimedOut { key: String, attempts: u32 },
}

#[derive(Debug)]
pub enum AppError {
    RateLimited = 1,
    AdmissionTimedOut,
    StoreUnavailable,
}

impl From<BucketError> for AppError {
    fn from(err: BucketError) -> Self {
        match err {
            BucketError::AdmissionTimedOut { .. } => AppError::AdmissionTimedOut,
            BucketError::Store(_) => AppError::StoreUnavailable,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMIT,
                "请求过于频繁，请稍后重试",
            ),
            AppError::AdmissionTimedOut => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::ADMISSION_TIMEOUT,
                "限流器繁忙，请稍后重试",
            ),
            AppError::StoreUnavailable => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误",
            ),
        };

        (status, Json(ApiResult::<()>::error(code, error_message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_errors_map_to_app_errors() {
        let timed_out = BucketError::AdmissionTimedOut {
            key: "leaky".into(),
            attempts: 3,
        };
        assert!(matches!(AppError::from(timed_out), AppError::AdmissionTimedOut));

        let corrupted = BucketError::Store(StoreError::CorruptedMember {
            key: "leaky".into(),
            member: "abc".into(),
        });
        assert!(matches!(AppError::from(corrupted), AppError::StoreUnavailable));
    }

    #[test]
    fn rate_limited_response_is_429() {
        let response = AppError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn timed_out_message_names_key() {
        let err = BucketError::AdmissionTimedOut {
            key: "leaky".into(),
            attempts: 100,
        };
        assert_eq!(
            err.to_string(),
            "admission to 'leaky' timed out after 100 attempts"
        );
    }
}
