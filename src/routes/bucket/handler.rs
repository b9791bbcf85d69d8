use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

use crate::AppState;
use crate::error::BucketError;
use crate::result::ApiResult;
use crate::utils::{error_codes, error_to_api_response, success_to_api_response};

use super::model::{BucketSnapshot, CountResponse, ResetResponse, TokenInfo};

fn failure<T: Serialize>(err: BucketError) -> (StatusCode, Json<ApiResult<T>>) {
    tracing::error!(error = %err, "bucket operation failed");
    match err {
        BucketError::AdmissionTimedOut { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            error_to_api_response(error_codes::ADMISSION_TIMEOUT, err.to_string()),
        ),
        BucketError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_to_api_response(error_codes::INTERNAL_ERROR, err.to_string()),
        ),
    }
}

async fn snapshot(state: &AppState, key: &str) -> Result<BucketSnapshot, BucketError> {
    let bucket = state.bucket(key);
    let count = bucket.count().await?;
    let ttl_ms = bucket
        .ttl()
        .await?
        .map(|ttl| u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX));
    let tokens = bucket
        .debug()
        .await?
        .into_iter()
        .map(TokenInfo::from)
        .collect();

    Ok(BucketSnapshot {
        key: key.to_string(),
        count,
        ttl_ms,
        tokens,
    })
}

#[axum::debug_handler]
pub async fn get_bucket(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match snapshot(&state, &key).await {
        Ok(snapshot) => (StatusCode::OK, success_to_api_response(snapshot)),
        Err(e) => failure(e),
    }
}

#[axum::debug_handler]
pub async fn increment(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match state.bucket(&key).increment().await {
        Ok(count) => (StatusCode::OK, success_to_api_response(CountResponse { count })),
        Err(e) => failure(e),
    }
}

#[axum::debug_handler]
pub async fn decrement(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    let bucket = state.bucket(&key);
    let result = match bucket.decrement().await {
        Ok(()) => bucket.count().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(count) => (StatusCode::OK, success_to_api_response(CountResponse { count })),
        Err(e) => failure(e),
    }
}

#[axum::debug_handler]
pub async fn reset(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> impl IntoResponse {
    match state.bucket(&key).reset().await {
        Ok(removed) => (StatusCode::OK, success_to_api_response(ResetResponse { removed })),
        Err(e) => failure(e),
    }
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, success_to_api_response("ok"))
}
