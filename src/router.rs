use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    cache::StoreBackend,
    middleware::{RateLimiter, rate_limit},
    routes,
};

// 漏桶查看和操作的路由
pub fn bucket_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/buckets/{key}",
            get(routes::bucket::get_bucket).delete(routes::bucket::reset),
        )
        .route("/buckets/{key}/increment", post(routes::bucket::increment))
        .route("/buckets/{key}/decrement", post(routes::bucket::decrement))
}

// 创建主路由，健康检查不经过限流
pub fn create_router(state: AppState, limiter: Arc<RateLimiter<StoreBackend>>) -> Router {
    let limited = bucket_routes().layer(axum::middleware::from_fn_with_state(
        limiter,
        rate_limit::<StoreBackend>,
    ));

    Router::new()
        .route("/health", get(routes::bucket::health))
        .merge(limited)
        .with_state(state)
}
