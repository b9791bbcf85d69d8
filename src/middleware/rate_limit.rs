use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    cache::{Admission, LeakyBucket, OrderedStore, keys::rate_limit_key},
    config::Config,
    error::AppError,
    utils::{Clock, SystemClock},
};

/// 按客户端 IP 分桶的限流器，多个进程共享同一个存储即可共享额度
pub struct RateLimiter<S: OrderedStore> {
    store: Arc<S>,
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
}

/// 客户端标识：x-real-ip，其次 x-forwarded-for 的第一个非空地址，再次连接地址
fn client_ip(req: &Request<Body>) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    req.headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

impl<S: OrderedStore> RateLimiter<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config: Arc::new(config),
            clock,
        }
    }

    pub fn bucket_for(&self, client: &str) -> LeakyBucket<S> {
        LeakyBucket::with_clock(
            self.store.clone(),
            rate_limit_key(client),
            self.config.bucket_options(),
            self.clock.clone(),
        )
    }

    pub async fn check_rate_limit(
        self: Arc<Self>,
        req: Request<Body>,
        next: Next,
    ) -> Result<Response, AppError> {
        let ip = client_ip(&req);
        let bucket = self.bucket_for(&ip);

        match bucket.try_admit(self.config.rate_limit_requests).await {
            Ok(Admission::Admitted { count }) => {
                tracing::debug!(ip = %ip, count, "request admitted");
            }
            Ok(Admission::Rejected { count }) => {
                tracing::info!(ip = %ip, count, "request rate limited");
                return Err(AppError::RateLimited);
            }
            Err(e) => {
                tracing::error!(ip = %ip, error = %e, "rate limit check failed");
                return Err(e.into());
            }
        }

        let response = next.run(req).await;

        // 下游失败时归还预留的令牌
        if response.status().is_server_error() {
            if let Err(e) = bucket.decrement().await {
                tracing::warn!(ip = %ip, error = %e, "failed to roll back reservation");
            }
        }

        Ok(response)
    }
}

pub async fn rate_limit<S: OrderedStore + 'static>(
    State(limiter): State<Arc<RateLimiter<S>>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    limiter.check_rate_limit(req, next).await
}
