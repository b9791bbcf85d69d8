use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use leaky_bucket_backend::{
    AppState,
    cache::{MemoryOrderedStore, RedisOrderedStore, StoreBackend},
    config::{Config, StoreKind},
    middleware::RateLimiter,
    router::create_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 设置存储后端
    let store = match config.store_backend {
        StoreKind::Redis => {
            let url = config.redis_url.clone().unwrap_or_default();
            let redis_client = redis::Client::open(url).expect("Failed to create Redis client");
            let store = RedisOrderedStore::connect(&redis_client)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Using Redis store");
            StoreBackend::Redis(store)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store, limits are not shared between processes");
            StoreBackend::Memory(MemoryOrderedStore::new())
        }
    };
    let store = Arc::new(store);

    tracing::info!(
        expiration_ms = config.bucket_expiration_ms,
        reset_expiration_ms = config.bucket_reset_expiration_ms,
        limit = config.rate_limit_requests,
        "Leaky bucket configured"
    );

    // 设置应用状态和限流器
    let state = AppState::new(config.clone(), store.clone());
    let rate_limiter = Arc::new(RateLimiter::new(store, config.clone()));

    let app = create_router(state, rate_limiter);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
