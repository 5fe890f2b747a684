use std::net::SocketAddr;
use std::sync::Arc;

use linehaul_api::auth::revocation::{
    MemoryRevocationStore, RedisRevocationStore, RevocationStore,
};
use linehaul_api::config;
use linehaul_api::middleware::rate_limit::{
    MemoryQuotaTracker, QuotaTracker, RedisQuotaTracker,
};
use linehaul_api::middleware::{GateState, QuotaState};
use linehaul_api::routes;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Linehaul API in {:?} mode", config.environment);

    let (revocation, tracker) = build_shared_stores(&config.redis.url).await;
    let gate = GateState::new(revocation);
    let quota = QuotaState::new(
        tracker,
        config.rate_limit.clone(),
        config.security.trust_proxy,
    );

    let app = routes::app(gate, quota);

    // Allow tests or deployments to override port via env
    let port = std::env::var("LINEHAUL_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Linehaul API listening on http://{}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server");
}

/// Connect Redis for the revocation store and quota counters. When Redis is
/// unreachable at startup the process still comes up on in-memory stores so a
/// cache outage cannot take the API down with it.
async fn build_shared_stores(
    redis_url: &str,
) -> (Arc<dyn RevocationStore>, Arc<dyn QuotaTracker>) {
    match connect_redis(redis_url).await {
        Ok(conn) => (
            Arc::new(RedisRevocationStore::new(conn.clone())) as Arc<dyn RevocationStore>,
            Arc::new(RedisQuotaTracker::new(conn)) as Arc<dyn QuotaTracker>,
        ),
        Err(e) => {
            tracing::warn!("Redis unavailable ({}); using in-process stores", e);
            (
                Arc::new(MemoryRevocationStore::new()) as Arc<dyn RevocationStore>,
                Arc::new(MemoryQuotaTracker::new()) as Arc<dyn QuotaTracker>,
            )
        }
    }
}

async fn connect_redis(url: &str) -> Result<redis::aio::ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    redis::aio::ConnectionManager::new(client).await
}
