//! Tiered per-IP request quotas.
//!
//! Three endpoint classes share a fixed 15-minute window but carry their own
//! caps: authentication routes are throttled hard, driver heartbeat/location
//! reports get generous headroom, everything else sits in between. Counters
//! are keyed by (class, client IP) and tracked through the [`QuotaTracker`]
//! interface so tests run against an in-memory map while production counts in
//! Redis.
//!
//! Quota checks run for every request in a class, before and independent of
//! authentication.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const UNKNOWN_IP: &str = "unknown";

/// Endpoint quota classes, selected by route prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuotaClass {
    Auth,
    Realtime,
    General,
}

impl QuotaClass {
    /// Classify a request path. Heartbeat and position reports are the only
    /// high-frequency endpoints; token acquisition and session routes count
    /// as authentication traffic.
    pub fn for_path(path: &str) -> Self {
        if path == "/auth"
            || path.starts_with("/auth/")
            || path == "/api/auth"
            || path.starts_with("/api/auth/")
        {
            QuotaClass::Auth
        } else if path.ends_with("/heartbeat") || path.ends_with("/location") {
            QuotaClass::Realtime
        } else {
            QuotaClass::General
        }
    }

    pub fn key_prefix(&self) -> &'static str {
        match self {
            QuotaClass::Auth => "auth",
            QuotaClass::Realtime => "realtime",
            QuotaClass::General => "general",
        }
    }

    pub fn rejection_message(&self) -> &'static str {
        match self {
            QuotaClass::Auth => "Too many authentication attempts, please try again later",
            QuotaClass::Realtime => "Too many tracking updates, please slow down",
            QuotaClass::General => "Too many requests, please try again later",
        }
    }
}

/// Effective limits for one class.
#[derive(Debug, Clone)]
pub struct QuotaPolicy {
    pub max_requests: u32,
    pub window: Duration,
    pub message: &'static str,
}

/// Counter state after recording a hit.
#[derive(Debug, Clone)]
pub struct QuotaUsage {
    pub count: u64,
    pub window_remaining: Duration,
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Shared counter store. Each key is updated independently; single-key
/// read-modify-write atomicity is all the implementation has to provide.
#[async_trait]
pub trait QuotaTracker: Send + Sync {
    /// Count one hit against `key`, lazily starting a fresh fixed window when
    /// none is active.
    async fn hit(&self, key: &str, window: Duration) -> Result<QuotaUsage, QuotaError>;
}

/// In-memory fixed-window counters for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryQuotaTracker {
    windows: Mutex<HashMap<String, (u64, Instant)>>,
}

impl MemoryQuotaTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuotaTracker for MemoryQuotaTracker {
    async fn hit(&self, key: &str, window: Duration) -> Result<QuotaUsage, QuotaError> {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        let entry = windows.entry(key.to_string()).or_insert((0, now + window));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;

        Ok(QuotaUsage {
            count: entry.0,
            window_remaining: entry.1.saturating_duration_since(now),
        })
    }
}

/// Redis-backed counters: INCR plus a window-length EXPIRE on first hit.
pub struct RedisQuotaTracker {
    conn: ConnectionManager,
}

impl RedisQuotaTracker {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl QuotaTracker for RedisQuotaTracker {
    async fn hit(&self, key: &str, window: Duration) -> Result<QuotaUsage, QuotaError> {
        let mut conn = self.conn.clone();
        let key = format!("rate:{}", key);

        let count: u64 = conn.incr(&key, 1u64).await?;
        if count == 1 {
            conn.expire::<_, ()>(&key, window.as_secs() as i64).await?;
        }

        let ttl: i64 = conn.ttl(&key).await?;
        let window_remaining = if ttl > 0 {
            Duration::from_secs(ttl as u64)
        } else {
            window
        };

        Ok(QuotaUsage {
            count,
            window_remaining,
        })
    }
}

/// Injected state for the rate-limit middleware.
#[derive(Clone)]
pub struct QuotaState {
    pub tracker: Arc<dyn QuotaTracker>,
    pub settings: RateLimitConfig,
    pub trust_proxy: bool,
}

impl QuotaState {
    pub fn new(tracker: Arc<dyn QuotaTracker>, settings: RateLimitConfig, trust_proxy: bool) -> Self {
        Self {
            tracker,
            settings,
            trust_proxy,
        }
    }

    pub fn policy(&self, class: QuotaClass) -> QuotaPolicy {
        let max_requests = match class {
            QuotaClass::Auth => self.settings.auth_max_requests,
            QuotaClass::Realtime => self.settings.realtime_max_requests,
            QuotaClass::General => self.settings.general_max_requests,
        };
        QuotaPolicy {
            max_requests,
            window: Duration::from_secs(self.settings.window_secs),
            message: class.rejection_message(),
        }
    }
}

/// Resolve the client IP, preferring the reverse-proxy header when the
/// deployment says to trust it.
pub fn client_ip(trust_proxy: bool, headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    if trust_proxy {
        if let Some(forwarded) = headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return forwarded.to_string();
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// Middleware enforcing the per-class quota. Runs for every request in its
/// class whether or not the caller authenticates.
pub async fn rate_limit_middleware(
    State(state): State<QuotaState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.settings.enabled {
        return next.run(request).await;
    }

    let class = QuotaClass::for_path(request.uri().path());
    let policy = state.policy(class);
    let ip = client_ip(state.trust_proxy, request.headers(), request.extensions());
    let key = format!("{}:{}", class.key_prefix(), ip);

    match state.tracker.hit(&key, policy.window).await {
        Ok(usage) if usage.count <= u64::from(policy.max_requests) => next.run(request).await,
        Ok(usage) => {
            tracing::warn!(
                key = %key,
                count = usage.count,
                limit = policy.max_requests,
                "request rejected: quota exhausted"
            );
            let mut response = ApiError::too_many_requests(policy.message).into_response();
            let retry_secs = usage.window_remaining.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&retry_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
        Err(e) => {
            // Counter store down: let traffic through rather than hard-fail.
            tracing::error!("quota tracker unavailable, skipping rate limit: {}", e);
            next.run(request).await
        }
    }
}
