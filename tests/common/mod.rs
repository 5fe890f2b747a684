#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};

use linehaul_api::auth::revocation::MemoryRevocationStore;
use linehaul_api::auth::{self, Claims, Role};
use linehaul_api::config::RateLimitConfig;
use linehaul_api::handlers::protected::auth::logout;
use linehaul_api::middleware::rate_limit::MemoryQuotaTracker;
use linehaul_api::middleware::{
    detect_client_format_middleware, format_response_middleware, jwt_auth_middleware,
    rate_limit_middleware, require_admin_middleware, GateState, QuotaState,
};

pub fn gate_state() -> GateState {
    GateState::new(Arc::new(MemoryRevocationStore::new()))
}

pub fn rate_limits(auth_max: u32, realtime_max: u32, general_max: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        window_secs: 60,
        auth_max_requests: auth_max,
        realtime_max_requests: realtime_max,
        general_max_requests: general_max,
    }
}

pub fn quota_state(settings: RateLimitConfig) -> QuotaState {
    // trust_proxy so tests can pick their client IP via X-Forwarded-For
    QuotaState::new(Arc::new(MemoryQuotaTracker::new()), settings, true)
}

pub fn generous_quota() -> QuotaState {
    quota_state(rate_limits(10_000, 10_000, 10_000))
}

/// Router mirroring the production pipeline (rate limit -> format detection ->
/// response transformation -> JWT gate -> admin gate) with database-free
/// handlers standing in for the CRUD surface.
pub fn test_app(gate: GateState, quota: QuotaState) -> Router {
    let protected = Router::new()
        .route("/api/auth/me", get(me_stub))
        .route("/api/auth/logout", delete(logout))
        .route("/api/jobs", get(jobs_stub))
        .with_state(gate.clone())
        .merge(
            Router::new()
                .route("/api/admin/users", get(admin_stub))
                .route_layer(from_fn(require_admin_middleware)),
        )
        .route_layer(from_fn_with_state(gate, jwt_auth_middleware));

    Router::new()
        .route("/auth/login", post(login_stub))
        .route("/public-ping", get(ping_stub))
        .route("/boom", get(error_stub))
        .route("/api/drivers/:id/heartbeat", post(heartbeat_stub))
        // Admin gate without an authentication gate in front of it
        .merge(
            Router::new()
                .route("/naked-admin", get(admin_stub))
                .route_layer(from_fn(require_admin_middleware)),
        )
        .merge(protected)
        .layer(from_fn(format_response_middleware))
        .layer(from_fn(detect_client_format_middleware))
        .layer(from_fn_with_state(quota, rate_limit_middleware))
}

pub fn token_for(role: Role) -> String {
    let claims = Claims::new(
        uuid::Uuid::new_v4(),
        "tester@linehaul.example.com".to_string(),
        role,
    );
    auth::generate_jwt(&claims).expect("test token")
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    request_with_body(method, uri, headers, None)
}

pub fn request_with_body(
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn assert_rejection(status: StatusCode, expected: u16, body: &Value) {
    assert_eq!(status.as_u16(), expected);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string(), "rejection body missing error: {}", body);
}

async fn login_stub() -> Json<Value> {
    Json(json!({ "user": { "id": "1" }, "token": "abc" }))
}

async fn me_stub() -> Json<Value> {
    Json(json!({ "user": { "id": "1", "email": "tester@linehaul.example.com" } }))
}

async fn jobs_stub() -> Json<Value> {
    Json(json!([{ "id": "1", "reference": "LH-3F9A2C41" }]))
}

async fn admin_stub() -> Json<Value> {
    Json(json!([{ "id": "1", "email": "admin@linehaul.example.com" }]))
}

async fn ping_stub() -> Json<Value> {
    Json(json!({ "pong": true }))
}

async fn heartbeat_stub() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn error_stub() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))
}
