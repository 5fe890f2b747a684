use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    detect_client_format_middleware, format_response_middleware, jwt_auth_middleware,
    rate_limit_middleware, require_admin_middleware, GateState, QuotaState,
};

/// Build the application router.
///
/// Request pipeline, outermost first: trace/CORS, rate limiting (per class,
/// every request), format detection, response transformation, then JWT
/// authentication on the protected groups and the admin check on top of that
/// for the elevated group.
pub fn app(gate: GateState, quota: QuotaState) -> Router {
    let protected_routes = Router::new()
        .merge(session_routes(gate.clone()))
        .merge(job_routes())
        .merge(driver_routes())
        .merge(notification_routes())
        .merge(document_routes())
        .merge(admin_routes())
        .route_layer(from_fn_with_state(gate, jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        .merge(protected_routes)
        // Global middleware
        .layer(from_fn(format_response_middleware))
        .layer(from_fn(detect_client_format_middleware))
        .layer(from_fn_with_state(quota, rate_limit_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
}

fn session_routes(gate: GateState) -> Router {
    use protected::auth;

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", delete(auth::logout))
        .with_state(gate)
}

fn job_routes() -> Router {
    use protected::jobs;

    Router::new()
        .route("/api/jobs", get(jobs::list).post(jobs::create))
        .route(
            "/api/jobs/:id",
            get(jobs::get)
                .put(jobs::update)
                .patch(jobs::update)
                .delete(jobs::delete),
        )
}

fn driver_routes() -> Router {
    use protected::drivers;

    Router::new()
        .route("/api/drivers", get(drivers::list).post(drivers::create))
        .route(
            "/api/drivers/:id",
            get(drivers::get)
                .put(drivers::update)
                .patch(drivers::update)
                .delete(drivers::delete),
        )
        // Realtime quota class
        .route("/api/drivers/:id/location", post(drivers::record_location))
        .route("/api/drivers/:id/heartbeat", post(drivers::heartbeat))
        .route("/api/drivers/:id/locations", get(drivers::locations))
}

fn notification_routes() -> Router {
    use protected::notifications;

    Router::new()
        .route(
            "/api/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route("/api/notifications/:id/read", patch(notifications::mark_read))
}

fn document_routes() -> Router {
    use protected::documents;

    Router::new()
        .route(
            "/api/documents",
            get(documents::list).post(documents::create),
        )
        .route(
            "/api/documents/:id",
            get(documents::get).delete(documents::delete),
        )
}

fn admin_routes() -> Router {
    Router::new()
        .route(
            "/api/admin/users",
            get(elevated::users::list).post(elevated::users::create),
        )
        .route(
            "/api/admin/users/:id",
            get(elevated::users::get)
                .put(elevated::users::update)
                .patch(elevated::users::update)
                .delete(elevated::users::delete),
        )
        .route("/api/admin/audit", get(elevated::audit::list))
        .route("/api/admin/tables", get(elevated::tables::list))
        .route("/api/admin/tables/:table/rows", get(elevated::tables::rows))
        .route(
            "/api/admin/databases",
            get(elevated::databases::list).post(elevated::databases::create),
        )
        .route_layer(from_fn(require_admin_middleware))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Linehaul API",
        "version": version,
        "description": "Administration backend for hauling operations",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/auth/login, /auth/register (public), /api/auth/* (protected)",
            "jobs": "/api/jobs[/:id] (protected)",
            "drivers": "/api/drivers[/:id], /api/drivers/:id/{location,heartbeat,locations} (protected)",
            "notifications": "/api/notifications[/:id/read] (protected)",
            "documents": "/api/documents[/:id] (protected)",
            "admin": "/api/admin/{users,audit,tables,databases} (admin role)",
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "database unavailable",
                    "status": "degraded",
                    "timestamp": now
                })),
            )
        }
    }
}
