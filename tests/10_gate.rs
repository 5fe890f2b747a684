mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use linehaul_api::auth::{Claims, Role};
use linehaul_api::config;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn missing_authorization_header_is_unauthenticated() {
    let app = common::test_app(common::gate_state(), common::generous_quota());

    let response = app
        .oneshot(common::request("GET", "/api/jobs", &[]))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
}

#[tokio::test]
async fn non_bearer_scheme_is_unauthenticated() {
    let app = common::test_app(common::gate_state(), common::generous_quota());

    let response = app
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", "Basic dXNlcjpwdw==")],
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
}

#[tokio::test]
async fn garbage_token_is_unauthenticated() {
    let app = common::test_app(common::gate_state(), common::generous_quota());

    let response = app
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", "Bearer not.a.token")],
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
    assert_eq!(body["error"], json!("Invalid token"));
}

#[tokio::test]
async fn expired_token_is_unauthenticated() {
    let now = Utc::now();
    let claims = Claims {
        sub: uuid::Uuid::new_v4(),
        email: "tester@linehaul.example.com".to_string(),
        role: Role::User,
        exp: (now - Duration::hours(2)).timestamp(),
        iat: (now - Duration::hours(3)).timestamp(),
    };
    let secret = &config::config().security.jwt_secret;
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap();

    let app = common::test_app(common::gate_state(), common::generous_quota());
    let response = app
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", &format!("Bearer {}", token))],
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
    assert_eq!(body["error"], json!("Token has expired"));
}

#[tokio::test]
async fn valid_token_reaches_the_handler() {
    let app = common::test_app(common::gate_state(), common::generous_quota());
    let token = common::token_for(Role::User);

    let response = app
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", &format!("Bearer {}", token))],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // A bare bearer token classifies the caller as legacy, so the list
    // comes back wrapped.
    let body = common::body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["data"].is_array());
}

#[tokio::test]
async fn logout_revokes_the_token_until_expiry() {
    let gate = common::gate_state();
    let app = common::test_app(gate.clone(), common::generous_quota());
    let token = common::token_for(Role::User);
    let auth_header = format!("Bearer {}", token);

    // Token works before logout
    let response = app
        .clone()
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", &auth_header)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Logout stores a revocation record sized to the token's remaining life
    let response = app
        .clone()
        .oneshot(common::request(
            "DELETE",
            "/api/auth/logout",
            &[("authorization", &auth_header)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(gate.revocation.is_revoked(&token).await.unwrap());

    // The same token is now rejected before signature verification matters
    let response = app
        .oneshot(common::request(
            "GET",
            "/api/jobs",
            &[("authorization", &auth_header)],
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
    assert_eq!(body["error"], json!("Token has been revoked"));
}

#[tokio::test]
async fn user_role_cannot_reach_admin_routes() {
    let app = common::test_app(common::gate_state(), common::generous_quota());
    let token = common::token_for(Role::User);

    let response = app
        .oneshot(common::request(
            "GET",
            "/api/admin/users",
            &[("authorization", &format!("Bearer {}", token))],
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 403, &body);
}

#[tokio::test]
async fn admin_role_passes_the_admin_gate() {
    let app = common::test_app(common::gate_state(), common::generous_quota());
    let token = common::token_for(Role::Admin);

    let response = app
        .oneshot(common::request(
            "GET",
            "/api/admin/users",
            &[("authorization", &format!("Bearer {}", token))],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_gate_without_identity_is_unauthenticated_not_forbidden() {
    let app = common::test_app(common::gate_state(), common::generous_quota());

    let response = app
        .oneshot(common::request("GET", "/naked-admin", &[]))
        .await
        .unwrap();

    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 401, &body);
}
