mod common;

use axum::http::{header::RETRY_AFTER, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn request_over_the_auth_quota_is_rejected() {
    let app = common::test_app(common::gate_state(), common::quota_state(common::rate_limits(3, 100, 100)));
    let from = [("x-forwarded-for", "203.0.113.10")];

    // The N-th request still passes
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(common::request_with_body(
                "POST",
                "/auth/login",
                &from,
                Some(json!({ "email": "a@b.example.com", "password": "pw" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The (N+1)-th does not
    let response = app
        .oneshot(common::request_with_body(
            "POST",
            "/auth/login",
            &from,
            Some(json!({ "email": "a@b.example.com", "password": "pw" })),
        ))
        .await
        .unwrap();

    let status = response.status();
    assert!(response.headers().contains_key(RETRY_AFTER));
    let body = common::body_json(response).await;
    common::assert_rejection(status, 429, &body);
}

#[tokio::test]
async fn quotas_are_tracked_per_client_ip() {
    let app = common::test_app(common::gate_state(), common::quota_state(common::rate_limits(2, 100, 100)));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(common::request_with_body(
                "POST",
                "/auth/login",
                &[("x-forwarded-for", "203.0.113.10")],
                Some(json!({ "email": "a@b.example.com", "password": "pw" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // First IP is exhausted, a different IP is not
    let exhausted = app
        .clone()
        .oneshot(common::request_with_body(
            "POST",
            "/auth/login",
            &[("x-forwarded-for", "203.0.113.10")],
            Some(json!({ "email": "a@b.example.com", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(exhausted.status(), StatusCode::TOO_MANY_REQUESTS);

    let fresh = app
        .oneshot(common::request_with_body(
            "POST",
            "/auth/login",
            &[("x-forwarded-for", "203.0.113.11")],
            Some(json!({ "email": "a@b.example.com", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);
}

#[tokio::test]
async fn endpoint_classes_count_independently() {
    let app = common::test_app(common::gate_state(), common::quota_state(common::rate_limits(1, 100, 100)));
    let from = [("x-forwarded-for", "203.0.113.10")];

    // Exhaust the authentication class for this IP
    let first = app
        .clone()
        .oneshot(common::request_with_body(
            "POST",
            "/auth/login",
            &from,
            Some(json!({ "email": "a@b.example.com", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(common::request_with_body(
            "POST",
            "/auth/login",
            &from,
            Some(json!({ "email": "a@b.example.com", "password": "pw" })),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // General traffic from the same IP is still served
    let general = app
        .oneshot(common::request("GET", "/public-ping", &from))
        .await
        .unwrap();
    assert_eq!(general.status(), StatusCode::OK);
}

#[tokio::test]
async fn realtime_class_has_its_own_cap() {
    let app = common::test_app(common::gate_state(), common::quota_state(common::rate_limits(100, 2, 100)));
    let from = [("x-forwarded-for", "203.0.113.10")];

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(common::request("POST", "/api/drivers/42/heartbeat", &from))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(common::request("POST", "/api/drivers/42/heartbeat", &from))
        .await
        .unwrap();
    let status = response.status();
    let body = common::body_json(response).await;
    common::assert_rejection(status, 429, &body);

    // Realtime exhaustion does not touch the general class
    let general = app
        .oneshot(common::request("GET", "/public-ping", &from))
        .await
        .unwrap();
    assert_eq!(general.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limiting_can_be_disabled() {
    let mut settings = common::rate_limits(1, 1, 1);
    settings.enabled = false;
    let app = common::test_app(common::gate_state(), common::quota_state(settings));
    let from = [("x-forwarded-for", "203.0.113.10")];

    for _ in 0..5 {
        let response = app
            .clone()
            .oneshot(common::request("GET", "/public-ping", &from))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
