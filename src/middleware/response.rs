//! Outgoing response reshaping.
//!
//! The route handlers all emit raw (current-generation) JSON bodies. This
//! middleware intercepts each body once, after the handler runs, and rewrites
//! it into the envelope the classified client expects. Transformation is a
//! pure function of `(body, descriptor, path)` so every branch can be tested
//! without a server.
//!
//! The layer never fails a request: non-JSON bodies, unparsable bodies, and
//! requests without a descriptor all pass through unmodified.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::header::{CONTENT_LENGTH, CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use super::client_format::{ClientFormat, ClientGeneration};

/// Middleware applying [`transform_body`] to every JSON response.
///
/// Reads the descriptor attached by the detection middleware; a request that
/// somehow carries none is passed through untouched.
pub async fn format_response_middleware(request: Request, next: Next) -> Response {
    let format = request.extensions().get::<ClientFormat>().cloned();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    match format {
        Some(format) => reshape_response(response, &format, &path).await,
        None => response,
    }
}

async fn reshape_response(response: Response, format: &ClientFormat, path: &str) -> Response {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("failed to buffer response body for reshaping: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        // Not actually JSON despite the content type; send it as-is.
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };

    let transformed = transform_body(value, format, path);
    let payload = match serde_json::to_vec(&transformed) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!("failed to serialize reshaped response body: {}", e);
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    // The body may have changed size; let the new body carry its own length.
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(payload))
}

/// Rewrite a handler body into the shape the classified client expects.
///
/// Every branch checks for the target shape before wrapping, so applying the
/// transformation twice is a no-op.
pub fn transform_body(body: Value, format: &ClientFormat, path: &str) -> Value {
    // Error bodies report failure the same way for every client generation.
    if let Some(error) = body.get("error") {
        let mut normalized = Map::new();
        normalized.insert("success".to_string(), Value::Bool(false));
        normalized.insert("error".to_string(), error.clone());
        if let Some(message) = body.get("message") {
            normalized.insert("message".to_string(), message.clone());
        }
        return Value::Object(normalized);
    }

    match format.generation {
        ClientGeneration::Current => body,
        ClientGeneration::V2 => {
            if format.wrap_in_data && body.get("data").is_none() {
                wrap(body, format)
            } else {
                body
            }
        }
        ClientGeneration::Legacy => transform_legacy(body, format, path),
    }
}

fn transform_legacy(body: Value, format: &ClientFormat, path: &str) -> Value {
    // Already enveloped: pass through unchanged.
    if body.get("success").is_some() && body.get("data").is_some() {
        return body;
    }

    // Login/register responses carry { user, token } which old apps expect
    // nested under data, whatever the handler emitted.
    if is_session_issue_path(path) {
        if let Some((user, token)) = session_payload(&body) {
            let mut data = Map::new();
            data.insert("user".to_string(), user);
            data.insert("token".to_string(), token);
            return wrap(Value::Object(data), format);
        }
    }

    // The current-user endpoint historically returned { user } bare.
    if is_current_user_path(path) && body.get("user").is_some() {
        return body;
    }

    if format.wrap_in_data {
        return wrap(body, format);
    }
    body
}

fn wrap(body: Value, format: &ClientFormat) -> Value {
    let mut envelope = Map::new();
    if format.include_success {
        envelope.insert("success".to_string(), Value::Bool(true));
    }
    envelope.insert("data".to_string(), body);
    Value::Object(envelope)
}

fn is_session_issue_path(path: &str) -> bool {
    path.contains("/login") || path.contains("/register")
}

fn is_current_user_path(path: &str) -> bool {
    path.contains("/auth/me")
}

/// Extract (user, token) from the top level or nested one level under `data`.
fn session_payload(body: &Value) -> Option<(Value, Value)> {
    fn pair(value: &Value) -> Option<(Value, Value)> {
        Some((value.get("user")?.clone(), value.get("token")?.clone()))
    }
    pair(body).or_else(|| body.get("data").and_then(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn current_body_passes_through() {
        let body = json!({ "user": { "id": "1" }, "token": "abc" });
        let out = transform_body(body.clone(), &ClientFormat::current(), "/auth/login");
        assert_eq!(out, body);
    }

    #[test]
    fn error_body_is_normalized_for_every_generation() {
        for format in [
            ClientFormat::legacy(),
            ClientFormat::v2(),
            ClientFormat::current(),
        ] {
            let out = transform_body(json!({ "error": "not found" }), &format, "/api/jobs/1");
            assert_eq!(out, json!({ "success": false, "error": "not found" }));
        }
    }

    #[test]
    fn error_body_keeps_its_message() {
        let body = json!({ "error": "validation failed", "message": "weight is required" });
        let out = transform_body(body, &ClientFormat::current(), "/api/jobs");
        assert_eq!(
            out,
            json!({ "success": false, "error": "validation failed", "message": "weight is required" })
        );
    }

    #[test]
    fn v2_wraps_bare_body() {
        let out = transform_body(json!({ "id": "1" }), &ClientFormat::v2(), "/api/jobs/1");
        assert_eq!(out, json!({ "success": true, "data": { "id": "1" } }));
    }

    #[test]
    fn v2_leaves_body_with_data_field_alone() {
        let body = json!({ "data": [1, 2, 3] });
        let out = transform_body(body.clone(), &ClientFormat::v2(), "/api/jobs");
        assert_eq!(out, body);
    }

    #[test]
    fn legacy_reshapes_login_payload() {
        let body = json!({ "user": { "id": "1" }, "token": "abc" });
        let out = transform_body(body, &ClientFormat::legacy(), "/auth/login");
        assert_eq!(
            out,
            json!({ "success": true, "data": { "user": { "id": "1" }, "token": "abc" } })
        );
    }

    #[test]
    fn legacy_reshapes_login_payload_nested_under_data() {
        let body = json!({ "data": { "user": { "id": "1" }, "token": "abc" } });
        let out = transform_body(body, &ClientFormat::legacy(), "/auth/register");
        assert_eq!(
            out,
            json!({ "success": true, "data": { "user": { "id": "1" }, "token": "abc" } })
        );
    }

    #[test]
    fn legacy_leaves_current_user_body_alone() {
        let body = json!({ "user": { "id": "1", "email": "d@example.com" } });
        let out = transform_body(body.clone(), &ClientFormat::legacy(), "/api/auth/me");
        assert_eq!(out, body);
    }

    #[test]
    fn legacy_wraps_generic_bodies_and_arrays() {
        let out = transform_body(json!({ "id": "1" }), &ClientFormat::legacy(), "/api/jobs/1");
        assert_eq!(out, json!({ "success": true, "data": { "id": "1" } }));

        let out = transform_body(json!([1, 2]), &ClientFormat::legacy(), "/api/jobs");
        assert_eq!(out, json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn transformation_is_idempotent() {
        let format = ClientFormat::legacy();
        let once = transform_body(json!({ "id": "1" }), &format, "/api/jobs/1");
        let twice = transform_body(once.clone(), &format, "/api/jobs/1");
        assert_eq!(once, twice);

        let login = transform_body(
            json!({ "user": { "id": "1" }, "token": "abc" }),
            &format,
            "/auth/login",
        );
        let login_twice = transform_body(login.clone(), &format, "/auth/login");
        assert_eq!(login, login_twice);
    }
}
