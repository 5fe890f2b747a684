//! Client generation detection.
//!
//! Several generations of driver and dispatcher apps talk to this API and each
//! expects a different response envelope. Every request is classified exactly
//! once, from headers alone, into a [`ClientFormat`] descriptor that the
//! response middleware consumes when reshaping the outgoing body.
//!
//! Precedence is an ordered rule list ([`DETECTION_RULES`]), not control flow:
//! the first rule that claims the request wins.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

pub const API_VERSION_HEADER: &str = "x-api-version";
pub const APP_VERSION_HEADER: &str = "app-version";

/// User-Agent substrings (lowercase) of historical client apps that predate
/// versioned headers.
pub const LEGACY_AGENT_TOKENS: &[&str] =
    &["linehaul-driver", "linehaul-dispatch", "okhttp/3", "dart/2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientGeneration {
    Legacy,
    V2,
    Current,
}

/// Per-request response-shape descriptor. Computed once, consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFormat {
    pub generation: ClientGeneration,
    pub wrap_in_data: bool,
    pub include_success: bool,
}

impl ClientFormat {
    pub const fn legacy() -> Self {
        Self {
            generation: ClientGeneration::Legacy,
            wrap_in_data: true,
            include_success: true,
        }
    }

    pub const fn v2() -> Self {
        Self {
            generation: ClientGeneration::V2,
            wrap_in_data: true,
            include_success: true,
        }
    }

    pub const fn current() -> Self {
        Self {
            generation: ClientGeneration::Current,
            wrap_in_data: false,
            include_success: false,
        }
    }
}

impl Default for ClientFormat {
    fn default() -> Self {
        Self::current()
    }
}

/// A single classification rule: returns a descriptor when the rule claims the
/// request, `None` to let the next rule inspect it.
pub struct FormatRule {
    pub name: &'static str,
    pub detect: fn(&HeaderMap) -> Option<ClientFormat>,
}

/// Ordered rule list; evaluated top-down, first match wins.
pub static DETECTION_RULES: &[FormatRule] = &[
    FormatRule {
        name: "explicit-version-header",
        detect: explicit_version_header,
    },
    FormatRule {
        name: "app-version-header",
        detect: app_version_header,
    },
    FormatRule {
        name: "legacy-user-agent",
        detect: legacy_user_agent,
    },
    FormatRule {
        name: "bearer-token-fallback",
        detect: bearer_token_fallback,
    },
];

/// Classify the caller. Always yields a descriptor; with no rule claiming the
/// request the caller is treated as current-generation (unwrapped).
pub fn detect_client_format(headers: &HeaderMap) -> ClientFormat {
    DETECTION_RULES
        .iter()
        .find_map(|rule| (rule.detect)(headers))
        .unwrap_or_default()
}

/// An explicit X-Api-Version header settles classification outright; an
/// unrecognized value means a current client, not a fall-through.
fn explicit_version_header(headers: &HeaderMap) -> Option<ClientFormat> {
    let value = headers.get(API_VERSION_HEADER)?.to_str().ok()?;
    match value.trim() {
        "v1" | "1" => Some(ClientFormat::legacy()),
        "v2" | "2" => Some(ClientFormat::v2()),
        _ => Some(ClientFormat::current()),
    }
}

/// Only the pre-versioning apps send App-Version; the value itself is ignored.
fn app_version_header(headers: &HeaderMap) -> Option<ClientFormat> {
    headers
        .get(APP_VERSION_HEADER)
        .map(|_| ClientFormat::legacy())
}

fn legacy_user_agent(headers: &HeaderMap) -> Option<ClientFormat> {
    let agent = headers.get("user-agent")?.to_str().ok()?.to_lowercase();
    LEGACY_AGENT_TOKENS
        .iter()
        .any(|token| agent.contains(token))
        .then(ClientFormat::legacy)
}

/// Conservative default: an unidentified caller presenting a bearer token is
/// assumed to be a pre-existing (wrapped-envelope) client.
fn bearer_token_fallback(headers: &HeaderMap) -> Option<ClientFormat> {
    headers.get("authorization").map(|_| ClientFormat::legacy())
}

/// Middleware that classifies the caller and attaches the descriptor to the
/// request for the response transformer (and anything else downstream).
pub async fn detect_client_format_middleware(mut request: Request, next: Next) -> Response {
    let format = detect_client_format(request.headers());
    tracing::debug!(
        generation = ?format.generation,
        path = %request.uri().path(),
        "classified client format"
    );
    request.extensions_mut().insert(format);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn bare_request_is_current() {
        assert_eq!(detect_client_format(&HeaderMap::new()), ClientFormat::current());
    }

    #[test]
    fn explicit_v1_header_is_legacy() {
        for value in ["v1", "1"] {
            let format = detect_client_format(&headers(&[("x-api-version", value)]));
            assert_eq!(format, ClientFormat::legacy());
        }
    }

    #[test]
    fn explicit_v2_header_wraps_with_success() {
        let format = detect_client_format(&headers(&[("x-api-version", "v2")]));
        assert_eq!(format.generation, ClientGeneration::V2);
        assert!(format.wrap_in_data);
        assert!(format.include_success);
    }

    #[test]
    fn unknown_version_header_is_current_not_fallthrough() {
        // Even with a legacy user agent present, an explicit header settles it.
        let format = detect_client_format(&headers(&[
            ("x-api-version", "v3"),
            ("user-agent", "linehaul-driver/0.9"),
        ]));
        assert_eq!(format, ClientFormat::current());
    }

    #[test]
    fn explicit_header_beats_legacy_user_agent() {
        let format = detect_client_format(&headers(&[
            ("x-api-version", "v2"),
            ("user-agent", "linehaul-driver/0.9"),
        ]));
        assert_eq!(format.generation, ClientGeneration::V2);
    }

    #[test]
    fn app_version_header_is_legacy_regardless_of_value() {
        let format = detect_client_format(&headers(&[("app-version", "9.9.9")]));
        assert_eq!(format, ClientFormat::legacy());
    }

    #[test]
    fn legacy_user_agent_is_matched_case_insensitively() {
        let format = detect_client_format(&headers(&[("user-agent", "Linehaul-Driver/1.2.0")]));
        assert_eq!(format, ClientFormat::legacy());
    }

    #[test]
    fn modern_user_agent_without_auth_is_current() {
        let format = detect_client_format(&headers(&[("user-agent", "Mozilla/5.0")]));
        assert_eq!(format, ClientFormat::current());
    }

    #[test]
    fn bearer_token_alone_falls_back_to_legacy() {
        let format = detect_client_format(&headers(&[
            ("user-agent", "Mozilla/5.0"),
            ("authorization", "Bearer abc"),
        ]));
        assert_eq!(format, ClientFormat::legacy());
    }
}
