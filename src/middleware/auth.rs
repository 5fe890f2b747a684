use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::revocation::RevocationStore;
use crate::auth::{self, Claims, JwtError, Role};
use crate::error::ApiError;

/// Authenticated caller context extracted from a verified JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    /// Natural expiry of the presented token; logout uses it to size the
    /// revocation TTL.
    pub token_expires_at: i64,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            token_expires_at: claims.exp,
        }
    }
}

/// Raw bearer token as presented, kept on the request so logout can revoke it.
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Injected state for the authentication gate.
#[derive(Clone)]
pub struct GateState {
    pub revocation: Arc<dyn RevocationStore>,
}

impl GateState {
    pub fn new(revocation: Arc<dyn RevocationStore>) -> Self {
        Self { revocation }
    }
}

/// JWT authentication middleware.
///
/// Order matters: the revocation store is consulted before cryptographic
/// verification, so a revoked token fails regardless of its validity.
pub async fn jwt_auth_middleware(
    State(gate): State<GateState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    if gate.revocation.is_revoked(&token).await? {
        tracing::debug!("rejected revoked token");
        return Err(ApiError::unauthorized("Token has been revoked"));
    }

    let claims = auth::validate_jwt(&token).map_err(|e| match e {
        JwtError::Expired => ApiError::unauthorized("Token has expired"),
        JwtError::Invalid(_) => ApiError::unauthorized("Invalid token"),
        JwtError::MissingSecret | JwtError::Generation(_) => {
            tracing::error!("token verification misconfigured: {}", e);
            ApiError::internal_server_error("Authentication unavailable")
        }
    })?;

    request.extensions_mut().insert(AuthUser::from(claims));
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

/// Authorization middleware: the authenticated caller must hold the ADMIN
/// role. A request with no identity attached fails as unauthenticated, not
/// forbidden.
pub async fn require_admin_middleware(
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match request.extensions().get::<AuthUser>() {
        None => Err(ApiError::unauthorized("Authentication required")),
        Some(user) if user.role != Role::Admin => {
            tracing::debug!(user = %user.email, "rejected non-admin caller");
            Err(ApiError::forbidden("Administrator access required"))
        }
        Some(_) => Ok(next.run(request).await),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header. Any
/// other shape is rejected.
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let err = extract_bearer_token(&headers_with_auth("Basic dXNlcjpwdw==")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = extract_bearer_token(&headers_with_auth("Bearer   ")).unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let token = extract_bearer_token(&headers_with_auth("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }
}
