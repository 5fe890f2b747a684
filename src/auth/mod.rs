pub mod revocation;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

/// User roles. Stored uppercase in both the database and token claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Identity claim embedded in every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, role: Role) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            role,
            exp,
            iat: now.timestamp(),
        }
    }

    /// Seconds until natural expiry. Zero when the token has already expired.
    pub fn remaining_validity_secs(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Token generation failed: {0}")]
    Generation(String),
}

/// Sign a token embedding the given claims (HS256, shared secret).
pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::Generation(e.to_string()))
}

/// Verify signature and expiry, yielding the embedded identity claim.
pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> Claims {
        Claims::new(Uuid::new_v4(), "dispatch@example.com".to_string(), Role::User)
    }

    #[test]
    fn round_trip_preserves_identity() {
        let original = claims();
        let token = generate_jwt(&original).unwrap();
        let decoded = validate_jwt(&token).unwrap();

        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.email, original.email);
        assert_eq!(decoded.role, Role::User);
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut expired = claims();
        expired.exp = (Utc::now() - Duration::hours(2)).timestamp();
        expired.iat = (Utc::now() - Duration::hours(3)).timestamp();

        let secret = &config::config().security.jwt_secret;
        let token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(validate_jwt(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = encode(
            &Header::default(),
            &claims(),
            &EncodingKey::from_secret(b"not-the-configured-secret"),
        )
        .unwrap();

        assert!(matches!(validate_jwt(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            validate_jwt("not.a.token"),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn remaining_validity_is_zero_after_expiry() {
        let mut c = claims();
        c.exp = (Utc::now() - Duration::hours(1)).timestamp();
        assert_eq!(c.remaining_validity_secs(), 0);

        let fresh = claims();
        assert!(fresh.remaining_validity_secs() > 0);
    }
}
