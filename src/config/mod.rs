use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub redis: RedisConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub bcrypt_cost: u32,
    /// When true, the client IP is read from X-Forwarded-For (reverse proxy)
    /// instead of the socket peer address.
    pub trust_proxy: bool,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

/// Quota classes share a single window duration; each class carries its own cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub auth_max_requests: u32,
    pub realtime_max_requests: u32,
    pub general_max_requests: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_TRUST_PROXY") {
            self.security.trust_proxy = v.parse().unwrap_or(self.security.trust_proxy);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging =
                v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        // Redis overrides
        if let Ok(v) = env::var("REDIS_URL") {
            self.redis.url = v;
        }

        // Rate limit overrides
        if let Ok(v) = env::var("RATE_LIMIT_ENABLED") {
            self.rate_limit.enabled = v.parse().unwrap_or(self.rate_limit.enabled);
        }
        if let Ok(v) = env::var("RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window_secs = v.parse().unwrap_or(self.rate_limit.window_secs);
        }
        if let Ok(v) = env::var("RATE_LIMIT_AUTH_MAX") {
            self.rate_limit.auth_max_requests =
                v.parse().unwrap_or(self.rate_limit.auth_max_requests);
        }
        if let Ok(v) = env::var("RATE_LIMIT_REALTIME_MAX") {
            self.rate_limit.realtime_max_requests =
                v.parse().unwrap_or(self.rate_limit.realtime_max_requests);
        }
        if let Ok(v) = env::var("RATE_LIMIT_GENERAL_MAX") {
            self.rate_limit.general_max_requests =
                v.parse().unwrap_or(self.rate_limit.general_max_requests);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                bcrypt_cost: 4,
                trust_proxy: false,
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
                enable_audit_logging: false,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                window_secs: 15 * 60,
                auth_max_requests: 100,
                realtime_max_requests: 15_000,
                general_max_requests: 3_000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                bcrypt_cost: 10,
                trust_proxy: true,
                enable_cors: true,
                cors_origins: vec!["https://staging.linehaul.example.com".to_string()],
                enable_audit_logging: true,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                window_secs: 15 * 60,
                auth_max_requests: 100,
                realtime_max_requests: 15_000,
                general_max_requests: 3_000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                bcrypt_cost: 12,
                trust_proxy: true,
                enable_cors: true,
                cors_origins: vec!["https://ops.linehaul.example.com".to_string()],
                enable_audit_logging: true,
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                window_secs: 15 * 60,
                auth_max_requests: 100,
                realtime_max_requests: 15_000,
                general_max_requests: 3_000,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.rate_limit.enabled);
        assert!(!config.security.trust_proxy);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.rate_limit.enabled);
        assert!(config.security.trust_proxy);
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.rate_limit.auth_max_requests, 100);
        assert_eq!(config.rate_limit.realtime_max_requests, 15_000);
        assert_eq!(config.rate_limit.general_max_requests, 3_000);
    }
}
