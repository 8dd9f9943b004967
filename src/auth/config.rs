use std::time::Duration;

use crate::auth::{AuthError, AuthResult};

/// Deployment environment; only production turns on `Secure` cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Authentication configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub environment: Environment,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub token_cookie_name: String,
    pub session_cookie_name: String,
    pub session_ttl_secs: i64,
    pub session_prune_interval_secs: u64,
    pub password_hash_cost: u32,
    pub store_timeout_ms: u64,
    pub cors_origin: String,
}

impl AuthConfig {
    pub fn from_env() -> AuthResult<Self> {
        let environment = std::env::var("IDENTITY_ENV")
            .map(|value| Environment::parse(&value))
            .unwrap_or(Environment::Development);
        let jwt_secret = std::env::var("IDENTITY_JWT_SECRET")
            .map_err(|_| AuthError::Config("IDENTITY_JWT_SECRET is required".into()))?;
        let token_ttl_secs = parse_env("IDENTITY_TOKEN_TTL_SECS", 60 * 60);
        let token_cookie_name =
            std::env::var("IDENTITY_TOKEN_COOKIE_NAME").unwrap_or_else(|_| "token".into());
        let session_cookie_name =
            std::env::var("IDENTITY_SESSION_COOKIE_NAME").unwrap_or_else(|_| "sessionId".into());
        let session_ttl_secs = parse_env("IDENTITY_SESSION_TTL_SECS", 24 * 60 * 60);
        let session_prune_interval_secs = parse_env("IDENTITY_SESSION_PRUNE_INTERVAL_SECS", 60);
        let password_hash_cost = parse_env("IDENTITY_PASSWORD_HASH_COST", 10);
        let store_timeout_ms = parse_env("IDENTITY_STORE_TIMEOUT_MS", 5_000);
        let cors_origin = std::env::var("IDENTITY_CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".into());

        let config = Self {
            environment,
            jwt_secret,
            token_ttl_secs,
            token_cookie_name,
            session_cookie_name,
            session_ttl_secs,
            session_prune_interval_secs,
            password_hash_cost,
            store_timeout_ms,
            cors_origin,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.jwt_secret.is_empty() {
            return Err(AuthError::Config("jwt secret must not be empty".into()));
        }
        if self.password_hash_cost == 0 {
            return Err(AuthError::Config("password hash cost must be at least 1".into()));
        }
        if self.token_ttl_secs <= 0 || self.session_ttl_secs <= 0 {
            return Err(AuthError::Config("credential lifetimes must be positive".into()));
        }
        if self.session_prune_interval_secs == 0 {
            return Err(AuthError::Config("session prune interval must be positive".into()));
        }
        if self.store_timeout_ms == 0 {
            return Err(AuthError::Config("store timeout must be positive".into()));
        }
        Ok(())
    }

    pub fn cookie_secure(&self) -> bool {
        self.environment.is_production()
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn session_prune_interval(&self) -> Duration {
        Duration::from_secs(self.session_prune_interval_secs)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}
