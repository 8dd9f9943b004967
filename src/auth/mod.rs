//! Authentication module: configuration, credential handling, session and
//! token strategies, Rocket request guards.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod responses;
pub mod service;
pub mod session;
pub mod session_store;
pub mod store;
pub mod token;
pub mod validation;

pub use config::{AuthConfig, Environment};
pub use error::{AuthError, AuthResult};
pub use guards::{AuthStrategy, SessionUser, TokenUser};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use service::AuthService;
pub use session::SessionStrategy;
pub use session_store::{PgSessionStore, SessionStore};
pub use store::{CredentialStore, PgCredentialStore};
pub use token::TokenStrategy;

/// Everything the auth routes need, managed as Rocket state.
#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub service: AuthService,
    pub sessions: SessionStrategy,
    pub tokens: TokenStrategy,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let passwords = PasswordService::new(config.password_hash_cost)?;
        let jwt = JwtService::from_config(&config)?;

        Ok(Self {
            service: AuthService::new(credentials, Arc::new(passwords)),
            sessions: SessionStrategy::new(sessions, &config),
            tokens: TokenStrategy::new(Arc::new(jwt), &config),
            config,
        })
    }

    /// Production wiring over a shared Postgres pool.
    pub fn with_pg_pool(config: AuthConfig, pool: sqlx::PgPool) -> AuthResult<Self> {
        let timeout = config.store_timeout();
        let credentials = Arc::new(PgCredentialStore::new(pool.clone(), timeout));
        let sessions = Arc::new(PgSessionStore::new(pool, timeout));
        Self::new(config, credentials, sessions)
    }
}
