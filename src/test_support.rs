//! Shared fixtures for unit and integration tests: in-memory stores, a
//! ready-made [`AuthState`], a Rocket builder and an ephemeral Postgres.
#![cfg_attr(not(test), allow(dead_code))]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rocket::config::LogLevel;
use rocket::figment::Figment;
use rocket::local::blocking::Client;
use rocket::{Build, Rocket, Route};
use uuid::Uuid;

use crate::auth::session_store::{SessionRecord, SessionStore};
use crate::auth::store::CredentialStore;
use crate::auth::{AuthConfig, AuthError, AuthResult, AuthState, Environment};
use crate::models::{NewUserRecord, UserRecord};

pub use database::{TestDatabase, TestDatabaseError};

/// Config with a fixed secret and the cheapest hash cost.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Development,
        jwt_secret: "test-secret-do-not-use".into(),
        token_ttl_secs: 3600,
        token_cookie_name: "token".into(),
        session_cookie_name: "sessionId".into(),
        session_ttl_secs: 86_400,
        session_prune_interval_secs: 60,
        password_hash_cost: 1,
        store_timeout_ms: 5_000,
        cors_origin: "http://localhost:5173".into(),
    }
}

/// Auth state over fresh in-memory stores.
pub fn test_auth_state() -> AuthState {
    test_auth_state_with(Arc::new(MemorySessionStore::default()))
}

/// Auth state over an in-memory credential store and the given session store.
pub fn test_auth_state_with(sessions: Arc<dyn SessionStore>) -> AuthState {
    AuthState::new(
        test_auth_config(),
        Arc::new(MemoryCredentialStore::default()),
        sessions,
    )
    .expect("test auth config is valid")
}

/// Credential store backed by a map keyed on the exact email string.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: DashMap<String, UserRecord>,
}

impl MemoryCredentialStore {
    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[rocket::async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        Ok(self.users.get(email).map(|entry| entry.value().clone()))
    }

    async fn find_user_by_id(&self, id: Uuid) -> AuthResult<Option<UserRecord>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.value().clone()))
    }

    async fn create_user(&self, user: NewUserRecord) -> AuthResult<UserRecord> {
        match self.users.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AuthError::Conflict),
            Entry::Vacant(slot) => {
                let record = UserRecord {
                    id: Uuid::new_v4(),
                    email: user.email,
                    password_hash: user.password_hash,
                    name: user.name,
                    created_at: Utc::now(),
                };
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }
}

/// Session store backed by a map; expired records are filtered on read.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionRecord>,
}

#[rocket::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>> {
        let now = Utc::now();
        Ok(self
            .sessions
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|record| !record.is_expired(now)))
    }

    async fn save(&self, record: &SessionRecord) -> AuthResult<()> {
        self.sessions.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn destroy(&self, id: &str) -> AuthResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let before = self.sessions.len();
        self.sessions.retain(|_, record| !record.is_expired(now));
        Ok((before - self.sessions.len()) as u64)
    }
}

pub mod database {
    use log::LevelFilter;
    use rocket_db_pools::sqlx::postgres::{PgConnectOptions, PgPoolOptions};
    use rocket_db_pools::sqlx::{self, ConnectOptions, PgPool};
    use testcontainers::{ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner};
    use testcontainers_modules::postgres::Postgres;
    use thiserror::Error;
    use tokio::runtime::Handle;
    use uuid::Uuid;

    use crate::db::MIGRATOR;

    #[derive(Debug, Error)]
    pub enum TestDatabaseError {
        #[error("TEST_DATABASE_URL not set")]
        MissingUrl,
        #[error("database error: {0}")]
        Sqlx(#[from] sqlx::Error),
        #[error("migration error: {0}")]
        Migration(#[from] sqlx::migrate::MigrateError),
        #[error("container error: {0}")]
        Container(#[from] TestcontainersError),
    }

    impl TestDatabaseError {
        /// True when no database could be reached at all, so the test should
        /// be skipped rather than failed.
        pub fn is_unavailable(&self) -> bool {
            matches!(
                self,
                TestDatabaseError::MissingUrl | TestDatabaseError::Container(_)
            )
        }
    }

    /// Ephemeral database: a uniquely named database on the server named by
    /// `TEST_DATABASE_URL`, or on a disposable Postgres container.
    pub struct TestDatabase {
        pool: Option<PgPool>,
        admin_options: PgConnectOptions,
        database_name: String,
        container: Option<ContainerAsync<Postgres>>,
    }

    impl TestDatabase {
        /// Uses `TEST_DATABASE_URL` when set, otherwise starts a container.
        pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
            match std::env::var("TEST_DATABASE_URL") {
                Ok(url) => Self::provision(&url, None).await,
                Err(_) => Self::new().await,
            }
        }

        /// Provision a fresh database on a disposable Postgres container.
        pub async fn new() -> Result<Self, TestDatabaseError> {
            let container = Postgres::default().start().await?;
            let host = container.get_host().await?.to_string();
            let port = container.get_host_port_ipv4(5432).await?;
            let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            Self::provision(&admin_url, Some(container)).await
        }

        async fn provision(
            admin_url: &str,
            container: Option<ContainerAsync<Postgres>>,
        ) -> Result<Self, TestDatabaseError> {
            let base_options: PgConnectOptions = admin_url.parse()?;
            let base_options = base_options.log_statements(LevelFilter::Off);

            let admin_options = base_options.clone().database("postgres");
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options.clone())
                .await?;

            let database_name = format!("identity_test_{}", Uuid::new_v4().simple());
            let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name);
            sqlx::query(&create_sql).execute(&admin_pool).await?;
            admin_pool.close().await;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_with(base_options.database(&database_name))
                .await?;

            MIGRATOR.run(&pool).await?;

            Ok(Self {
                pool: Some(pool),
                admin_options,
                database_name,
                container,
            })
        }

        pub fn pool(&self) -> &PgPool {
            self.pool.as_ref().expect("test database pool is available")
        }

        pub fn pool_clone(&self) -> PgPool {
            self.pool().clone()
        }

        /// Close pool connections and drop the ephemeral database.
        pub async fn close(mut self) -> Result<(), TestDatabaseError> {
            if let Some(pool) = self.pool.take() {
                pool.close().await;
            }

            drop_database(self.admin_options.clone(), &self.database_name).await?;

            if let Some(container) = self.container.take() {
                drop(container);
            }

            Ok(())
        }
    }

    async fn drop_database(
        admin_options: PgConnectOptions,
        database_name: &str,
    ) -> Result<(), sqlx::Error> {
        let admin_pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(admin_options)
            .await?;

        let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
        sqlx::query(&drop_sql).execute(&admin_pool).await?;
        Ok(())
    }

    impl Drop for TestDatabase {
        fn drop(&mut self) {
            if let Some(pool) = self.pool.take() {
                let admin_options = self.admin_options.clone();
                let db_name = self.database_name.clone();
                if let Ok(handle) = Handle::try_current() {
                    handle.spawn(async move {
                        pool.close().await;
                        let _ = drop_database(admin_options, &db_name).await;
                    });
                }
            }

            if let Some(container) = self.container.take() {
                drop(container);
            }
        }
    }
}

/// Builder for constructing Rocket instances tailored for integration tests.
pub struct TestRocketBuilder {
    figment: Figment,
    mounts: Vec<(String, Vec<Route>)>,
    auth_state: Option<AuthState>,
}

impl Default for TestRocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRocketBuilder {
    /// Random port, logging disabled, JSON catchers registered.
    pub fn new() -> Self {
        let figment = rocket::Config::figment()
            .merge(("port", 0))
            .merge(("log_level", LogLevel::Off))
            .merge(("cli_colors", false));

        Self {
            figment,
            mounts: Vec::new(),
            auth_state: None,
        }
    }

    /// Mount routes under `/api/v1`.
    pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
        self.mounts.push(("/api/v1".to_string(), routes));
        self
    }

    pub fn manage_auth_state(mut self, state: AuthState) -> Self {
        self.auth_state = Some(state);
        self
    }

    pub fn build(self) -> Rocket<Build> {
        let mut rocket = rocket::custom(self.figment).register("/", crate::error::catchers());

        for (base, routes) in self.mounts {
            rocket = rocket.mount(base, routes);
        }

        if let Some(state) = self.auth_state {
            rocket = rocket.manage(state);
        }

        rocket
    }

    /// Blocking client that keeps cookies between requests, like a browser.
    pub fn blocking_client(self) -> Client {
        Client::tracked(self.build()).expect("valid Rocket instance")
    }

    /// Blocking client that never replays cookies on its own.
    pub fn untracked_client(self) -> Client {
        Client::untracked(self.build()).expect("valid Rocket instance")
    }
}
