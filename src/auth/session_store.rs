//! Server-side session persistence keyed by an opaque session id.
//!
//! Expiry is enforced here: an expired record is never returned by
//! [`SessionStore::load`], whether or not the pruning sweep has deleted it yet.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rocket_db_pools::sqlx::{self, PgPool, Row};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthResult;
use crate::auth::store::bounded;

const SESSION_ID_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub data: Value,
}

impl SessionRecord {
    /// Fresh, unbound session with a random id.
    pub fn new(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: generate_session_id(),
            user_id: None,
            expires_at: now + ttl,
            data: Value::Object(Default::default()),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[rocket::async_trait]
pub trait SessionStore: Send + Sync {
    /// Live record for `id`, or `None` when unknown or expired.
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>>;

    /// Insert or overwrite the record. Returns once the write is committed.
    async fn save(&self, record: &SessionRecord) -> AuthResult<()>;

    /// Remove the record. Unknown ids are not an error.
    async fn destroy(&self, id: &str) -> AuthResult<()>;

    /// Delete expired records, returning how many were removed.
    async fn prune_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    timeout: StdDuration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, timeout: StdDuration) -> Self {
        Self { pool, timeout }
    }
}

#[rocket::async_trait]
impl SessionStore for PgSessionStore {
    async fn load(&self, id: &str) -> AuthResult<Option<SessionRecord>> {
        bounded(self.timeout, async {
            let row = sqlx::query(
                "SELECT sid, user_id, expires_at, data FROM sessions WHERE sid = $1 AND expires_at > $2",
            )
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };

            Ok(Some(SessionRecord {
                id: row.try_get("sid")?,
                user_id: row.try_get("user_id")?,
                expires_at: row.try_get("expires_at")?,
                data: row.try_get("data")?,
            }))
        })
        .await
    }

    async fn save(&self, record: &SessionRecord) -> AuthResult<()> {
        bounded(self.timeout, async {
            sqlx::query(
                r#"
                INSERT INTO sessions (sid, user_id, expires_at, data)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (sid) DO UPDATE
                SET user_id = EXCLUDED.user_id,
                    expires_at = EXCLUDED.expires_at,
                    data = EXCLUDED.data
                "#,
            )
            .bind(&record.id)
            .bind(record.user_id)
            .bind(record.expires_at)
            .bind(&record.data)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await
    }

    async fn destroy(&self, id: &str) -> AuthResult<()> {
        bounded(self.timeout, async {
            sqlx::query("DELETE FROM sessions WHERE sid = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        bounded(self.timeout, async {
            let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
                .bind(now)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected())
        })
        .await
    }
}

/// Spawns the interval-driven sweep that deletes expired sessions.
pub fn spawn_pruning_sweep(
    store: Arc<dyn SessionStore>,
    interval: StdDuration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.prune_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => log::debug!("pruned {} expired sessions", removed),
                Err(err) => log::warn!("session pruning failed: {}", err),
            }
        }
    })
}
