//! Credential store adapter: persistence of user records.

use std::future::Future;
use std::time::Duration;

use rocket_db_pools::sqlx::{self, PgPool};
use uuid::Uuid;

use crate::auth::error::is_unique_violation;
use crate::auth::{AuthError, AuthResult};
use crate::models::{NewUserRecord, UserRecord};

#[rocket::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: Uuid) -> AuthResult<Option<UserRecord>>;

    /// Inserts a user. A duplicate email must surface as [`AuthError::Conflict`],
    /// including when two inserts race past the service's pre-check.
    async fn create_user(&self, user: NewUserRecord) -> AuthResult<UserRecord>;
}

/// Runs a store future under the configured deadline.
pub async fn bounded<T, F>(limit: Duration, fut: F) -> AuthResult<T>
where
    F: Future<Output = AuthResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            log::warn!("store call exceeded {} ms", millis);
            Err(AuthError::StoreTimeout(millis))
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[rocket::async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        bounded(self.timeout, async {
            let row = sqlx::query_as::<_, UserRecord>(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        })
        .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> AuthResult<Option<UserRecord>> {
        bounded(self.timeout, async {
            let row = sqlx::query_as::<_, UserRecord>(
                "SELECT id, email, password_hash, name, created_at FROM users WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        })
        .await
    }

    async fn create_user(&self, user: NewUserRecord) -> AuthResult<UserRecord> {
        bounded(self.timeout, async {
            let result = sqlx::query_as::<_, UserRecord>(
                r#"
                INSERT INTO users (id, email, password_hash, name)
                VALUES ($1, $2, $3, $4)
                RETURNING id, email, password_hash, name, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(row) => Ok(row),
                Err(err) if is_unique_violation(&err) => Err(AuthError::Conflict),
                Err(err) => Err(AuthError::from(err)),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bounded_turns_a_hang_into_a_timeout() {
        let result: AuthResult<()> = bounded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(AuthError::StoreTimeout(10))));
    }

    #[tokio::test]
    async fn bounded_passes_results_through() {
        let ok = bounded(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(ok.expect("value"), 7);

        let err: AuthResult<()> =
            bounded(Duration::from_secs(1), async { Err(AuthError::Conflict) }).await;
        assert!(matches!(err, Err(AuthError::Conflict)));
    }
}
