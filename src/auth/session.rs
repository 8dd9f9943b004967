//! Session strategy: an opaque id in an HTTP-only cookie, mapped server-side
//! to a user id.
//!
//! A session is `ACTIVE` from creation until logout or expiry, after which it
//! is gone. Login always mints a new id so a pre-planted id can never be
//! promoted to an authenticated one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocket::Request;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Serialize;
use time::Duration as TimeDuration;
use uuid::Uuid;

use crate::auth::guards::AuthStrategy;
use crate::auth::session_store::{SessionRecord, SessionStore};
use crate::auth::{AuthConfig, AuthError, AuthResult, AuthState};
use crate::models::User;

/// What the session gate hands to protected handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPrincipal {
    pub session_id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStrategy {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
    ttl: Duration,
    secure: bool,
}

impl SessionStrategy {
    pub fn new(store: Arc<dyn SessionStore>, config: &AuthConfig) -> Self {
        Self {
            store,
            cookie_name: config.session_cookie_name.clone(),
            ttl: Duration::seconds(config.session_ttl_secs),
            secure: config.cookie_secure(),
        }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Regenerates the session for a freshly authenticated user. The old id
    /// is destroyed and the new record committed before the cookie is set.
    pub async fn login(&self, cookies: &CookieJar<'_>, user: &User) -> AuthResult<SessionRecord> {
        if let Some(previous) = self.current_id(cookies) {
            self.store.destroy(&previous).await?;
        }

        let mut record = SessionRecord::new(Utc::now(), self.ttl);
        record.user_id = Some(user.id);
        self.store.save(&record).await?;
        self.set_cookie(cookies, &record);

        log::info!("user {} logged in with a new session", user.id);
        Ok(record)
    }

    /// Binds a newly registered user to the caller's current session when it
    /// is still unbound. A session already bound to someone is destroyed and
    /// replaced, so a planted id never ends up naming the new account.
    pub async fn register(
        &self,
        cookies: &CookieJar<'_>,
        user: &User,
    ) -> AuthResult<SessionRecord> {
        let existing = match self.current_id(cookies) {
            Some(id) => match self.store.load(&id).await? {
                Some(record) if record.user_id.is_none() => Some(record),
                Some(bound) => {
                    self.store.destroy(&bound.id).await?;
                    None
                }
                None => None,
            },
            None => None,
        };

        let mut record = existing.unwrap_or_else(|| SessionRecord::new(Utc::now(), self.ttl));
        record.user_id = Some(user.id);
        self.store.save(&record).await?;
        self.set_cookie(cookies, &record);

        Ok(record)
    }

    /// Clears the carrier first so the client drops it even when the store
    /// delete fails; the failure is still returned.
    pub async fn logout(&self, cookies: &CookieJar<'_>) -> AuthResult<()> {
        let current = self.current_id(cookies);
        self.clear_cookie(cookies);

        if let Some(id) = current {
            self.store.destroy(&id).await?;
            log::info!("session destroyed on logout");
        }
        Ok(())
    }

    fn current_id(&self, cookies: &CookieJar<'_>) -> Option<String> {
        cookies
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    fn set_cookie(&self, cookies: &CookieJar<'_>, record: &SessionRecord) {
        let max_age_secs = (record.expires_at - Utc::now()).num_seconds().max(0);
        let cookie = Cookie::build((self.cookie_name.clone(), record.id.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(TimeDuration::seconds(max_age_secs))
            .build();

        cookies.add(cookie);
    }

    fn clear_cookie(&self, cookies: &CookieJar<'_>) {
        let cookie = Cookie::build((self.cookie_name.clone(), String::new()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .removal()
            .build();

        cookies.add(cookie);
    }
}

#[rocket::async_trait]
impl AuthStrategy for SessionStrategy {
    type Principal = SessionPrincipal;

    fn select(state: &AuthState) -> &Self {
        &state.sessions
    }

    async fn authorize(&self, request: &Request<'_>) -> AuthResult<SessionPrincipal> {
        let id = self
            .current_id(request.cookies())
            .ok_or(AuthError::Unauthorized)?;

        let record = self
            .store
            .load(&id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let user_id = record.user_id.ok_or(AuthError::Unauthorized)?;

        Ok(SessionPrincipal {
            session_id: record.id,
            user_id,
            expires_at: record.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemorySessionStore, test_auth_config};

    fn strategy() -> (SessionStrategy, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::default());
        (SessionStrategy::new(store.clone(), &test_auth_config()), store)
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            name: "Ann".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn takes_cookie_settings_from_config() {
        let (strategy, _) = strategy();
        assert_eq!(strategy.cookie_name(), "sessionId");
        assert!(!strategy.secure);
        assert_eq!(strategy.ttl, Duration::seconds(86_400));
    }

    #[tokio::test]
    async fn store_round_trip_keeps_binding() {
        let (strategy, store) = strategy();
        let user = user();
        let mut record = SessionRecord::new(Utc::now(), strategy.ttl);
        record.user_id = Some(user.id);
        strategy.store().save(&record).await.expect("save");

        let loaded = store.load(&record.id).await.expect("load").expect("live");
        assert_eq!(loaded.user_id, Some(user.id));

        store.destroy(&record.id).await.expect("destroy");
        assert!(store.load(&record.id).await.expect("load").is_none());
    }
}
