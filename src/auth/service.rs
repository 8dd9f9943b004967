//! Strategy-agnostic account operations: registration, credential checks and
//! lookups. Stores are injected so the service never reaches for globals.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::store::CredentialStore;
use crate::auth::{AuthError, AuthResult, PasswordService};
use crate::models::{NewUser, NewUserRecord, User};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    passwords: Arc<PasswordService>,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, passwords: Arc<PasswordService>) -> Self {
        Self { store, passwords }
    }

    /// Creates an account. Not idempotent: a repeated email yields
    /// [`AuthError::Conflict`], whether caught by the lookup or by the store's
    /// unique constraint when two registrations race.
    pub async fn register_user(&self, new_user: NewUser) -> AuthResult<User> {
        if self
            .store
            .find_user_by_email(&new_user.email)
            .await?
            .is_some()
        {
            log::debug!("registration rejected: email already in use");
            return Err(AuthError::Conflict);
        }

        let password_hash = self.passwords.hash(&new_user.password).await?;
        let record = self
            .store
            .create_user(NewUserRecord {
                email: new_user.email,
                password_hash,
                name: new_user.name,
            })
            .await?;

        log::info!("registered user {}", record.id);
        Ok(User::from(record))
    }

    /// Unknown email and wrong password fail identically.
    pub async fn validate_credentials(&self, email: &str, password: &str) -> AuthResult<User> {
        let Some(record) = self.store.find_user_by_email(email).await? else {
            self.passwords.verify_dummy(password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self.passwords.verify(password, &record.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(User::from(record))
    }

    pub async fn get_user_by_id(&self, id: Uuid) -> AuthResult<User> {
        self.store
            .find_user_by_id(id)
            .await?
            .map(User::from)
            .ok_or(AuthError::NotFound)
    }
}
