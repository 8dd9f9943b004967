use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, ParamsBuilder, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::RngCore;

use crate::auth::{AuthError, AuthResult};

const SALT_LEN: usize = 16;
const MEMORY_COST_KIB: u32 = 19 * 1024; // 19 MiB
const DUMMY_PASSWORD: &str = "unknown-account-placeholder";

/// Argon2id hasher. The cost factor is the argon2 time cost; the PHC output
/// embeds salt and parameters, so verification needs nothing else.
#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    /// Digest made with the configured parameters, verified against when the
    /// account does not exist so that miss and mismatch cost the same.
    dummy_digest: Arc<str>,
}

impl PasswordService {
    pub fn new(cost: u32) -> AuthResult<Self> {
        let mut builder = ParamsBuilder::new();
        builder.m_cost(MEMORY_COST_KIB);
        builder.t_cost(cost);
        builder.p_cost(1);
        let params = builder.build().map_err(AuthError::from)?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let dummy_digest = hash_with(&argon2, DUMMY_PASSWORD)?;
        Ok(Self {
            argon2,
            dummy_digest: Arc::from(dummy_digest),
        })
    }

    /// Hashes on the blocking pool so other requests keep running.
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let service = self.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || service.hash_password(&password)).await?
    }

    pub async fn verify(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let service = self.clone();
        let password = password.to_owned();
        let encoded = encoded.to_owned();
        tokio::task::spawn_blocking(move || service.verify_password(&password, &encoded)).await?
    }

    /// Spends one full verification whose outcome is discarded.
    pub async fn verify_dummy(&self, password: &str) -> AuthResult<()> {
        let digest = Arc::clone(&self.dummy_digest);
        self.verify(password, &digest).await?;
        Ok(())
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        hash_with(&self.argon2, password)
    }

    /// Verification uses the parameters recorded in `encoded`, not the configured cost,
    /// so digests made under an older cost keep verifying.
    pub fn verify_password(&self, password: &str, encoded: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(encoded)?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(err) => Err(AuthError::from(err)),
        }
    }
}

fn hash_with(argon2: &Argon2<'static>, password: &str) -> AuthResult<String> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(AuthError::from)?;
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(AuthError::from)?
        .to_string();
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_and_verifies_passwords() {
        let service = PasswordService::new(1).expect("password service");
        let hash = service
            .hash_password("super-secret")
            .expect("hash generation");
        assert!(
            service
                .verify_password("super-secret", &hash)
                .expect("verify succeeds")
        );
        assert!(
            !service
                .verify_password("wrong-password", &hash)
                .expect("verify runs")
        );
    }

    #[test]
    fn digest_is_self_describing_and_salted() {
        let service = PasswordService::new(2).expect("password service");
        let first = service.hash_password("secret1").expect("hash");
        let second = service.hash_password("secret1").expect("hash");

        assert!(first.starts_with("$argon2id$v=19$"));
        assert!(first.contains("t=2"));
        assert_ne!(first, second);

        let other_cost = PasswordService::new(1).expect("password service");
        assert!(other_cost.verify_password("secret1", &first).expect("verify"));
    }

    #[test]
    fn malformed_digest_is_an_error() {
        let service = PasswordService::new(1).expect("password service");
        assert!(matches!(
            service.verify_password("secret1", "not-a-phc-string"),
            Err(AuthError::PasswordHash(_))
        ));
    }

    #[test]
    fn zero_cost_is_rejected() {
        assert!(matches!(PasswordService::new(0), Err(AuthError::Argon2(_))));
    }

    #[test]
    fn dummy_digest_uses_the_configured_cost() {
        let service = PasswordService::new(3).expect("password service");
        assert!(service.dummy_digest.starts_with("$argon2id$v=19$"));
        assert!(service.dummy_digest.contains("t=3"));
    }

    #[tokio::test]
    async fn dummy_verification_runs_a_real_check() {
        let service = PasswordService::new(1).expect("password service");
        service.verify_dummy("secret1").await.expect("verify");
        assert!(
            service
                .verify_password(DUMMY_PASSWORD, &service.dummy_digest)
                .expect("dummy digest parses")
        );
    }

    #[tokio::test]
    async fn async_hash_runs_off_the_executor() {
        let service = PasswordService::new(1).expect("password service");
        let hash = service.hash("secret1").await.expect("hash");
        assert!(service.verify("secret1", &hash).await.expect("verify"));
        assert!(!service.verify("secret2", &hash).await.expect("verify"));
    }
}
