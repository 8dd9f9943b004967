use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rocket_okapi::okapi::schemars::JsonSchema;
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthResult};
use crate::models::User;

/// Claims embedded in an issued token: a snapshot of the user at issue time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, JsonSchema)]
pub struct TokenClaims {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

/// HS256 signer/verifier keyed by the process-wide secret. Rotating the
/// secret invalidates every outstanding token at once.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        let secret_bytes = config.jwt_secret.as_bytes();
        let encoding_key = EncodingKey::from_secret(secret_bytes);
        let decoding_key = DecodingKey::from_secret(secret_bytes);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            ttl: Duration::seconds(config.token_ttl_secs),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> AuthResult<SignedToken> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> AuthResult<SignedToken> {
        let expires_at = now + self.ttl;
        let claims = TokenClaims {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Checks signature and expiry only. The returned claims are not
    /// re-read from the store and may be stale.
    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use crate::test_support::test_auth_config;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "user@example.com".into(),
            name: "User".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issues_and_verifies_tokens() {
        let service = JwtService::from_config(&test_auth_config()).expect("jwt service");
        let user = user();

        let signed = service.issue(&user).expect("issue token");
        let claims = service.verify(&signed.token).expect("verify token");

        assert_eq!(claims, signed.claims);
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.name, "User");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn rejects_expired_tokens() {
        let service = JwtService::from_config(&test_auth_config()).expect("jwt service");
        let issued_two_hours_ago = Utc::now() - Duration::hours(2);
        let signed = service
            .issue_at(&user(), issued_two_hours_ago)
            .expect("issue token");

        assert!(matches!(
            service.verify(&signed.token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let service = JwtService::from_config(&test_auth_config()).expect("jwt service");
        let rotated = JwtService::from_config(&AuthConfig {
            jwt_secret: "rotated-secret".into(),
            ..test_auth_config()
        })
        .expect("jwt service");

        let signed = rotated.issue(&user()).expect("issue token");
        assert!(matches!(
            service.verify(&signed.token),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn rejects_garbage() {
        let service = JwtService::from_config(&test_auth_config()).expect("jwt service");
        assert!(matches!(
            service.verify("not.a.token"),
            Err(AuthError::TokenInvalid)
        ));
        assert!(matches!(service.verify(""), Err(AuthError::TokenInvalid)));
    }
}
