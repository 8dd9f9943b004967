//! Token strategy: stateless signed tokens carried in a cookie or a bearer
//! header.
//!
//! Nothing is stored server-side. Logout only removes the cookie; a token
//! that was copied elsewhere stays valid until its `exp`.

use std::sync::Arc;

use rocket::Request;
use rocket::http::{Cookie, CookieJar, SameSite};
use time::Duration as TimeDuration;

use crate::auth::guards::AuthStrategy;
use crate::auth::jwt::{JwtService, SignedToken, TokenClaims};
use crate::auth::{AuthConfig, AuthError, AuthResult, AuthState};
use crate::models::User;

#[derive(Clone)]
pub struct TokenStrategy {
    jwt: Arc<JwtService>,
    cookie_name: String,
    secure: bool,
}

impl TokenStrategy {
    pub fn new(jwt: Arc<JwtService>, config: &AuthConfig) -> Self {
        Self {
            jwt,
            cookie_name: config.token_cookie_name.clone(),
            secure: config.cookie_secure(),
        }
    }

    /// Signs a token for `user` and also drops it into the token cookie.
    pub fn issue(&self, cookies: &CookieJar<'_>, user: &User) -> AuthResult<SignedToken> {
        let signed = self.jwt.issue(user)?;

        let cookie = Cookie::build((self.cookie_name.clone(), signed.token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(TimeDuration::seconds(self.jwt.ttl().num_seconds()))
            .build();
        cookies.add(cookie);

        log::info!("issued token for user {}", user.id);
        Ok(signed)
    }

    pub fn verify(&self, token: &str) -> AuthResult<TokenClaims> {
        self.jwt.verify(token)
    }

    pub fn logout(&self, cookies: &CookieJar<'_>) {
        let cookie = Cookie::build((self.cookie_name.clone(), String::new()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .removal()
            .build();
        cookies.add(cookie);
    }

    /// Bearer header first, then the cookie.
    fn carrier(&self, request: &Request<'_>) -> Option<String> {
        if let Some(token) = request
            .headers()
            .get_one("Authorization")
            .and_then(bearer_token)
        {
            return Some(token.to_string());
        }

        request
            .cookies()
            .get(&self.cookie_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[rocket::async_trait]
impl AuthStrategy for TokenStrategy {
    type Principal = TokenClaims;

    fn select(state: &AuthState) -> &Self {
        &state.tokens
    }

    async fn authorize(&self, request: &Request<'_>) -> AuthResult<TokenClaims> {
        let token = self.carrier(request).ok_or(AuthError::Unauthorized)?;
        self.verify(&token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_headers() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
