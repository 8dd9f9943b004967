//! Authorization gate: request guards that establish who the caller is.
//!
//! Each protected route names exactly one guard, and each guard delegates to
//! one [`AuthStrategy`]. A failing guard stops the request before the handler
//! runs; the JSON catchers render the rejection.

use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};
use rocket_okapi::request::OpenApiFromRequest;

use crate::auth::jwt::TokenClaims;
use crate::auth::session::{SessionPrincipal, SessionStrategy};
use crate::auth::token::TokenStrategy;
use crate::auth::{AuthError, AuthResult, AuthState};

/// A way of turning a request's credential carrier into a principal.
#[rocket::async_trait]
pub trait AuthStrategy: Send + Sync + 'static {
    type Principal: Send + 'static;

    /// Picks this strategy out of the managed [`AuthState`].
    fn select(state: &AuthState) -> &Self;

    async fn authorize(&self, request: &Request<'_>) -> AuthResult<Self::Principal>;
}

/// Client-safe reason recorded by a failing guard for the 401 catcher.
#[derive(Debug, Clone, Default)]
pub(crate) struct GateRejection(pub Option<String>);

async fn gate<S: AuthStrategy>(request: &Request<'_>) -> Outcome<S::Principal, AuthError> {
    let state = match request.guard::<&State<AuthState>>().await {
        Outcome::Success(state) => state,
        _ => {
            let err = AuthError::Config("AuthState missing from state".into());
            log::error!("{}", err);
            return Outcome::Error((err.status(), err));
        }
    };

    match S::select(state).authorize(request).await {
        Ok(principal) => Outcome::Success(principal),
        Err(err) => {
            let status = err.status();
            if status == Status::Unauthorized {
                log::debug!("rejected {} {}: {}", request.method(), request.uri().path(), err);
                request.local_cache(|| GateRejection(Some(err.to_string())));
            } else {
                log::error!("authorization failed on {}: {}", request.uri().path(), err);
            }
            Outcome::Error((status, err))
        }
    }
}

/// Caller authenticated through a server-side session.
#[derive(Debug, OpenApiFromRequest)]
pub struct SessionUser(pub SessionPrincipal);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        gate::<SessionStrategy>(request).await.map(SessionUser)
    }
}

/// Caller authenticated through a signed token; carries the token's claims.
#[derive(Debug, OpenApiFromRequest)]
pub struct TokenUser(pub TokenClaims);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for TokenUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        gate::<TokenStrategy>(request).await.map(TokenUser)
    }
}
