//! Session-strategy endpoints. The credential carrier is the session cookie.

use rocket::State;
use rocket::http::{CookieJar, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use serde_json::Value;

use crate::auth::responses::{AuthResponse, MessageResponse, SessionMeta, SessionProfileResponse};
use crate::auth::validation::{parse_login, parse_registration};
use crate::auth::{AuthState, SessionUser};
use crate::error::ApiError;

/// Register and bind the new user to the caller's session.
#[openapi(tag = "Session Auth")]
#[post("/auth/register-session", data = "<payload>")]
pub async fn register_session(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<Value>,
) -> Result<status::Custom<Json<AuthResponse>>, ApiError> {
    let new_user = parse_registration(&payload)?;
    let user = state.service.register_user(new_user).await?;
    state.sessions.register(cookies, &user).await?;

    Ok(status::Custom(
        Status::Created,
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            user,
            token: None,
        }),
    ))
}

/// Log in; always issues a fresh session id.
#[openapi(tag = "Session Auth")]
#[post("/auth/login-session", data = "<payload>")]
pub async fn login_session(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = parse_login(&payload)?;
    let user = state
        .service
        .validate_credentials(&credentials.email, &credentials.password)
        .await?;
    state.sessions.login(cookies, &user).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user,
        token: None,
    }))
}

/// Current user plus session metadata. The session id changes on every login.
#[openapi(tag = "Session Auth")]
#[get("/auth/profile-session")]
pub async fn profile_session(
    state: &State<AuthState>,
    principal: SessionUser,
) -> Result<Json<SessionProfileResponse>, ApiError> {
    let SessionUser(session) = principal;
    let user = state.service.get_user_by_id(session.user_id).await?;

    Ok(Json(SessionProfileResponse {
        user,
        session: SessionMeta {
            id: session.session_id,
            expires_at: session.expires_at,
        },
    }))
}

/// Destroy the session. Succeeds without a session, so repeating it is harmless.
#[openapi(tag = "Session Auth")]
#[post("/auth/logout-session")]
pub async fn logout_session(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.logout(cookies).await?;
    Ok(Json(MessageResponse::new("Logout successful")))
}
