//! Token-strategy endpoints. The token travels in the response body and in
//! the token cookie; protected routes also accept `Authorization: Bearer`.

use rocket::State;
use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use serde_json::Value;

use crate::auth::responses::{AuthResponse, MessageResponse, TokenProfileResponse};
use crate::auth::validation::{parse_login, parse_registration};
use crate::auth::{AuthState, TokenUser};
use crate::error::ApiError;

/// Register and receive a token.
#[openapi(tag = "Token Auth")]
#[post("/auth/register-jwt", data = "<payload>")]
pub async fn register_jwt(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let new_user = parse_registration(&payload)?;
    let user = state.service.register_user(new_user).await?;
    let signed = state.tokens.issue(cookies, &user)?;

    Ok(Json(AuthResponse {
        message: "Registration successful".to_string(),
        user,
        token: Some(signed.token),
    }))
}

/// Log in and receive a token.
#[openapi(tag = "Token Auth")]
#[post("/auth/login-jwt", data = "<payload>")]
pub async fn login_jwt(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
    payload: Json<Value>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = parse_login(&payload)?;
    let user = state
        .service
        .validate_credentials(&credentials.email, &credentials.password)
        .await?;
    let signed = state.tokens.issue(cookies, &user)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user,
        token: Some(signed.token),
    }))
}

/// Claims carried by the caller's token, as issued.
#[openapi(tag = "Token Auth")]
#[get("/auth/profile-jwt")]
pub async fn profile_jwt(principal: TokenUser) -> Json<TokenProfileResponse> {
    let TokenUser(claims) = principal;
    Json(TokenProfileResponse { user: claims })
}

/// Drop the token cookie. The token itself stays valid until it expires.
#[openapi(tag = "Token Auth")]
#[post("/auth/logout-jwt")]
pub async fn logout_jwt(
    state: &State<AuthState>,
    cookies: &CookieJar<'_>,
) -> Json<MessageResponse> {
    state.tokens.logout(cookies);
    Json(MessageResponse::new("Logout successful"))
}
