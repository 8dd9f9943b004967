//! HTTP route handlers grouped by authentication strategy.
//!
//! Both modules expose typed Rocket handlers annotated with `#[openapi]` so
//! `rocket_okapi` can derive an OpenAPI document automatically.

use rocket::Route;
use rocket_okapi::openapi_get_routes;

pub mod session;
pub mod token;

/// Every auth route plus `/openapi.json`, ready to mount under `/api/v1`.
pub fn api_routes() -> Vec<Route> {
    openapi_get_routes![
        // Session strategy
        session::register_session,
        session::login_session,
        session::profile_session,
        session::logout_session,
        // Token strategy
        token::register_jwt,
        token::login_jwt,
        token::profile_jwt,
        token::logout_jwt,
    ]
}
