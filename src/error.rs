//! Terminal error translation for the HTTP boundary.
//!
//! Route handlers return [`ApiError`]; guards and Rocket itself fall through
//! to the JSON catchers. Known kinds keep their message, anything 5xx is
//! logged and answered with a generic body.

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Catcher, Request, Response};
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::okapi::schemars::JsonSchema;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::auth::AuthError;
use crate::auth::guards::GateRejection;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: Some(message.into()),
            details: None,
        }
    }
}

#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl ApiError {
    pub fn status(&self) -> Status {
        self.0.status()
    }

    /// Status and client-facing body for this error.
    pub fn to_body(&self) -> (Status, ErrorBody) {
        let status = self.status();
        let body = match &self.0 {
            AuthError::Validation(details) => ErrorBody {
                error: "Validation failed".to_string(),
                message: None,
                details: Some(details.clone()),
            },
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => ErrorBody::new("Unauthorized", self.0.to_string()),
            AuthError::Conflict => ErrorBody::new("Conflict", self.0.to_string()),
            AuthError::NotFound => ErrorBody::new("NotFound", self.0.to_string()),
            AuthError::StoreTimeout(_) => {
                ErrorBody::new("ServiceUnavailable", "Storage did not respond in time")
            }
            _ => ErrorBody::new("InternalServerError", INTERNAL_MESSAGE),
        };
        (status, body)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        if self.0.is_client_facing() {
            log::debug!("request failed: {}", self.0);
        } else {
            log::error!("internal error: {}", self.0);
        }

        let (status, body) = self.to_body();
        let json = serde_json::to_string(&body).unwrap_or_else(|_| {
            r#"{"error":"InternalServerError","message":"Internal server error"}"#.to_string()
        });

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(generator: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        let schema = generator.json_schema::<ErrorBody>();
        for status in [400, 401, 404, 409, 500, 503] {
            rocket_okapi::util::add_schema_response(
                &mut responses,
                status,
                "application/json",
                schema.clone(),
            )?;
        }
        Ok(responses)
    }
}

#[catch(400)]
fn bad_request() -> Json<ErrorBody> {
    Json(ErrorBody {
        error: "Validation failed".to_string(),
        message: None,
        details: Some(vec!["Request body must be a JSON object".to_string()]),
    })
}

#[catch(401)]
fn unauthorized(request: &Request<'_>) -> Json<ErrorBody> {
    let rejection = request.local_cache(GateRejection::default);
    let message = rejection
        .0
        .clone()
        .unwrap_or_else(|| AuthError::Unauthorized.to_string());
    Json(ErrorBody::new("Unauthorized", message))
}

#[catch(404)]
fn not_found() -> Json<ErrorBody> {
    Json(ErrorBody::new("NotFound", "Route not found"))
}

#[catch(422)]
fn unprocessable() -> Json<ErrorBody> {
    bad_request()
}

#[catch(500)]
fn internal_error() -> Json<ErrorBody> {
    Json(ErrorBody::new("InternalServerError", INTERNAL_MESSAGE))
}

#[catch(503)]
fn unavailable() -> Json<ErrorBody> {
    Json(ErrorBody::new(
        "ServiceUnavailable",
        "Storage did not respond in time",
    ))
}

/// JSON catchers registered at the root.
pub fn catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        not_found,
        unprocessable,
        internal_error,
        unavailable
    ]
}
