use rocket::http::Status;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("User already exists with this email")]
    Conflict,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Please log in to access this resource")]
    Unauthorized,
    #[error("User not found")]
    NotFound,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token invalid")]
    TokenInvalid,
    #[error("store operation timed out after {0} ms")]
    StoreTimeout(u64),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("jwt error: {0}")]
    Jwt(jsonwebtoken::errors::Error),
    #[error("argon2 parameter error: {0}")]
    Argon2(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl AuthError {
    pub fn status(&self) -> Status {
        match self {
            AuthError::Validation(_) => Status::BadRequest,
            AuthError::Conflict => Status::Conflict,
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => Status::Unauthorized,
            AuthError::NotFound => Status::NotFound,
            AuthError::StoreTimeout(_) => Status::ServiceUnavailable,
            AuthError::Config(_)
            | AuthError::Sqlx(_)
            | AuthError::Jwt(_)
            | AuthError::Argon2(_)
            | AuthError::PasswordHash(_)
            | AuthError::Join(_)
            | AuthError::Other(_) => Status::InternalServerError,
        }
    }

    /// True for kinds whose message is safe to show to a client.
    pub fn is_client_facing(&self) -> bool {
        self.status().code < 500 || matches!(self, AuthError::StoreTimeout(_))
    }
}

impl From<argon2::Error> for AuthError {
    fn from(err: argon2::Error) -> Self {
        AuthError::Argon2(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        AuthError::PasswordHash(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::ImmatureSignature
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => AuthError::TokenInvalid,
            _ => AuthError::Jwt(err),
        }
    }
}

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err
                .code()
                .map(|code| code == UNIQUE_VIOLATION)
                .unwrap_or(false)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_kinds_to_statuses() {
        assert_eq!(AuthError::Validation(vec![]).status(), Status::BadRequest);
        assert_eq!(AuthError::Conflict.status(), Status::Conflict);
        assert_eq!(AuthError::InvalidCredentials.status(), Status::Unauthorized);
        assert_eq!(AuthError::TokenExpired.status(), Status::Unauthorized);
        assert_eq!(AuthError::NotFound.status(), Status::NotFound);
        assert_eq!(AuthError::StoreTimeout(5).status(), Status::ServiceUnavailable);
        assert_eq!(
            AuthError::Other("boom".into()).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn internal_errors_are_not_client_facing() {
        assert!(AuthError::Conflict.is_client_facing());
        assert!(AuthError::StoreTimeout(10).is_client_facing());
        assert!(!AuthError::Config("missing".into()).is_client_facing());
    }
}
