//! Maps [`Error`] onto HTTP responses.
//!
//! User-caused errors carry their message to the client. Forbidden and not-found answers are
//! generic so they do not reveal which records exist. Everything else is logged and reported as
//! a plain 500.

use crate::errors::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by every handler.
#[derive(Debug)]
pub struct AppError(pub Error);

/// Handler result.
pub type ApiResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl AppError {
    /// Status code and client-facing message for the wrapped error.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            Error::Validation { .. }
            | Error::InvalidAmount { .. }
            | Error::CartConflict { .. }
            | Error::EmptyCart
            | Error::InvalidStatus { .. }
            | Error::FeedbackNotAllowed { .. }
            | Error::AlreadySubmitted { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            Error::InvalidCredentials | Error::InvalidToken => {
                (StatusCode::UNAUTHORIZED, self.0.to_string())
            }
            Error::Forbidden { .. } => (StatusCode::FORBIDDEN, "Access denied.".to_string()),
            e if e.is_not_found() => (StatusCode::NOT_FOUND, "Not found.".to_string()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred.".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "Request failed");
        } else if status == StatusCode::FORBIDDEN {
            warn!(error = %self.0, "Request forbidden");
        }
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for Error {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::validation(format!("Invalid upload: {}", err.body_text()))
    }
}
