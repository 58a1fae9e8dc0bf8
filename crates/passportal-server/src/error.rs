//! HTTP error types for the Passportal server.
//!
//! Maps guard and delivery failures into HTTP responses. Every variant
//! produces a JSON body with a machine-readable `error` field and a
//! human-readable `message`; validation failures additionally carry a
//! per-field `errors` map so the client can surface every problem at once.
//!
//! Internal failure detail never reaches the client — the 500 body is a
//! fixed generic message, and the detail stays in the server logs.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use passportal_core::error::ValidationErrors;

use crate::captcha::CaptchaError;

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Too many requests from one client inside the rate window.
    RateLimited,
    /// Client sent invalid input.
    BadRequest(String),
    /// One or more submission fields failed validation.
    Validation(BTreeMap<&'static str, String>),
    /// Internal failure. The message is for the logs; clients get a
    /// generic body.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<&'static str, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message, errors) = match self {
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests. Please try again later.".to_owned(),
                None,
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "validation_failed",
                "Some fields need correcting.".to_owned(),
                Some(fields),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Failed to send message. Please try again later.".to_owned(),
                None,
            ),
        };

        let body = ErrorBody {
            error: error_type,
            message,
            errors,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err.fields)
    }
}

impl From<CaptchaError> for AppError {
    fn from(err: CaptchaError) -> Self {
        match err {
            CaptchaError::Rejected { .. } => {
                Self::BadRequest("Security verification failed".to_owned())
            }
            CaptchaError::Client(reason) | CaptchaError::Request(reason) => Self::Internal(reason),
        }
    }
}
