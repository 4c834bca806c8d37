//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Every error body has the shape `{ "error": message, "status": code }`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gather_core::{AttendanceError, StoreError};
use validator::ValidationErrors;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The endpoint requires an authenticated caller.
    #[error("authentication required")]
    Unauthorized,

    /// The request conflicts with existing state, e.g. joining twice.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The JSON request body was malformed or missing required fields.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Submitted input failed validation.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationErrors),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Duplicate => Self::Conflict(String::from("duplicate record")),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl From<AttendanceError> for ApiError {
    fn from(err: AttendanceError) -> Self {
        match err {
            AttendanceError::Unauthorized => Self::Unauthorized,
            AttendanceError::Conflict { event_id, user_id } => Self::Conflict(format!(
                "user {user_id} is already attending event {event_id}"
            )),
            AttendanceError::Store(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, format!("not found: {msg}")),
            Self::InvalidUuid(msg) | Self::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Validation(errors) => (StatusCode::BAD_REQUEST, errors.to_string()),
            Self::Store(msg) => {
                tracing::error!(error = %msg, "Store failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, String::from("internal error"))
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
