//! Custom error types for the tracker service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::{CoordinateError, DatabaseError, DecodeError, EncodeError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the tracker service
#[derive(Error, Debug)]
pub enum TrackerError {
    /// The addressed user, or the requested route, does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Registration for a username that is already taken
    #[error("User already exists: {0}")]
    AlreadyExists(String),

    /// Supplied secret does not match the stored one
    #[error("Invalid credentials")]
    InvalidCredential,

    /// A coordinate or other request field could not be parsed
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// An encoded path could not be decoded
    #[error("Invalid encoded path: {0}")]
    Decode(#[from] DecodeError),

    /// The mapping service failed or answered with an error status
    #[error("Routing service error: {0}")]
    Routing(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Internal server error
    #[error("Internal server error")]
    Internal,
}

impl From<CoordinateError> for TrackerError {
    fn from(e: CoordinateError) -> Self {
        TrackerError::MalformedInput(e.to_string())
    }
}

impl From<EncodeError> for TrackerError {
    fn from(e: EncodeError) -> Self {
        TrackerError::MalformedInput(e.to_string())
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::AlreadyExists(_) => StatusCode::CONFLICT,
            TrackerError::InvalidCredential => StatusCode::UNAUTHORIZED,
            TrackerError::MalformedInput(_) | TrackerError::Decode(_) => StatusCode::BAD_REQUEST,
            TrackerError::Routing(_) => StatusCode::BAD_GATEWAY,
            TrackerError::Database(e) => {
                error!("Database failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TrackerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            TrackerError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for tracker results
pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (TrackerError::NotFound("user bob".into()), StatusCode::NOT_FOUND),
            (TrackerError::AlreadyExists("bob".into()), StatusCode::CONFLICT),
            (TrackerError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (
                TrackerError::MalformedInput("lat".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                TrackerError::Decode(DecodeError::Truncated { offset: 3 }),
                StatusCode::BAD_REQUEST,
            ),
            (TrackerError::Routing("down".into()), StatusCode::BAD_GATEWAY),
            (TrackerError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn coordinate_errors_are_malformed_input() {
        let err: TrackerError = CoordinateError::NotFinite { field: "lat" }.into();
        assert!(matches!(err, TrackerError::MalformedInput(_)));
        assert_eq!(err.to_string(), "Malformed input: lat must be finite");
    }

    #[test]
    fn encode_errors_are_malformed_input() {
        let err: TrackerError = EncodeError::OutOfRange { index: 2 }.into();
        assert!(matches!(err, TrackerError::MalformedInput(_)));
    }
}
