//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use campus_core::ports::PortError;
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// The primary error type for the `campus-api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request input caught at the HTTP boundary.
    #[error("{0}")]
    Validation(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The structured payload every failed request receives.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorDetail {
    /// One of `validation`, `not_found`, `unauthorized`, `forbidden`, `conflict`, `internal`.
    pub kind: String,
    pub message: String,
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) | ApiError::Port(PortError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation")
            }
            ApiError::Port(PortError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Port(PortError::Unauthorized) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Port(PortError::Forbidden(_)) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::Port(PortError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let message = match &self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Port(PortError::Unauthorized) => "Authentication required".to_string(),
            ApiError::Port(port) if status != StatusCode::INTERNAL_SERVER_ERROR => port.to_string(),
            other => {
                // Internal detail stays in the logs.
                error!("Request failed: {}", other);
                "Server error".to_string()
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                kind: kind.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_http_statuses() {
        let cases = [
            (ApiError::Port(PortError::Validation("bad".into())), StatusCode::BAD_REQUEST),
            (ApiError::Port(PortError::NotFound("gone".into())), StatusCode::NOT_FOUND),
            (ApiError::Port(PortError::Unauthorized), StatusCode::UNAUTHORIZED),
            (ApiError::Port(PortError::Forbidden("no".into())), StatusCode::FORBIDDEN),
            (ApiError::Port(PortError::Conflict("dup".into())), StatusCode::CONFLICT),
            (ApiError::Port(PortError::Unexpected("boom".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
