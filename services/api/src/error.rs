//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered as a JSON envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pdf_chat_core::{ports::PortError, workflow::WorkflowError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::access::AccessError;
use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error reported by the document workflow.
    #[error("{0}")]
    Workflow(#[from] WorkflowError),

    /// Represents a credential that could not be issued or verified.
    #[error("{0}")]
    Access(#[from] AccessError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The body of every failed response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    /// Status code, client-facing message and optional upstream diagnostic.
    fn parts(&self) -> (StatusCode, String, Option<String>) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone(), None),

            ApiError::Access(e) => match e {
                AccessError::MissingSecret | AccessError::Signing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string(), None)
                }
                AccessError::MissingToken | AccessError::Expired | AccessError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, e.to_string(), None)
                }
            },

            ApiError::Workflow(e) => match e {
                WorkflowError::Validation(_)
                | WorkflowError::InvalidFileType(_)
                | WorkflowError::EmptyDocumentText => {
                    (StatusCode::BAD_REQUEST, e.to_string(), None)
                }
                WorkflowError::FileTooLarge { .. } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "File is too large. Maximum size is 10MB.".to_string(),
                    None,
                ),
                WorkflowError::DocumentNotFound | WorkflowError::ExchangeNotFound => {
                    (StatusCode::NOT_FOUND, e.to_string(), None)
                }
                WorkflowError::StorageUploadFailed(detail) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to upload PDF".to_string(),
                    Some(detail.clone()),
                ),
                WorkflowError::Completion(detail) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process request with AI".to_string(),
                    Some(detail.clone()),
                ),
                WorkflowError::Persistence(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string(), None)
                }
            },

            ApiError::Port(PortError::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone(), None),
            ApiError::Port(PortError::Conflict(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone(), None)
            }

            ApiError::Port(PortError::Unexpected(_))
            | ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string(), None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = self.parts();
        if status.is_server_error() {
            error!("Request failed: {self:?}");
        }
        let body = ErrorBody {
            success: false,
            message,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn workflow_errors_map_to_conventional_status_codes() {
        let cases = [
            (WorkflowError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::InvalidFileType("text/plain".into()), StatusCode::BAD_REQUEST),
            (WorkflowError::FileTooLarge { size: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (WorkflowError::DocumentNotFound, StatusCode::NOT_FOUND),
            (WorkflowError::ExchangeNotFound, StatusCode::NOT_FOUND),
            (WorkflowError::EmptyDocumentText, StatusCode::BAD_REQUEST),
            (WorkflowError::Completion("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(status_of(err.into()), expected, "{label}");
        }
    }

    #[test]
    fn access_errors_are_unauthenticated_except_configuration() {
        assert_eq!(status_of(AccessError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AccessError::InvalidToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AccessError::Expired.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AccessError::MissingSecret.into()), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_diagnostic_is_passed_through_but_persistence_detail_is_not() {
        let (_, message, detail) =
            ApiError::from(WorkflowError::Completion("quota".into())).parts();
        assert_eq!(message, "Failed to process request with AI");
        assert_eq!(detail.as_deref(), Some("quota"));

        let (_, message, detail) =
            ApiError::from(WorkflowError::Persistence("connection reset".into())).parts();
        assert_eq!(message, INTERNAL_MESSAGE);
        assert!(detail.is_none());
    }
}
