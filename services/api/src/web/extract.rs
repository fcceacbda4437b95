//! services/api/src/web/extract.rs
//!
//! Request extractors whose rejections use the JSON error envelope.

use axum::extract::{multipart::MultipartError, rejection::JsonRejection, FromRequest};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::error::ApiError;

/// `axum::Json`, but malformed or oversized bodies become `ApiError`s.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Request body is too large".to_string())
        } else {
            ApiError::Validation(rejection.body_text())
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File is too large. Maximum size is 10MB.".to_string())
        } else {
            ApiError::Validation(e.body_text())
        }
    }
}

/// Parses an id taken from the path or a form field.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Validation(format!("Invalid {what} ID")))
}
