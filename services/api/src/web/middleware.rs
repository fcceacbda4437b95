//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use pdf_chat_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::access::{token_from_header, AccessError};
use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that verifies the bearer credential and resolves its account.
///
/// On success the `Account` is inserted into request extensions for handlers to use.
/// A missing, malformed or expired credential is rejected with 401; a credential
/// for an account that no longer exists with 404.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the Authorization header
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AccessError::MissingToken)?;

    // 2. Verify the credential, get the account id
    let account_id = state
        .credentials
        .verify(token_from_header(header_value))
        .map_err(|e| {
            warn!("Rejected credential: {}", e);
            e
        })?;

    // 3. Resolve the account
    let account = state
        .db
        .get_account_by_id(account_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;

    // 4. Insert the account into request extensions
    req.extensions_mut().insert(account);

    // 5. Continue to the handler
    Ok(next.run(req).await)
}
