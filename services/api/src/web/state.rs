//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use crate::access::CredentialKeys;
use pdf_chat_core::{ports::DatabaseService, workflow::DocumentWorkflow};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Account reads and writes bypass the workflow.
    pub db: Arc<dyn DatabaseService>,
    pub workflow: DocumentWorkflow,
    pub credentials: CredentialKeys,
}
