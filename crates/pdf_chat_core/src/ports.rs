//! crates/pdf_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Account, AccountCredentials, AccountUpdate, Document, Exchange, NewAccount, NewDocument,
    NewExchange, StoredObject,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A unique key (username, email, ...) is already taken.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// The message carried by the error, without the variant prefix.
    pub fn detail(&self) -> &str {
        match self {
            PortError::NotFound(msg) | PortError::Conflict(msg) | PortError::Unexpected(msg) => msg,
        }
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Accounts ---
    async fn create_account(&self, account: NewAccount) -> PortResult<Account>;

    async fn get_account_by_id(&self, account_id: Uuid) -> PortResult<Account>;

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials>;

    async fn get_credentials_by_id(&self, account_id: Uuid) -> PortResult<AccountCredentials>;

    /// True when another account (not `excluding`) already uses the username.
    async fn username_taken(&self, username: &str, excluding: Option<Uuid>) -> PortResult<bool>;

    /// True when another account (not `excluding`) already uses the email.
    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> PortResult<bool>;

    async fn update_account(&self, update: AccountUpdate) -> PortResult<Account>;

    // --- Documents ---
    async fn create_document(&self, document: NewDocument) -> PortResult<Document>;

    /// Fetches a document without its text content.
    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document>;

    /// Fetches a document only if `owner_id` owns it. Text content is loaded
    /// when `with_text` is set.
    async fn get_owned_document(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        with_text: bool,
    ) -> PortResult<Document>;

    /// All documents of an account, newest upload first, without text content.
    async fn list_documents_for_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>>;

    async fn count_documents_for_owner(&self, owner_id: Uuid) -> PortResult<u64>;

    async fn update_document_summary(&self, document_id: Uuid, summary: &str) -> PortResult<()>;

    /// Deletes the document and every exchange recorded against it.
    /// Returns the number of exchanges removed.
    async fn delete_document(&self, document_id: Uuid) -> PortResult<u64>;

    // --- Exchanges ---
    /// Persists the exchange and appends its id to the owning document's list.
    async fn create_exchange(&self, exchange: NewExchange) -> PortResult<Exchange>;

    async fn get_exchange_by_id(&self, exchange_id: Uuid) -> PortResult<Exchange>;

    /// Up to `limit` exchanges of a document, most recent first.
    async fn recent_exchanges(&self, document_id: Uuid, limit: usize) -> PortResult<Vec<Exchange>>;

    /// Every exchange of a document, oldest first.
    async fn list_exchanges(&self, document_id: Uuid) -> PortResult<Vec<Exchange>>;

    /// Deletes the exchange and removes its id from the document's list.
    async fn delete_exchange(&self, exchange_id: Uuid, document_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Stores the raw bytes of a PDF and returns its public location.
    async fn upload_pdf(&self, file_name: &str, bytes: &[u8]) -> PortResult<StoredObject>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a single prompt to the model and returns the generated text.
    async fn complete(&self, prompt: &str) -> PortResult<String>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Extracts the plain text of a PDF.
    async fn extract_text(&self, pdf_bytes: &[u8]) -> PortResult<String>;
}
