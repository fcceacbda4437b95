//! crates/pdf_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// Represents a registered user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login and password changes - contains sensitive data
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub account: Account,
    pub password_hash: String,
}

/// The fields written when a new account registers.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A full replacement of the mutable account fields.
#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Represents an uploaded PDF: its metadata plus the extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub url: String,
    /// `None` unless the text was explicitly requested from the store.
    pub text_content: Option<String>,
    pub summary: String,
    /// Exchange ids in the order they were recorded.
    pub exchange_ids: Vec<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// The loaded text, if it holds anything other than whitespace.
    pub fn usable_text(&self) -> Option<&str> {
        self.text_content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    pub fn exchange_count(&self) -> usize {
        self.exchange_ids.len()
    }
}

/// The fields written when a document is stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub url: String,
    pub text_content: String,
}

/// A single question-and-answer turn against a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub id: Uuid,
    pub document_id: Uuid,
    pub account_id: Uuid,
    pub question: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewExchange {
    pub document_id: Uuid,
    pub account_id: Uuid,
    pub question: String,
    pub response: String,
}

/// A single document together with its conversation.
#[derive(Debug, Clone)]
pub struct DocumentDetail {
    pub document: Document,
    pub exchanges: Vec<Exchange>,
}

/// Where the object store put an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

/// A file as received from the client, before any validation.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub owner_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub title: Option<String>,
    pub text_content: Option<String>,
}
