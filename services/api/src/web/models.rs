//! services/api/src/web/models.rs
//!
//! JSON envelopes and the wire shapes of accounts, documents and exchanges.

use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{Account, Document, DocumentDetail, Exchange};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Envelopes
//=========================================================================================

/// `{ success: true, data }`
#[derive(Debug, Serialize, ToSchema)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `{ success: true, count, data: [...] }`
#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: data.len(),
            data,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
        }
    }
}

/// Returned by registration and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub pdf_count: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileUpdatedResponse {
    pub success: bool,
    pub message: String,
    pub data: UserResponse,
}

//=========================================================================================
// Documents
//=========================================================================================

/// A document as seen by its owner. The extracted text is never included.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub url: String,
    pub summary: String,
    /// Ids of the document's exchanges, oldest first.
    pub chats: Vec<Uuid>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            user_id: document.owner_id,
            title: document.title,
            original_filename: document.original_filename,
            url: document.url,
            summary: document.summary,
            chats: document.exchange_ids,
            uploaded_at: document.uploaded_at,
        }
    }
}

/// A document in an account listing, annotated with its exchange count.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListItem {
    #[serde(flatten)]
    pub document: DocumentResponse,
    pub chat_count: usize,
}

impl From<Document> for DocumentListItem {
    fn from(document: Document) -> Self {
        let chat_count = document.exchange_count();
        Self {
            document: document.into(),
            chat_count,
        }
    }
}

/// A single document with its conversation inlined.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub original_filename: String,
    pub url: String,
    pub summary: String,
    pub chats: Vec<ExchangeResponse>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DocumentDetail> for DocumentDetailResponse {
    fn from(detail: DocumentDetail) -> Self {
        let document = detail.document;
        Self {
            id: document.id,
            user_id: document.owner_id,
            title: document.title,
            original_filename: document.original_filename,
            url: document.url,
            summary: document.summary,
            chats: detail.exchanges.into_iter().map(Into::into).collect(),
            uploaded_at: document.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FlowResponse {
    pub flow: String,
}

//=========================================================================================
// Exchanges
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub id: Uuid,
    pub pdf_id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            id: exchange.id,
            pdf_id: exchange.document_id,
            user_id: exchange.account_id,
            question: exchange.question,
            response: exchange.response,
            created_at: exchange.created_at,
        }
    }
}

/// A conversation entry in a history listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeHistoryItem {
    pub id: Uuid,
    pub question: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl From<Exchange> for ExchangeHistoryItem {
    fn from(exchange: Exchange) -> Self {
        Self {
            id: exchange.id,
            question: exchange.question,
            response: exchange.response,
            created_at: exchange.created_at,
        }
    }
}
