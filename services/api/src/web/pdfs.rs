//! services/api/src/web/pdfs.rs
//!
//! Contains the Axum handlers for document upload, listing, reading, deletion
//! and the AI operations on a single document.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use bytes::Bytes;
use pdf_chat_core::domain::{Account, PdfUpload};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{parse_id, ApiJson};
use crate::web::models::{
    DataResponse, DocumentDetailResponse, DocumentListItem, DocumentResponse, ExchangeResponse,
    FlowResponse, ListResponse, MessageResponse, SummaryResponse,
};
use crate::web::state::AppState;

//=========================================================================================
// API Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
}

/// The file part of an upload form.
struct FilePart {
    file_name: String,
    content_type: String,
    bytes: Bytes,
}

/// A form-supplied `userId` must name the caller. Any other account is
/// answered as if it did not exist.
pub(crate) fn ensure_same_account(raw: &str, caller: &Account) -> Result<(), ApiError> {
    let claimed = parse_id(raw, "user")?;
    if claimed != caller.id {
        warn!(caller_id = %caller.id, claimed_id = %claimed, "Request names another account");
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(())
}

//=========================================================================================
// Upload
//=========================================================================================

/// Upload a PDF.
///
/// Accepts a multipart/form-data request with a `pdf` file part and optional
/// `title`, `textContent` and `userId` text parts.
#[utoipa::path(
    post,
    path = "/api/pdfs/upload",
    request_body(
        content_type = "multipart/form-data",
        description = "The PDF and its optional title and text."
    ),
    params(("Authorization" = String, Header, description = "Credential issued at login")),
    responses(
        (status = 201, description = "Document stored", body = DataResponse<DocumentResponse>),
        (status = 400, description = "No file, or not a PDF", body = ErrorBody),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 413, description = "File larger than 10MB", body = ErrorBody),
        (status = 500, description = "Object store or database failure", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn upload_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::Validation(e.body_text()))?;

    let mut file: Option<FilePart> = None;
    let mut title: Option<String> = None;
    let mut text_content: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("pdf") => {
                let file_name = field.file_name().unwrap_or("document.pdf").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("title") => title = Some(field.text().await?),
            Some("textContent") => text_content = Some(field.text().await?),
            Some("userId") => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    ensure_same_account(&raw, &account)?;
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;
    info!(
        account_id = %account.id,
        file_name = %file.file_name,
        size = file.bytes.len(),
        "Received upload"
    );

    let document = state
        .workflow
        .upload(PdfUpload {
            owner_id: account.id,
            file_name: file.file_name,
            content_type: file.content_type,
            bytes: file.bytes,
            title,
            text_content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(DocumentResponse::from(document))),
    ))
}

//=========================================================================================
// Listing and Reading
//=========================================================================================

/// The caller's documents, newest first.
#[utoipa::path(
    get,
    path = "/api/pdfs",
    params(("Authorization" = String, Header, description = "Credential issued at login")),
    responses(
        (
            status = 200,
            description = "Documents of the caller",
            body = ListResponse<DocumentListItem>
        ),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn list_pdfs_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.workflow.list_documents(account.id).await?;
    let items: Vec<DocumentListItem> = documents.into_iter().map(Into::into).collect();
    Ok(Json(ListResponse::new(items)))
}

/// The documents of an account, which must be the caller's own.
#[utoipa::path(
    get,
    path = "/api/pdfs/{id}/pdfs",
    params(
        ("id" = uuid::Uuid, Path, description = "Account id; must be the caller"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (
            status = 200,
            description = "Documents of the account",
            body = ListResponse<DocumentListItem>
        ),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn list_user_pdfs_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_same_account(&user_id, &account)?;
    let documents = state.workflow.list_documents(account.id).await?;
    let items: Vec<DocumentListItem> = documents.into_iter().map(Into::into).collect();
    Ok(Json(ListResponse::new(items)))
}

/// One document of the caller with its conversation.
#[utoipa::path(
    get,
    path = "/api/pdfs/{id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (status = 200, description = "The document", body = DataResponse<DocumentDetailResponse>),
        (status = 404, description = "PDF not found", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn get_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&id, "PDF")?;
    let detail = state.workflow.get_document(document_id, account.id).await?;
    Ok(Json(DataResponse::new(DocumentDetailResponse::from(detail))))
}

/// Deletes a document and every exchange recorded against it.
#[utoipa::path(
    delete,
    path = "/api/pdfs/{id}",
    params(
        ("id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 404, description = "PDF not found", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn delete_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&id, "PDF")?;
    state.workflow.delete_document(document_id, account.id).await?;
    Ok(Json(MessageResponse::new(
        "PDF and associated chats deleted successfully",
    )))
}

//=========================================================================================
// AI Operations
//=========================================================================================

/// Ask a question about a document.
#[utoipa::path(
    post,
    path = "/api/pdfs/{id}/ask",
    params(
        ("id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    request_body = QuestionRequest,
    responses(
        (
            status = 200,
            description = "The recorded exchange",
            body = DataResponse<ExchangeResponse>
        ),
        (status = 400, description = "Blank question or document without text", body = ErrorBody),
        (status = 404, description = "PDF not found", body = ErrorBody),
        (status = 500, description = "Completion service failure", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn ask_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&id, "PDF")?;
    let exchange = state
        .workflow
        .ask_question(document_id, account.id, &req.question)
        .await?;
    Ok(Json(DataResponse::new(ExchangeResponse::from(exchange))))
}

/// Generate and store a summary of a document.
#[utoipa::path(
    post,
    path = "/api/pdfs/{id}/summarize",
    params(
        ("id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (status = 200, description = "The new summary", body = DataResponse<SummaryResponse>),
        (status = 400, description = "Document without text", body = ErrorBody),
        (status = 404, description = "PDF not found", body = ErrorBody),
        (status = 500, description = "Completion service failure", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn summarize_pdf_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&id, "PDF")?;
    let summary = state.workflow.summarize(document_id, account.id).await?;
    Ok(Json(DataResponse::new(SummaryResponse { summary })))
}

/// Generate an outline of a document's concepts.
#[utoipa::path(
    get,
    path = "/api/pdfs/{id}/flow",
    params(
        ("id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (status = 200, description = "The generated outline", body = DataResponse<FlowResponse>),
        (status = 400, description = "Document without text", body = ErrorBody),
        (status = 404, description = "PDF not found", body = ErrorBody),
        (status = 500, description = "Completion service failure", body = ErrorBody)
    ),
    tag = "PDFs"
)]
pub async fn pdf_flow_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&id, "PDF")?;
    let flow = state.workflow.generate_flow(document_id, account.id).await?;
    Ok(Json(DataResponse::new(FlowResponse { flow })))
}
