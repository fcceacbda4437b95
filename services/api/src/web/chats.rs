//! services/api/src/web/chats.rs
//!
//! Handlers for a document's conversation: asking, listing and deleting exchanges.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use pdf_chat_core::domain::Account;
use std::sync::Arc;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::{parse_id, ApiJson};
use crate::web::models::{
    DataResponse, ExchangeHistoryItem, ExchangeResponse, ListResponse, MessageResponse,
};
use crate::web::pdfs::QuestionRequest;
use crate::web::state::AppState;

/// Ask a question about a document; same operation as `/api/pdfs/{id}/ask`.
#[utoipa::path(
    post,
    path = "/api/chats/{pdf_id}/question",
    params(
        ("pdf_id" = uuid::Uuid, Path, description = "Document id"),
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
    tag = "Chats"
)]
pub async fn ask_question_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(pdf_id): Path<String>,
    ApiJson(req): ApiJson<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&pdf_id, "PDF")?;
    let exchange = state
        .workflow
        .ask_question(document_id, account.id, &req.question)
        .await?;
    Ok(Json(DataResponse::new(ExchangeResponse::from(exchange))))
}

/// The conversation of a document, oldest first.
#[utoipa::path(
    get,
    path = "/api/chats/{pdf_id}/chats",
    params(
        ("pdf_id" = uuid::Uuid, Path, description = "Document id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (
            status = 200,
            description = "Exchanges of the document",
            body = ListResponse<ExchangeHistoryItem>
        ),
        (status = 404, description = "PDF not found", body = ErrorBody)
    ),
    tag = "Chats"
)]
pub async fn list_chats_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(pdf_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document_id = parse_id(&pdf_id, "PDF")?;
    let exchanges = state.workflow.list_exchanges(document_id, account.id).await?;
    let items: Vec<ExchangeHistoryItem> = exchanges.into_iter().map(Into::into).collect();
    Ok(Json(ListResponse::new(items)))
}

/// Delete one exchange of a document the caller owns.
#[utoipa::path(
    delete,
    path = "/api/chats/chats/{chat_id}",
    params(
        ("chat_id" = uuid::Uuid, Path, description = "Exchange id"),
        ("Authorization" = String, Header, description = "Credential issued at login")
    ),
    responses(
        (status = 200, description = "Exchange deleted", body = MessageResponse),
        (status = 404, description = "Chat not found", body = ErrorBody)
    ),
    tag = "Chats"
)]
pub async fn delete_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exchange_id = parse_id(&chat_id, "chat")?;
    state.workflow.delete_exchange(exchange_id, account.id).await?;
    Ok(Json(MessageResponse::new("Chat deleted successfully")))
}
