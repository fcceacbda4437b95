//! crates/pdf_chat_core/src/workflow.rs
//!
//! The document workflow: upload, question answering, summaries, concept flows,
//! conversation history and deletion. Every operation that touches a document
//! checks ownership first and reports a foreign document exactly like a missing
//! one, so callers can never learn whether someone else's document exists.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{Document, DocumentDetail, Exchange, NewDocument, NewExchange, PdfUpload};
use crate::ports::{
    CompletionService, DatabaseService, ObjectStorageService, PortError, TextExtractionService,
};
use crate::prompts;

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// How many prior exchanges are replayed to the model.
pub const HISTORY_WINDOW: usize = 2;
pub const MAX_TITLE_CHARS: usize = 200;
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

//=========================================================================================
// Workflow Error Type
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0}")]
    Validation(String),
    #[error("Only PDF files are allowed! Received: {0}")]
    InvalidFileType(String),
    #[error("File is too large. Maximum size is 10MB (received {size} bytes)")]
    FileTooLarge { size: usize },
    #[error("PDF not found")]
    DocumentNotFound,
    #[error("Chat not found")]
    ExchangeNotFound,
    #[error("PDF has no text content to analyze")]
    EmptyDocumentText,
    #[error("Failed to upload PDF to storage: {0}")]
    StorageUploadFailed(String),
    #[error("Completion service error: {0}")]
    Completion(String),
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl From<PortError> for WorkflowError {
    fn from(e: PortError) -> Self {
        WorkflowError::Persistence(e.to_string())
    }
}

/// Maps a store error to `missing`, keeping other failures as persistence errors.
fn not_found_as(missing: WorkflowError) -> impl FnOnce(PortError) -> WorkflowError {
    move |e| match e {
        PortError::NotFound(_) => missing,
        other => other.into(),
    }
}

//=========================================================================================
// The Workflow
//=========================================================================================

/// Orchestrates the document store, object store, text extractor and
/// completion service. Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct DocumentWorkflow {
    db: Arc<dyn DatabaseService>,
    storage: Arc<dyn ObjectStorageService>,
    completion: Arc<dyn CompletionService>,
    extractor: Arc<dyn TextExtractionService>,
}

impl DocumentWorkflow {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        storage: Arc<dyn ObjectStorageService>,
        completion: Arc<dyn CompletionService>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            db,
            storage,
            completion,
            extractor,
        }
    }

    /// Validates the file, pushes it to the object store and records the document.
    ///
    /// Nothing is written anywhere unless the file is a non-empty PDF within the
    /// size limit. When the client sent no text field at all, the text is
    /// extracted here; an extraction failure leaves the document with empty text.
    pub async fn upload(&self, upload: PdfUpload) -> WorkflowResult<Document> {
        if upload.bytes.is_empty() {
            return Err(WorkflowError::Validation("No file uploaded".to_string()));
        }
        if upload.content_type != PDF_CONTENT_TYPE {
            warn!(content_type = %upload.content_type, "Rejected upload with wrong file type");
            return Err(WorkflowError::InvalidFileType(upload.content_type));
        }
        if upload.bytes.len() > MAX_UPLOAD_BYTES {
            warn!(size = upload.bytes.len(), "Rejected oversized upload");
            return Err(WorkflowError::FileTooLarge {
                size: upload.bytes.len(),
            });
        }

        let title = match upload.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => upload.file_name.trim().to_string(),
        };
        if title.is_empty() {
            return Err(WorkflowError::Validation(
                "Document title is required".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(WorkflowError::Validation(format!(
                "Title cannot exceed {MAX_TITLE_CHARS} characters"
            )));
        }

        info!(
            owner_id = %upload.owner_id,
            file_name = %upload.file_name,
            "Uploading PDF to object storage"
        );
        let stored = self
            .storage
            .upload_pdf(&upload.file_name, &upload.bytes)
            .await
            .map_err(|e| {
                error!("Object storage upload failed: {e}");
                WorkflowError::StorageUploadFailed(e.detail().to_string())
            })?;

        // Text sent by the client is kept as is, even when blank.
        let text_content = match upload.text_content {
            Some(text) => text,
            None => match self.extractor.extract_text(&upload.bytes).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        file_name = %upload.file_name,
                        "Text extraction failed, storing without text: {e}"
                    );
                    String::new()
                }
            },
        };

        let document = self
            .db
            .create_document(NewDocument {
                owner_id: upload.owner_id,
                title,
                original_filename: upload.file_name,
                url: stored.url,
                text_content,
            })
            .await?;

        info!(document_id = %document.id, owner_id = %document.owner_id, "PDF document created");
        // The text went into the write; reads never hand it back by default.
        Ok(Document {
            text_content: None,
            ..document
        })
    }

    /// One document of the caller, with its conversation.
    pub async fn get_document(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
    ) -> WorkflowResult<DocumentDetail> {
        let document = self.owned_document(document_id, owner_id, false).await?;
        let exchanges = self.db.list_exchanges(document.id).await?;
        Ok(DocumentDetail {
            document,
            exchanges,
        })
    }

    /// Every document of the account, newest upload first.
    pub async fn list_documents(&self, owner_id: Uuid) -> WorkflowResult<Vec<Document>> {
        let documents = self.db.list_documents_for_owner(owner_id).await?;
        info!(owner_id = %owner_id, count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// Answers a question about the document, replaying the most recent
    /// exchanges as conversation context, and records the new exchange.
    pub async fn ask_question(
        &self,
        document_id: Uuid,
        asker_id: Uuid,
        question: &str,
    ) -> WorkflowResult<Exchange> {
        if question.trim().is_empty() {
            return Err(WorkflowError::Validation("Question is required".to_string()));
        }

        let document = self.owned_document(document_id, asker_id, true).await?;
        let text = usable_text(&document)?;

        let mut history = self.db.recent_exchanges(document.id, HISTORY_WINDOW).await?;
        history.reverse();
        info!(document_id = %document.id, history = history.len(), "Asking question");

        let prompt = prompts::question_prompt(text, &prompts::render_history(&history), question);
        let response = self.run_completion(&prompt).await?;

        let exchange = self
            .db
            .create_exchange(NewExchange {
                document_id: document.id,
                account_id: asker_id,
                question: question.to_string(),
                response,
            })
            .await?;
        info!(exchange_id = %exchange.id, document_id = %document.id, "Exchange recorded");
        Ok(exchange)
    }

    /// Generates a summary and stores it in place of any earlier one.
    pub async fn summarize(&self, document_id: Uuid, owner_id: Uuid) -> WorkflowResult<String> {
        let document = self.owned_document(document_id, owner_id, true).await?;
        let text = usable_text(&document)?;

        let summary = self.run_completion(&prompts::summary_prompt(text)).await?;
        self.db
            .update_document_summary(document.id, &summary)
            .await?;
        info!(document_id = %document.id, "Summary saved");
        Ok(summary)
    }

    /// Generates an outline of the document's concepts. Never stored.
    pub async fn generate_flow(&self, document_id: Uuid, owner_id: Uuid) -> WorkflowResult<String> {
        let document = self.owned_document(document_id, owner_id, true).await?;
        let text = usable_text(&document)?;
        self.run_completion(&prompts::flow_prompt(text)).await
    }

    /// The conversation of a document, oldest first.
    pub async fn list_exchanges(
        &self,
        document_id: Uuid,
        caller_id: Uuid,
    ) -> WorkflowResult<Vec<Exchange>> {
        let document = self.owned_document(document_id, caller_id, false).await?;
        Ok(self.db.list_exchanges(document.id).await?)
    }

    /// Deletes one exchange. Ownership is derived from the exchange's document,
    /// not from the account id stored on the exchange.
    pub async fn delete_exchange(&self, exchange_id: Uuid, caller_id: Uuid) -> WorkflowResult<()> {
        let exchange = self
            .db
            .get_exchange_by_id(exchange_id)
            .await
            .map_err(not_found_as(WorkflowError::ExchangeNotFound))?;

        let document = self
            .db
            .get_document_by_id(exchange.document_id)
            .await
            .map_err(not_found_as(WorkflowError::ExchangeNotFound))?;
        if document.owner_id != caller_id {
            warn!(
                exchange_id = %exchange_id,
                caller_id = %caller_id,
                "Exchange belongs to another account"
            );
            return Err(WorkflowError::ExchangeNotFound);
        }

        self.db.delete_exchange(exchange.id, document.id).await?;
        info!(exchange_id = %exchange_id, document_id = %document.id, "Exchange deleted");
        Ok(())
    }

    /// Deletes a document and its whole conversation.
    pub async fn delete_document(&self, document_id: Uuid, owner_id: Uuid) -> WorkflowResult<u64> {
        let document = self.owned_document(document_id, owner_id, false).await?;
        let removed = self.db.delete_document(document.id).await?;
        info!(document_id = %document.id, exchanges = removed, "Document deleted");
        Ok(removed)
    }

    async fn owned_document(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        with_text: bool,
    ) -> WorkflowResult<Document> {
        self.db
            .get_owned_document(document_id, owner_id, with_text)
            .await
            .map_err(not_found_as(WorkflowError::DocumentNotFound))
    }

    async fn run_completion(&self, prompt: &str) -> WorkflowResult<String> {
        self.completion.complete(prompt).await.map_err(|e| {
            error!("Completion service call failed: {e}");
            WorkflowError::Completion(e.detail().to_string())
        })
    }
}

fn usable_text(document: &Document) -> WorkflowResult<&str> {
    document.usable_text().ok_or_else(|| {
        warn!(document_id = %document.id, "Document has no text content");
        WorkflowError::EmptyDocumentText
    })
}

#[cfg(test)]
mod tests;
