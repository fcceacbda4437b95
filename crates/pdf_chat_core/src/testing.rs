//! crates/pdf_chat_core/src/testing.rs
//!
//! In-memory implementations of every port, for tests. They keep records in
//! insertion order and expose what they were asked to do.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    Account, AccountCredentials, AccountUpdate, Document, Exchange, NewAccount, NewDocument,
    NewExchange, StoredObject,
};
use crate::ports::{
    CompletionService, DatabaseService, ObjectStorageService, PortError, PortResult,
    TextExtractionService,
};
use crate::workflow::DocumentWorkflow;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Tables {
    accounts: Vec<AccountCredentials>,
    /// Documents with their full text, oldest upload first.
    documents: Vec<Document>,
    /// Exchanges, oldest first.
    exchanges: Vec<Exchange>,
}

#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        lock(&self.tables).accounts.len()
    }

    pub fn document_count(&self) -> usize {
        lock(&self.tables).documents.len()
    }

    /// Every stored exchange of a document, whether or not the document still exists.
    pub fn exchanges_for(&self, document_id: Uuid) -> Vec<Exchange> {
        lock(&self.tables)
            .exchanges
            .iter()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect()
    }

    /// The stored document including its text.
    pub fn raw_document(&self, document_id: Uuid) -> Option<Document> {
        lock(&self.tables)
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .cloned()
    }
}

fn without_text(document: &Document) -> Document {
    Document {
        text_content: None,
        ..document.clone()
    }
}

#[async_trait]
impl DatabaseService for MemoryDatabase {
    async fn create_account(&self, account: NewAccount) -> PortResult<Account> {
        let mut tables = lock(&self.tables);
        if tables
            .accounts
            .iter()
            .any(|c| c.account.username == account.username || c.account.email == account.email)
        {
            return Err(PortError::Conflict(
                "username or email already exists".to_string(),
            ));
        }
        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            created_at: Utc::now(),
        };
        tables.accounts.push(AccountCredentials {
            account: created.clone(),
            password_hash: account.password_hash,
        });
        Ok(created)
    }

    async fn get_account_by_id(&self, account_id: Uuid) -> PortResult<Account> {
        self.get_credentials_by_id(account_id)
            .await
            .map(|c| c.account)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials> {
        lock(&self.tables)
            .accounts
            .iter()
            .find(|c| c.account.email == email)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Account with email {email} not found")))
    }

    async fn get_credentials_by_id(&self, account_id: Uuid) -> PortResult<AccountCredentials> {
        lock(&self.tables)
            .accounts
            .iter()
            .find(|c| c.account.id == account_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Account {account_id} not found")))
    }

    async fn username_taken(&self, username: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        Ok(lock(&self.tables)
            .accounts
            .iter()
            .any(|c| c.account.username == username && Some(c.account.id) != excluding))
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        Ok(lock(&self.tables)
            .accounts
            .iter()
            .any(|c| c.account.email == email && Some(c.account.id) != excluding))
    }

    async fn update_account(&self, update: AccountUpdate) -> PortResult<Account> {
        let mut tables = lock(&self.tables);
        let credentials = tables
            .accounts
            .iter_mut()
            .find(|c| c.account.id == update.id)
            .ok_or_else(|| PortError::NotFound(format!("Account {} not found", update.id)))?;
        credentials.account.username = update.username;
        credentials.account.email = update.email;
        credentials.password_hash = update.password_hash;
        Ok(credentials.account.clone())
    }

    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let created = Document {
            id: Uuid::new_v4(),
            owner_id: document.owner_id,
            title: document.title,
            original_filename: document.original_filename,
            url: document.url,
            text_content: Some(document.text_content),
            summary: String::new(),
            exchange_ids: Vec::new(),
            uploaded_at: Utc::now(),
        };
        lock(&self.tables).documents.push(created.clone());
        Ok(created)
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        lock(&self.tables)
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .map(without_text)
            .ok_or_else(|| PortError::NotFound(format!("Document {document_id} not found")))
    }

    async fn get_owned_document(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        with_text: bool,
    ) -> PortResult<Document> {
        lock(&self.tables)
            .documents
            .iter()
            .find(|d| d.id == document_id && d.owner_id == owner_id)
            .map(|d| if with_text { d.clone() } else { without_text(d) })
            .ok_or_else(|| PortError::NotFound(format!("Document {document_id} not found")))
    }

    async fn list_documents_for_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        Ok(lock(&self.tables)
            .documents
            .iter()
            .rev()
            .filter(|d| d.owner_id == owner_id)
            .map(without_text)
            .collect())
    }

    async fn count_documents_for_owner(&self, owner_id: Uuid) -> PortResult<u64> {
        Ok(lock(&self.tables)
            .documents
            .iter()
            .filter(|d| d.owner_id == owner_id)
            .count() as u64)
    }

    async fn update_document_summary(&self, document_id: Uuid, summary: &str) -> PortResult<()> {
        let mut tables = lock(&self.tables);
        let document = tables
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| PortError::NotFound(format!("Document {document_id} not found")))?;
        document.summary = summary.to_string();
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<u64> {
        let mut tables = lock(&self.tables);
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != document_id);
        if tables.documents.len() == before {
            return Err(PortError::NotFound(format!("Document {document_id} not found")));
        }
        let exchanges_before = tables.exchanges.len();
        tables.exchanges.retain(|e| e.document_id != document_id);
        Ok((exchanges_before - tables.exchanges.len()) as u64)
    }

    async fn create_exchange(&self, exchange: NewExchange) -> PortResult<Exchange> {
        let mut tables = lock(&self.tables);
        let created = Exchange {
            id: Uuid::new_v4(),
            document_id: exchange.document_id,
            account_id: exchange.account_id,
            question: exchange.question,
            response: exchange.response,
            created_at: Utc::now(),
        };
        let document = tables
            .documents
            .iter_mut()
            .find(|d| d.id == created.document_id)
            .ok_or_else(|| {
                PortError::NotFound(format!("Document {} not found", created.document_id))
            })?;
        document.exchange_ids.push(created.id);
        tables.exchanges.push(created.clone());
        Ok(created)
    }

    async fn get_exchange_by_id(&self, exchange_id: Uuid) -> PortResult<Exchange> {
        lock(&self.tables)
            .exchanges
            .iter()
            .find(|e| e.id == exchange_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Exchange {exchange_id} not found")))
    }

    async fn recent_exchanges(&self, document_id: Uuid, limit: usize) -> PortResult<Vec<Exchange>> {
        Ok(lock(&self.tables)
            .exchanges
            .iter()
            .rev()
            .filter(|e| e.document_id == document_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_exchanges(&self, document_id: Uuid) -> PortResult<Vec<Exchange>> {
        Ok(self.exchanges_for(document_id))
    }

    async fn delete_exchange(&self, exchange_id: Uuid, document_id: Uuid) -> PortResult<()> {
        let mut tables = lock(&self.tables);
        tables.exchanges.retain(|e| e.id != exchange_id);
        if let Some(document) = tables.documents.iter_mut().find(|d| d.id == document_id) {
            document.exchange_ids.retain(|id| *id != exchange_id);
        }
        Ok(())
    }
}

//=========================================================================================
// Object storage
//=========================================================================================

#[derive(Default)]
pub struct RecordingStorage {
    failure: Option<String>,
    uploads: Mutex<Vec<(String, usize)>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// `(file name, byte length)` of every upload attempt.
    pub fn uploads(&self) -> Vec<(String, usize)> {
        lock(&self.uploads).clone()
    }
}

#[async_trait]
impl ObjectStorageService for RecordingStorage {
    async fn upload_pdf(&self, file_name: &str, bytes: &[u8]) -> PortResult<StoredObject> {
        lock(&self.uploads).push((file_name.to_string(), bytes.len()));
        if let Some(message) = &self.failure {
            return Err(PortError::Unexpected(message.clone()));
        }
        let public_id = format!("pdfs/{file_name}");
        Ok(StoredObject {
            url: format!("https://storage.test/{public_id}"),
            public_id,
        })
    }
}

//=========================================================================================
// Completion service
//=========================================================================================

/// Replies with a fixed text (or a fixed failure) and records every prompt.
pub struct ScriptedCompletion {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> PortResult<String> {
        lock(&self.prompts).push(prompt.to_string());
        self.reply.clone().map_err(PortError::Unexpected)
    }
}

//=========================================================================================
// Text extraction
//=========================================================================================

pub struct StaticExtractor {
    text: Option<String>,
}

impl StaticExtractor {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextExtractionService for StaticExtractor {
    async fn extract_text(&self, _pdf_bytes: &[u8]) -> PortResult<String> {
        self.text
            .clone()
            .ok_or_else(|| PortError::Unexpected("no text layer".to_string()))
    }
}

//=========================================================================================
// Wiring
//=========================================================================================

/// A workflow over in-memory ports, with handles kept for inspection.
pub struct TestHarness {
    pub db: Arc<MemoryDatabase>,
    pub storage: Arc<RecordingStorage>,
    pub completion: Arc<ScriptedCompletion>,
    pub workflow: DocumentWorkflow,
}

impl TestHarness {
    pub fn new(
        storage: RecordingStorage,
        completion: ScriptedCompletion,
        extractor: StaticExtractor,
    ) -> Self {
        let db = Arc::new(MemoryDatabase::new());
        let storage = Arc::new(storage);
        let completion = Arc::new(completion);
        let workflow = DocumentWorkflow::new(
            db.clone(),
            storage.clone(),
            completion.clone(),
            Arc::new(extractor),
        );
        Self {
            db,
            storage,
            completion,
            workflow,
        }
    }

    /// Healthy storage, a completion service answering `reply`, no extractable text.
    pub fn replying(reply: &str) -> Self {
        Self::new(
            RecordingStorage::new(),
            ScriptedCompletion::replying(reply),
            StaticExtractor::failing(),
        )
    }
}
