//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Writes that touch both a document and its exchanges run in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pdf_chat_core::domain::{
    Account, AccountCredentials, AccountUpdate, Document, Exchange, NewAccount, NewDocument,
    NewExchange,
};
use pdf_chat_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, created_at";
const DOCUMENT_COLUMNS: &str =
    "id, owner_id, title, original_filename, url, NULL::TEXT AS text_content, summary, \
     exchange_ids, uploaded_at";
const DOCUMENT_COLUMNS_WITH_TEXT: &str =
    "id, owner_id, title, original_filename, url, text_content, summary, exchange_ids, uploaded_at";
const EXCHANGE_COLUMNS: &str = "id, document_id, account_id, question, response, created_at";

/// Translates a `sqlx` failure into the port vocabulary.
fn port_error(e: sqlx::Error, missing: impl FnOnce() -> String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(missing()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            PortError::NotFound(missing())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}
impl AccountRecord {
    fn to_credentials(self) -> AccountCredentials {
        AccountCredentials {
            account: Account {
                id: self.id,
                username: self.username,
                email: self.email,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    original_filename: String,
    url: String,
    text_content: Option<String>,
    summary: String,
    exchange_ids: Vec<Uuid>,
    uploaded_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            original_filename: self.original_filename,
            url: self.url,
            text_content: self.text_content,
            summary: self.summary,
            exchange_ids: self.exchange_ids,
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(FromRow)]
struct ExchangeRecord {
    id: Uuid,
    document_id: Uuid,
    account_id: Uuid,
    question: String,
    response: String,
    created_at: DateTime<Utc>,
}
impl ExchangeRecord {
    fn to_domain(self) -> Exchange {
        Exchange {
            id: self.id,
            document_id: self.document_id,
            account_id: self.account_id,
            question: self.question,
            response: self.response,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_account(&self, account: NewAccount) -> PortResult<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "INSERT INTO accounts (id, username, email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || "Account was not created".to_string()))?;
        Ok(record.to_credentials().account)
    }

    async fn get_account_by_id(&self, account_id: Uuid) -> PortResult<Account> {
        self.get_credentials_by_id(account_id)
            .await
            .map(|credentials| credentials.account)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<AccountCredentials> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Account with email {} not found", email)))?;
        Ok(record.to_credentials())
    }

    async fn get_credentials_by_id(&self, account_id: Uuid) -> PortResult<AccountCredentials> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Account {} not found", account_id)))?;
        Ok(record.to_credentials())
    }

    async fn username_taken(&self, username: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts \
             WHERE username = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts \
             WHERE email = $1 AND ($2::UUID IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn update_account(&self, update: AccountUpdate) -> PortResult<Account> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "UPDATE accounts SET username = $2, email = $3, password_hash = $4 \
             WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(update.id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Account {} not found", update.id)))?;
        Ok(record.to_credentials().account)
    }

    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "INSERT INTO documents (id, owner_id, title, original_filename, url, text_content) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {DOCUMENT_COLUMNS_WITH_TEXT}"
        ))
        .bind(Uuid::new_v4())
        .bind(document.owner_id)
        .bind(&document.title)
        .bind(&document.original_filename)
        .bind(&document.url)
        .bind(&document.text_content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Document {} not found", document_id)))?;
        Ok(record.to_domain())
    }

    async fn get_owned_document(
        &self,
        document_id: Uuid,
        owner_id: Uuid,
        with_text: bool,
    ) -> PortResult<Document> {
        let columns = if with_text {
            DOCUMENT_COLUMNS_WITH_TEXT
        } else {
            DOCUMENT_COLUMNS
        };
        let record = sqlx::query_as::<_, DocumentRecord>(&format!(
            "SELECT {columns} FROM documents WHERE id = $1 AND owner_id = $2"
        ))
        .bind(document_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Document {} not found", document_id)))?;
        Ok(record.to_domain())
    }

    async fn list_documents_for_owner(&self, owner_id: Uuid) -> PortResult<Vec<Document>> {
        let records = sqlx::query_as::<_, DocumentRecord>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE owner_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let documents = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(documents)
    }

    async fn count_documents_for_owner(&self, owner_id: Uuid) -> PortResult<u64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents WHERE owner_id = $1")
                .bind(owner_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(count.max(0) as u64)
    }

    async fn update_document_summary(&self, document_id: Uuid, summary: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE documents SET summary = $1 WHERE id = $2")
            .bind(summary)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }
        Ok(())
    }

    async fn delete_document(&self, document_id: Uuid) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let exchanges = sqlx::query("DELETE FROM exchanges WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();

        let documents = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();
        if documents == 0 {
            // Dropping the transaction rolls it back.
            return Err(PortError::NotFound(format!("Document {} not found", document_id)));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(exchanges)
    }

    async fn create_exchange(&self, exchange: NewExchange) -> PortResult<Exchange> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, ExchangeRecord>(&format!(
            "INSERT INTO exchanges (id, document_id, account_id, question, response) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {EXCHANGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(exchange.document_id)
        .bind(exchange.account_id)
        .bind(&exchange.question)
        .bind(&exchange.response)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| port_error(e, || format!("Document {} not found", exchange.document_id)))?;

        let linked = sqlx::query(
            "UPDATE documents SET exchange_ids = array_append(exchange_ids, $1) WHERE id = $2",
        )
        .bind(record.id)
        .bind(exchange.document_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?
        .rows_affected();
        if linked == 0 {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                exchange.document_id
            )));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_exchange_by_id(&self, exchange_id: Uuid) -> PortResult<Exchange> {
        let record = sqlx::query_as::<_, ExchangeRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges WHERE id = $1"
        ))
        .bind(exchange_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| port_error(e, || format!("Exchange {} not found", exchange_id)))?;
        Ok(record.to_domain())
    }

    async fn recent_exchanges(&self, document_id: Uuid, limit: usize) -> PortResult<Vec<Exchange>> {
        let records = sqlx::query_as::<_, ExchangeRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges \
             WHERE document_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(document_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_exchanges(&self, document_id: Uuid) -> PortResult<Vec<Exchange>> {
        let records = sqlx::query_as::<_, ExchangeRecord>(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges \
             WHERE document_id = $1 ORDER BY created_at ASC"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_exchange(&self, exchange_id: Uuid, document_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let deleted = sqlx::query("DELETE FROM exchanges WHERE id = $1")
            .bind(exchange_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .rows_affected();
        if deleted == 0 {
            return Err(PortError::NotFound(format!("Exchange {} not found", exchange_id)));
        }

        sqlx::query(
            "UPDATE documents SET exchange_ids = array_remove(exchange_ids, $1) WHERE id = $2",
        )
        .bind(exchange_id)
        .bind(document_id)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }
}
