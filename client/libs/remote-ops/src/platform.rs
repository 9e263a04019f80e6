//! Platform seam
//!
//! The hosted platform is reached only through these traits. Documents are
//! exchanged as JSON values in the platform's wire shape; typed decoding
//! happens in the facade.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snapgram_types::{
    Account, AccountId, FileId, FileUpload, NewAccount, Session, SignInCredentials, UploadedFile,
};

use crate::config::Collection;
use crate::error::RemoteResult;

/// Document attribute names used in queries
pub mod fields {
    pub const ID: &str = "$id";
    pub const CREATED_AT: &str = "$createdAt";
    pub const UPDATED_AT: &str = "$updatedAt";
    pub const ACCOUNT_ID: &str = "accountId";
    pub const CAPTION: &str = "caption";
}

/// A single query primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryClause {
    Equal { field: String, value: String },
    Search { field: String, term: String },
    OrderDesc { field: String },
    Limit(usize),
    CursorAfter(String),
}

impl QueryClause {
    /// Platform query string syntax
    pub fn to_query_string(&self) -> String {
        match self {
            QueryClause::Equal { field, value } => {
                format!("equal(\"{}\", [{}])", field, quote(value))
            }
            QueryClause::Search { field, term } => {
                format!("search(\"{}\", [{}])", field, quote(term))
            }
            QueryClause::OrderDesc { field } => format!("orderDesc(\"{}\")", field),
            QueryClause::Limit(n) => format!("limit({})", n),
            QueryClause::CursorAfter(id) => format!("cursorAfter({})", quote(id)),
        }
    }
}

fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Filter/sort/limit/cursor query builder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentQuery {
    pub clauses: Vec<QueryClause>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, field: &str, value: &str) -> Self {
        self.clauses.push(QueryClause::Equal {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn search(mut self, field: &str, term: &str) -> Self {
        self.clauses.push(QueryClause::Search {
            field: field.to_string(),
            term: term.to_string(),
        });
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.clauses.push(QueryClause::OrderDesc {
            field: field.to_string(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.clauses.push(QueryClause::Limit(limit));
        self
    }

    pub fn cursor_after(mut self, document_id: &str) -> Self {
        self.clauses
            .push(QueryClause::CursorAfter(document_id.to_string()));
        self
    }

    pub fn to_query_strings(&self) -> Vec<String> {
        self.clauses.iter().map(QueryClause::to_query_string).collect()
    }
}

/// Result page of a list query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Value>,
}

/// Identity and session management
#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn create_account(&self, id: &AccountId, account: &NewAccount) -> RemoteResult<Account>;

    async fn create_email_session(&self, credentials: &SignInCredentials)
        -> RemoteResult<Session>;

    /// Account of the active session; `Unauthorized` when there is none
    async fn get_account(&self) -> RemoteResult<Account>;

    async fn delete_current_session(&self) -> RemoteResult<()>;

    fn avatar_initials_url(&self, name: &str) -> String;
}

/// Document CRUD
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn create_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value>;

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value>;

    /// `NotFound` when no document has this id
    async fn get_document(&self, collection: Collection, document_id: &str) -> RemoteResult<Value>;

    async fn delete_document(&self, collection: Collection, document_id: &str) -> RemoteResult<()>;

    async fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> RemoteResult<DocumentList>;
}

/// Binary object storage
#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn create_file(&self, file_id: &FileId, file: &FileUpload) -> RemoteResult<UploadedFile>;

    async fn delete_file(&self, file_id: &FileId) -> RemoteResult<()>;

    /// Derived preview URL; fails when the platform cannot derive one
    fn file_preview_url(&self, file_id: &FileId) -> RemoteResult<String>;
}

/// Everything the facade needs from the platform
pub trait Platform: AccountApi + DocumentApi + StorageApi {}

impl<T> Platform for T where T: AccountApi + DocumentApi + StorageApi {}
