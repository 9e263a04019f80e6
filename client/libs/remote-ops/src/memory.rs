//! In-process platform for tests
//!
//! Deterministic: timestamps come from a logical clock advancing one
//! millisecond per write, so `$createdAt`/`$updatedAt` ordering follows
//! call order. Any call can be made to fail once or permanently.

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use snapgram_types::{
    Account, AccountId, FileId, FileUpload, NewAccount, Session, SessionId, SignInCredentials,
    UploadedFile,
};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::config::Collection;
use crate::error::{RemoteError, RemoteResult};
use crate::platform::{
    fields, AccountApi, DocumentApi, DocumentList, DocumentQuery, QueryClause, StorageApi,
};

/// Platform calls that can be observed and failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformCall {
    CreateAccount,
    CreateSession,
    GetAccount,
    DeleteSession,
    CreateDocument(Collection),
    UpdateDocument(Collection),
    GetDocument(Collection),
    DeleteDocument(Collection),
    ListDocuments(Collection),
    CreateFile,
    DeleteFile,
    PreviewUrl,
}

/// 2024-01-01T00:00:00Z
const CLOCK_START_MS: i64 = 1_704_067_200_000;

#[derive(Debug, Clone)]
enum Fault {
    Once(RemoteError),
    Always(RemoteError),
}

struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<StoredAccount>,
    session: Option<Session>,
    documents: HashMap<Collection, Vec<Value>>,
    files: HashMap<FileId, UploadedFile>,
    clock_ms: i64,
    faults: HashMap<PlatformCall, Fault>,
    calls: HashMap<PlatformCall, usize>,
    latency: HashMap<PlatformCall, Duration>,
}

impl State {
    fn tick(&mut self) -> String {
        self.clock_ms += 1;
        Utc.timestamp_millis_opt(CLOCK_START_MS + self.clock_ms)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn collection(&mut self, collection: Collection) -> &mut Vec<Value> {
        self.documents.entry(collection).or_default()
    }

    fn position(&self, collection: Collection, document_id: &str) -> Option<usize> {
        self.documents
            .get(&collection)?
            .iter()
            .position(|doc| doc.get(fields::ID).and_then(Value::as_str) == Some(document_id))
    }

    /// User documents carry their save records, like the platform's
    /// relationship expansion
    fn expand(&self, collection: Collection, mut doc: Value) -> Value {
        if collection != Collection::Users {
            return doc;
        }
        let user_id = doc.get(fields::ID).and_then(Value::as_str).map(str::to_string);
        let saves: Vec<Value> = self
            .documents
            .get(&Collection::Saves)
            .map(|saves| {
                saves
                    .iter()
                    .filter(|save| save.get("user").and_then(Value::as_str) == user_id.as_deref())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Value::Object(map) = &mut doc {
            map.insert("save".to_string(), Value::Array(saves));
        }
        doc
    }
}

/// Deterministic in-process platform
#[derive(Default)]
pub struct InMemoryPlatform {
    state: Mutex<State>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `call` with a generic remote error
    pub fn fail_next(&self, call: PlatformCall) {
        self.fail_next_with(
            call,
            RemoteError::Remote(format!("injected failure: {:?}", call)),
        );
    }

    pub fn fail_next_with(&self, call: PlatformCall, error: RemoteError) {
        self.state.lock().faults.insert(call, Fault::Once(error));
    }

    /// Fail every `call` until `clear_faults`
    pub fn fail_always(&self, call: PlatformCall) {
        let error = RemoteError::Remote(format!("injected failure: {:?}", call));
        self.state.lock().faults.insert(call, Fault::Always(error));
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Delay every `call` by `delay` before it is served
    pub fn set_latency(&self, call: PlatformCall, delay: Duration) {
        self.state.lock().latency.insert(call, delay);
    }

    pub fn call_count(&self, call: PlatformCall) -> usize {
        self.state.lock().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn document(&self, collection: Collection, document_id: &str) -> Option<Value> {
        let state = self.state.lock();
        let idx = state.position(collection, document_id)?;
        state
            .documents
            .get(&collection)
            .and_then(|docs| docs.get(idx))
            .cloned()
    }

    pub fn document_count(&self, collection: Collection) -> usize {
        self.state
            .lock()
            .documents
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn has_file(&self, file_id: &FileId) -> bool {
        self.state.lock().files.contains_key(file_id)
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }

    pub fn has_session(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Count the call, apply latency, then surface any injected fault
    async fn enter(&self, call: PlatformCall) -> RemoteResult<()> {
        let delay = {
            let mut state = self.state.lock();
            *state.calls.entry(call).or_insert(0) += 1;
            state.latency.get(&call).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_fault(call)
    }

    fn check_fault(&self, call: PlatformCall) -> RemoteResult<()> {
        let mut state = self.state.lock();
        match state.faults.get(&call).cloned() {
            Some(Fault::Once(error)) => {
                state.faults.remove(&call);
                debug!(?call, "Injected failure");
                Err(error)
            }
            Some(Fault::Always(error)) => Err(error),
            None => Ok(()),
        }
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn matches_filters(doc: &Value, query: &DocumentQuery) -> bool {
    query.clauses.iter().all(|clause| match clause {
        QueryClause::Equal { field, value } => {
            doc.get(field).and_then(Value::as_str) == Some(value.as_str())
        }
        QueryClause::Search { field, term } => doc
            .get(field)
            .and_then(Value::as_str)
            .map(|text| text.to_lowercase().contains(&term.to_lowercase()))
            .unwrap_or(false),
        _ => true,
    })
}

fn evaluate(docs: Vec<Value>, query: &DocumentQuery) -> RemoteResult<Vec<Value>> {
    let mut docs: Vec<Value> = docs
        .into_iter()
        .filter(|doc| matches_filters(doc, query))
        .collect();

    for clause in &query.clauses {
        if let QueryClause::OrderDesc { field } = clause {
            docs.sort_by(|a, b| compare_field(b, a, field));
        }
    }

    for clause in &query.clauses {
        if let QueryClause::CursorAfter(cursor) = clause {
            let idx = docs
                .iter()
                .position(|doc| doc.get(fields::ID).and_then(Value::as_str) == Some(cursor))
                .ok_or_else(|| {
                    RemoteError::Remote(format!("Document '{}' for cursor not found", cursor))
                })?;
            docs.drain(..=idx);
        }
    }

    for clause in &query.clauses {
        if let QueryClause::Limit(limit) = clause {
            docs.truncate(*limit);
        }
    }

    Ok(docs)
}

#[async_trait]
impl AccountApi for InMemoryPlatform {
    async fn create_account(&self, id: &AccountId, account: &NewAccount) -> RemoteResult<Account> {
        self.enter(PlatformCall::CreateAccount).await?;
        let mut state = self.state.lock();

        if state
            .accounts
            .iter()
            .any(|stored| stored.account.email == account.email)
        {
            return Err(RemoteError::Remote(
                "A user with the same email already exists".to_string(),
            ));
        }

        let created = Account {
            id: id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
        };
        state.accounts.push(StoredAccount {
            account: created.clone(),
            password: account.password.clone(),
        });
        Ok(created)
    }

    async fn create_email_session(
        &self,
        credentials: &SignInCredentials,
    ) -> RemoteResult<Session> {
        self.enter(PlatformCall::CreateSession).await?;
        let mut state = self.state.lock();

        let account_id = state
            .accounts
            .iter()
            .find(|stored| {
                stored.account.email == credentials.email
                    && stored.password == credentials.password
            })
            .map(|stored| stored.account.id.clone())
            .ok_or_else(|| {
                RemoteError::Unauthorized(
                    "Invalid credentials. Please check the email and password.".to_string(),
                )
            })?;

        let session = Session {
            id: SessionId::unique(),
            account_id,
            expires_at: None,
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn get_account(&self) -> RemoteResult<Account> {
        self.enter(PlatformCall::GetAccount).await?;
        let state = self.state.lock();

        let session = state
            .session
            .as_ref()
            .ok_or_else(|| RemoteError::Unauthorized("No active session".to_string()))?;
        state
            .accounts
            .iter()
            .find(|stored| stored.account.id == session.account_id)
            .map(|stored| stored.account.clone())
            .ok_or_else(|| RemoteError::Unauthorized("Session account is gone".to_string()))
    }

    async fn delete_current_session(&self) -> RemoteResult<()> {
        self.enter(PlatformCall::DeleteSession).await?;
        self.state
            .lock()
            .session
            .take()
            .map(|_| ())
            .ok_or_else(|| RemoteError::Unauthorized("No active session".to_string()))
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        format!("memory://avatars/initials?name={}", urlencoding::encode(name))
    }
}

#[async_trait]
impl DocumentApi for InMemoryPlatform {
    async fn create_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        self.enter(PlatformCall::CreateDocument(collection)).await?;
        let mut state = self.state.lock();

        if state.position(collection, document_id).is_some() {
            return Err(RemoteError::Remote(
                "Document with the requested ID already exists".to_string(),
            ));
        }
        let Value::Object(mut map) = data else {
            return Err(RemoteError::Remote("Document data must be an object".to_string()));
        };

        let now = state.tick();
        map.insert(fields::ID.to_string(), Value::String(document_id.to_string()));
        map.insert(fields::CREATED_AT.to_string(), Value::String(now.clone()));
        map.insert(fields::UPDATED_AT.to_string(), Value::String(now));

        let doc = Value::Object(map);
        state.collection(collection).push(doc.clone());
        Ok(state.expand(collection, doc))
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        self.enter(PlatformCall::UpdateDocument(collection)).await?;
        let mut state = self.state.lock();

        let idx = state
            .position(collection, document_id)
            .ok_or_else(|| RemoteError::NotFound(format!("{} {}", collection, document_id)))?;
        let Value::Object(patch) = data else {
            return Err(RemoteError::Remote("Document data must be an object".to_string()));
        };

        let now = state.tick();
        let docs = state.collection(collection);
        if let Value::Object(map) = &mut docs[idx] {
            for (key, value) in patch {
                map.insert(key, value);
            }
            map.insert(fields::UPDATED_AT.to_string(), Value::String(now));
        }
        let doc = docs[idx].clone();
        Ok(state.expand(collection, doc))
    }

    async fn get_document(&self, collection: Collection, document_id: &str) -> RemoteResult<Value> {
        self.enter(PlatformCall::GetDocument(collection)).await?;
        let state = self.state.lock();

        let doc = state
            .position(collection, document_id)
            .and_then(|idx| state.documents.get(&collection)?.get(idx).cloned())
            .ok_or_else(|| RemoteError::NotFound(format!("{} {}", collection, document_id)))?;
        Ok(state.expand(collection, doc))
    }

    async fn delete_document(&self, collection: Collection, document_id: &str) -> RemoteResult<()> {
        self.enter(PlatformCall::DeleteDocument(collection)).await?;
        let mut state = self.state.lock();

        let idx = state
            .position(collection, document_id)
            .ok_or_else(|| RemoteError::NotFound(format!("{} {}", collection, document_id)))?;
        state.collection(collection).remove(idx);
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> RemoteResult<DocumentList> {
        self.enter(PlatformCall::ListDocuments(collection)).await?;
        let state = self.state.lock();

        let all = state.documents.get(&collection).cloned().unwrap_or_default();
        let total = all.iter().filter(|doc| matches_filters(doc, query)).count() as u64;
        let documents = evaluate(all, query)?
            .into_iter()
            .map(|doc| state.expand(collection, doc))
            .collect();

        Ok(DocumentList { total, documents })
    }
}

#[async_trait]
impl StorageApi for InMemoryPlatform {
    async fn create_file(&self, file_id: &FileId, file: &FileUpload) -> RemoteResult<UploadedFile> {
        self.enter(PlatformCall::CreateFile).await?;
        let uploaded = UploadedFile {
            id: file_id.clone(),
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.bytes.len() as u64,
        };
        self.state
            .lock()
            .files
            .insert(file_id.clone(), uploaded.clone());
        Ok(uploaded)
    }

    async fn delete_file(&self, file_id: &FileId) -> RemoteResult<()> {
        self.enter(PlatformCall::DeleteFile).await?;
        self.state
            .lock()
            .files
            .remove(file_id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(format!("file {}", file_id)))
    }

    fn file_preview_url(&self, file_id: &FileId) -> RemoteResult<String> {
        {
            let mut state = self.state.lock();
            *state.calls.entry(PlatformCall::PreviewUrl).or_insert(0) += 1;
        }
        self.check_fault(PlatformCall::PreviewUrl)?;

        if !self.has_file(file_id) {
            return Err(RemoteError::NotFound(format!("file {}", file_id)));
        }
        Ok(format!("memory://files/{}/preview", file_id))
    }
}
