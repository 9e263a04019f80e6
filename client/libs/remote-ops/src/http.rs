//! REST implementation of the platform traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use snapgram_types::{
    Account, AccountId, FileId, FileUpload, NewAccount, Session, SessionId, SignInCredentials,
    UploadedFile,
};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Collection, PlatformConfig};
use crate::documents::invalid;
use crate::error::{RemoteError, RemoteResult};
use crate::platform::{AccountApi, DocumentApi, DocumentList, DocumentQuery, StorageApi};

const PROJECT_HEADER: &str = "X-Appwrite-Project";

#[derive(Deserialize)]
struct AccountBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionBody {
    #[serde(rename = "$id")]
    id: String,
    user_id: String,
    #[serde(default)]
    expire: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileBody {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    size_original: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Platform client over HTTP. The session lives in the client's cookie jar.
pub struct HttpPlatform {
    client: Client,
    config: PlatformConfig,
}

impl HttpPlatform {
    pub fn new(config: PlatformConfig) -> RemoteResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RemoteError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, url: String) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(PROJECT_HEADER, &self.config.project_id)
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| status.to_string());
        debug!(status = status.as_u16(), message = %message, "Platform request failed");

        Err(match status {
            StatusCode::NOT_FOUND => RemoteError::NotFound(message),
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
            _ => RemoteError::Remote(message),
        })
    }

    async fn send_json(&self, request: RequestBuilder) -> RemoteResult<Value> {
        let response = self.send(request).await?;
        Ok(response.json::<Value>().await?)
    }
}

fn into_account(body: AccountBody) -> Account {
    Account {
        id: AccountId::new(body.id),
        name: body.name,
        email: body.email,
    }
}

#[async_trait]
impl AccountApi for HttpPlatform {
    async fn create_account(&self, id: &AccountId, account: &NewAccount) -> RemoteResult<Account> {
        let url = format!("{}/account", self.config.endpoint);
        let value = self
            .send_json(self.request(reqwest::Method::POST, url).json(&json!({
                "userId": id,
                "email": account.email,
                "password": account.password,
                "name": account.name,
            })))
            .await?;

        let body: AccountBody = serde_json::from_value(value).map_err(|e| invalid("account", e))?;
        Ok(into_account(body))
    }

    async fn create_email_session(
        &self,
        credentials: &SignInCredentials,
    ) -> RemoteResult<Session> {
        let url = format!("{}/account/sessions/email", self.config.endpoint);
        let value = self
            .send_json(self.request(reqwest::Method::POST, url).json(&json!({
                "email": credentials.email,
                "password": credentials.password,
            })))
            .await?;

        let body: SessionBody = serde_json::from_value(value).map_err(|e| invalid("session", e))?;
        Ok(Session {
            id: SessionId::new(body.id),
            account_id: AccountId::new(body.user_id),
            expires_at: body.expire,
        })
    }

    async fn get_account(&self) -> RemoteResult<Account> {
        let url = format!("{}/account", self.config.endpoint);
        let value = self
            .send_json(self.request(reqwest::Method::GET, url))
            .await?;

        let body: AccountBody = serde_json::from_value(value).map_err(|e| invalid("account", e))?;
        Ok(into_account(body))
    }

    async fn delete_current_session(&self) -> RemoteResult<()> {
        let url = format!("{}/account/sessions/current", self.config.endpoint);
        self.send(self.request(reqwest::Method::DELETE, url)).await?;
        Ok(())
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        self.config.avatar_initials_url(name)
    }
}

#[async_trait]
impl DocumentApi for HttpPlatform {
    async fn create_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        let url = self.config.documents_url(collection);
        self.send_json(self.request(reqwest::Method::POST, url).json(&json!({
            "documentId": document_id,
            "data": data,
        })))
        .await
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        let url = self.config.document_url(collection, document_id);
        self.send_json(
            self.request(reqwest::Method::PATCH, url)
                .json(&json!({ "data": data })),
        )
        .await
    }

    async fn get_document(&self, collection: Collection, document_id: &str) -> RemoteResult<Value> {
        let url = self.config.document_url(collection, document_id);
        self.send_json(self.request(reqwest::Method::GET, url)).await
    }

    async fn delete_document(&self, collection: Collection, document_id: &str) -> RemoteResult<()> {
        let url = self.config.document_url(collection, document_id);
        self.send(self.request(reqwest::Method::DELETE, url)).await?;
        Ok(())
    }

    async fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> RemoteResult<DocumentList> {
        let url = self.config.documents_url(collection);
        let params: Vec<(&str, String)> = query
            .to_query_strings()
            .into_iter()
            .map(|q| ("queries[]", q))
            .collect();

        let value = self
            .send_json(self.request(reqwest::Method::GET, url).query(&params))
            .await?;
        serde_json::from_value(value).map_err(|e| invalid("document list", e))
    }
}

#[async_trait]
impl StorageApi for HttpPlatform {
    async fn create_file(&self, file_id: &FileId, file: &FileUpload) -> RemoteResult<UploadedFile> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| RemoteError::Remote(format!("Invalid mime type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let value = self
            .send_json(
                self.request(reqwest::Method::POST, self.config.files_url())
                    .multipart(form),
            )
            .await?;

        let body: FileBody = serde_json::from_value(value).map_err(|e| invalid("file", e))?;
        Ok(UploadedFile {
            id: FileId::new(body.id),
            name: body.name,
            mime_type: body.mime_type,
            size_bytes: body.size_original,
        })
    }

    async fn delete_file(&self, file_id: &FileId) -> RemoteResult<()> {
        let url = self.config.file_url(file_id);
        self.send(self.request(reqwest::Method::DELETE, url)).await?;
        Ok(())
    }

    fn file_preview_url(&self, file_id: &FileId) -> RemoteResult<String> {
        if file_id.is_empty() {
            warn!("Preview requested for empty file id");
            return Err(RemoteError::Remote("file id is required".to_string()));
        }
        Ok(self.config.preview_url(file_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreviewOptions;

    fn platform() -> HttpPlatform {
        HttpPlatform::new(PlatformConfig {
            endpoint: "https://platform.test/v1".to_string(),
            project_id: "proj".to_string(),
            database_id: "db".to_string(),
            storage_id: "media".to_string(),
            user_collection_id: "users".to_string(),
            post_collection_id: "posts".to_string(),
            saves_collection_id: "saves".to_string(),
            request_timeout_secs: 5,
            preview: PreviewOptions::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_preview_url_requires_file_id() {
        let platform = platform();
        assert!(platform.file_preview_url(&FileId::new("")).is_err());
        assert!(platform
            .file_preview_url(&FileId::new("f1"))
            .unwrap()
            .contains("/files/f1/preview"));
    }

    #[test]
    fn test_decode_session_body() {
        let body: SessionBody = serde_json::from_value(json!({
            "$id": "s1",
            "userId": "a1",
            "expire": "2025-01-01T00:00:00.000+00:00"
        }))
        .unwrap();
        assert_eq!(body.user_id, "a1");
        assert!(body.expire.is_some());
    }

    #[test]
    fn test_decode_document_list() {
        let list: DocumentList = serde_json::from_value(json!({
            "total": 1,
            "documents": [{ "$id": "p1" }]
        }))
        .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.documents.len(), 1);
    }
}
