/// Platform configuration shared by the HTTP client and URL builders
use serde::{Deserialize, Serialize};
use snapgram_types::FileId;

use crate::error::{RemoteError, RemoteResult};

/// Document collections used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Users,
    Posts,
    Saves,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Users => write!(f, "users"),
            Collection::Posts => write!(f, "posts"),
            Collection::Saves => write!(f, "saves"),
        }
    }
}

/// Derived image preview parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewOptions {
    pub width: u32,
    pub height: u32,
    pub gravity: String,
    pub quality: u8,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            gravity: "top".to_string(),
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API endpoint, e.g. https://cloud.appwrite.io/v1
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub storage_id: String,
    pub user_collection_id: String,
    pub post_collection_id: String,
    pub saves_collection_id: String,
    /// Transport timeout; the client itself never retries
    pub request_timeout_secs: u64,
    pub preview: PreviewOptions,
}

impl PlatformConfig {
    /// Load platform configuration from environment variables
    pub fn from_env() -> RemoteResult<Self> {
        Ok(Self {
            endpoint: std::env::var("APPWRITE_URL")
                .unwrap_or_else(|_| "https://cloud.appwrite.io/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            project_id: required("APPWRITE_PROJECT_ID")?,
            database_id: required("APPWRITE_DATABASE_ID")?,
            storage_id: required("APPWRITE_STORAGE_ID")?,
            user_collection_id: required("APPWRITE_USER_COLLECTION_ID")?,
            post_collection_id: required("APPWRITE_POST_COLLECTION_ID")?,
            saves_collection_id: required("APPWRITE_SAVES_COLLECTION_ID")?,
            request_timeout_secs: std::env::var("APPWRITE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            preview: PreviewOptions::default(),
        })
    }

    pub fn collection_id(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.user_collection_id,
            Collection::Posts => &self.post_collection_id,
            Collection::Saves => &self.saves_collection_id,
        }
    }

    /// Documents endpoint of a collection
    pub fn documents_url(&self, collection: Collection) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.endpoint,
            self.database_id,
            self.collection_id(collection)
        )
    }

    pub fn document_url(&self, collection: Collection, document_id: &str) -> String {
        format!("{}/{}", self.documents_url(collection), document_id)
    }

    pub fn files_url(&self) -> String {
        format!("{}/storage/buckets/{}/files", self.endpoint, self.storage_id)
    }

    pub fn file_url(&self, file_id: &FileId) -> String {
        format!("{}/{}", self.files_url(), file_id)
    }

    /// Public preview URL of a stored image
    pub fn preview_url(&self, file_id: &FileId) -> String {
        format!(
            "{}/preview?width={}&height={}&gravity={}&quality={}&project={}",
            self.file_url(file_id),
            self.preview.width,
            self.preview.height,
            self.preview.gravity,
            self.preview.quality,
            self.project_id
        )
    }

    /// Generated initials avatar for a display name
    pub fn avatar_initials_url(&self, name: &str) -> String {
        format!(
            "{}/avatars/initials?name={}&project={}",
            self.endpoint,
            urlencoding::encode(name),
            self.project_id
        )
    }
}

fn required(var: &str) -> RemoteResult<String> {
    std::env::var(var).map_err(|_| RemoteError::Config(format!("{} environment variable not set", var)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_config() -> PlatformConfig {
        PlatformConfig {
            endpoint: "https://platform.test/v1".to_string(),
            project_id: "proj".to_string(),
            database_id: "db".to_string(),
            storage_id: "media".to_string(),
            user_collection_id: "users-col".to_string(),
            post_collection_id: "posts-col".to_string(),
            saves_collection_id: "saves-col".to_string(),
            request_timeout_secs: 30,
            preview: PreviewOptions::default(),
        }
    }

    #[test]
    fn test_document_url() {
        let config = test_config();
        assert_eq!(
            config.document_url(Collection::Posts, "p1"),
            "https://platform.test/v1/databases/db/collections/posts-col/documents/p1"
        );
    }

    #[test]
    fn test_preview_url() {
        let config = test_config();
        assert_eq!(
            config.preview_url(&FileId::new("f1")),
            "https://platform.test/v1/storage/buckets/media/files/f1/preview?width=1080&height=1080&gravity=top&quality=85&project=proj"
        );
    }

    #[test]
    fn test_avatar_url_encodes_name() {
        let config = test_config();
        assert_eq!(
            config.avatar_initials_url("Ada Lovelace"),
            "https://platform.test/v1/avatars/initials?name=Ada%20Lovelace&project=proj"
        );
    }

    #[test]
    #[serial]
    fn test_from_env_requires_project() {
        std::env::remove_var("APPWRITE_PROJECT_ID");
        let err = PlatformConfig::from_env().unwrap_err();
        assert!(matches!(err, RemoteError::Config(_)));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_ids() {
        std::env::set_var("APPWRITE_URL", "https://platform.test/v1/");
        std::env::set_var("APPWRITE_PROJECT_ID", "proj");
        std::env::set_var("APPWRITE_DATABASE_ID", "db");
        std::env::set_var("APPWRITE_STORAGE_ID", "media");
        std::env::set_var("APPWRITE_USER_COLLECTION_ID", "users-col");
        std::env::set_var("APPWRITE_POST_COLLECTION_ID", "posts-col");
        std::env::set_var("APPWRITE_SAVES_COLLECTION_ID", "saves-col");

        let config = PlatformConfig::from_env().unwrap();
        assert_eq!(config.endpoint, "https://platform.test/v1");
        assert_eq!(config.collection_id(Collection::Saves), "saves-col");
        assert_eq!(config.request_timeout_secs, 30);

        for var in [
            "APPWRITE_URL",
            "APPWRITE_PROJECT_ID",
            "APPWRITE_DATABASE_ID",
            "APPWRITE_STORAGE_ID",
            "APPWRITE_USER_COLLECTION_ID",
            "APPWRITE_POST_COLLECTION_ID",
            "APPWRITE_SAVES_COLLECTION_ID",
        ] {
            std::env::remove_var(var);
        }
    }
}
