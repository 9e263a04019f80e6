//! Parameter objects for remote writes

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, FileId, PostId, UserId};

/// Binary selected by the user, not yet uploaded
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

// Keep file contents out of logs
impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Profile document written after the account exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUserProfile {
    pub account_id: AccountId,
    pub name: String,
    pub username: String,
    pub email: String,
    pub image_url: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SignInCredentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SignInCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub creator: UserId,
    pub caption: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub file: FileUpload,
}

/// Full replacement of a post's editable fields
#[derive(Debug, Clone)]
pub struct PostUpdate {
    pub post_id: PostId,
    pub caption: String,
    pub location: Option<String>,
    pub tags: Vec<String>,
    /// Current image, kept when no new file is given
    pub image_id: FileId,
    pub image_url: String,
    pub file: Option<FileUpload>,
}

impl PostUpdate {
    pub fn has_new_file(&self) -> bool {
        self.file.is_some()
    }
}
