use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, FileId, PostId, SaveId, SessionId, UserId};

/// Identity-provider account, created by the first sign-up step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
}

/// Active session returned by a successful sign-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub account_id: AccountId,
    pub expires_at: Option<DateTime<Utc>>,
}

/// User profile - client-side projection of the profile document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub account_id: AccountId,
    pub name: String,
    pub username: String,
    pub email: String,
    /// Avatar image URL
    pub image_url: String,
    #[serde(default)]
    pub bio: Option<String>,
    /// Save records owned by this user
    #[serde(default)]
    pub saves: Vec<Save>,
}

impl User {
    /// Save record for a post, if the user bookmarked it
    pub fn save_for(&self, post_id: &PostId) -> Option<&Save> {
        self.saves.iter().find(|save| &save.post == post_id)
    }
}

/// Post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub creator: UserId,
    pub caption: String,
    pub image_id: FileId,
    pub image_url: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Users who liked the post, in like order. Rewritten wholesale on every
    /// toggle (last writer wins across clients).
    #[serde(default)]
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &UserId) -> bool {
        self.likes.contains(user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

/// Save entity - a user bookmarking a post
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Save {
    pub id: SaveId,
    pub user: UserId,
    pub post: PostId,
}

/// Binary stored on the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}
