/// Remote operations facade - one method per platform call
use snapgram_types::{
    Account, AccountId, FileId, FileUpload, NewAccount, NewPost, NewUserProfile, Post, PostId,
    PostUpdate, Save, SaveId, Session, SignInCredentials, UploadedFile, User, UserId,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Collection;
use crate::documents::{
    decode_post, decode_posts, decode_save, decode_user, likes_data, new_post_data,
    post_update_data, save_data, user_profile_data,
};
use crate::error::{RemoteError, RemoteResult};
use crate::platform::{fields, DocumentQuery, Platform};

/// Size of the "recent posts" listing
pub const RECENT_POSTS_LIMIT: usize = 20;

#[derive(Clone)]
pub struct RemoteOps {
    platform: Arc<dyn Platform>,
}

impl RemoteOps {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    // ============= Identity =============

    /// First sign-up step: create the identity-provider account
    pub async fn create_account(&self, account: &NewAccount) -> RemoteResult<Account> {
        let id = AccountId::unique();
        let created = self.platform.create_account(&id, account).await?;
        info!(account_id = %created.id, "Account created");
        Ok(created)
    }

    /// Second sign-up step: profile document referencing the account
    pub async fn create_user_profile(&self, profile: &NewUserProfile) -> RemoteResult<User> {
        let id = UserId::unique();
        let doc = self
            .platform
            .create_document(Collection::Users, id.as_str(), user_profile_data(profile))
            .await?;
        decode_user(doc)
    }

    pub async fn sign_in(&self, credentials: &SignInCredentials) -> RemoteResult<Session> {
        let session = self.platform.create_email_session(credentials).await?;
        info!(account_id = %session.account_id, "Session created");
        Ok(session)
    }

    pub async fn sign_out(&self) -> RemoteResult<()> {
        self.platform.delete_current_session().await?;
        info!("Session deleted");
        Ok(())
    }

    /// Profile of the signed-in account, `None` when signed out or when the
    /// account has no profile document
    pub async fn get_current_user(&self) -> RemoteResult<Option<User>> {
        let account = match self.platform.get_account().await {
            Ok(account) => account,
            Err(RemoteError::Unauthorized(reason)) => {
                debug!(reason = %reason, "No active session");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let query = DocumentQuery::new().equal(fields::ACCOUNT_ID, account.id.as_str());
        let list = self
            .platform
            .list_documents(Collection::Users, &query)
            .await?;

        list.documents.into_iter().next().map(decode_user).transpose()
    }

    /// Initials avatar assigned to new profiles
    pub fn avatar_url_for(&self, name: &str) -> String {
        self.platform.avatar_initials_url(name)
    }

    // ============= Files =============

    pub async fn upload_file(&self, file: &FileUpload) -> RemoteResult<UploadedFile> {
        let id = FileId::unique();
        let uploaded = self.platform.create_file(&id, file).await?;
        debug!(file_id = %uploaded.id, size = uploaded.size_bytes, "File uploaded");
        Ok(uploaded)
    }

    pub async fn delete_file(&self, file_id: &FileId) -> RemoteResult<()> {
        self.platform.delete_file(file_id).await
    }

    pub fn file_preview_url(&self, file_id: &FileId) -> RemoteResult<String> {
        self.platform.file_preview_url(file_id)
    }

    /// Upload a binary and derive its preview URL. If no URL can be derived
    /// the binary is deleted again.
    async fn upload_with_preview(&self, file: &FileUpload) -> RemoteResult<(FileId, String)> {
        let uploaded = self.upload_file(file).await?;

        match self.file_preview_url(&uploaded.id) {
            Ok(url) => Ok((uploaded.id, url)),
            Err(cause) => Err(self.roll_back_upload(uploaded.id, cause).await),
        }
    }

    /// Compensating delete of a just-uploaded binary. Always yields the
    /// error to surface; a failed delete is only logged.
    async fn roll_back_upload(&self, file_id: FileId, cause: RemoteError) -> RemoteError {
        warn!(file_id = %file_id, error = %cause, "Write failed after upload, deleting file");

        if let Err(e) = self.platform.delete_file(&file_id).await {
            warn!(file_id = %file_id, error = %e, "Compensating file delete failed");
        }

        RemoteError::PartialWrite {
            file_id,
            cause: Box::new(cause),
        }
    }

    // ============= Posts =============

    /// Decode the document a successful write returned. The write is already
    /// stored, so an undecodable response is re-read instead of rolled back.
    async fn written_post(&self, post_id: &str, doc: serde_json::Value) -> RemoteResult<Post> {
        match decode_post(doc) {
            Ok(post) => Ok(post),
            Err(e) => {
                warn!(post_id, error = %e, "Undecodable write response, reading post back");
                let doc = self
                    .platform
                    .get_document(Collection::Posts, post_id)
                    .await?;
                decode_post(doc)
            }
        }
    }

    /// Upload the image, then write the post document. A failed document
    /// write deletes the uploaded image and fails the whole operation.
    pub async fn create_post(&self, post: &NewPost) -> RemoteResult<Post> {
        let (image_id, image_url) = self.upload_with_preview(&post.file).await?;

        let id = PostId::unique();
        let written = self
            .platform
            .create_document(
                Collection::Posts,
                id.as_str(),
                new_post_data(post, &image_id, &image_url),
            )
            .await;

        let doc = match written {
            Ok(doc) => doc,
            Err(cause) => return Err(self.roll_back_upload(image_id, cause).await),
        };

        let created = self.written_post(id.as_str(), doc).await?;
        info!(post_id = %created.id, image_id = %image_id, "Post created");
        Ok(created)
    }

    /// Rewrite a post's editable fields, optionally replacing its image
    pub async fn update_post(&self, update: &PostUpdate) -> RemoteResult<Post> {
        let new_image = match &update.file {
            Some(file) => Some(self.upload_with_preview(file).await?),
            None => None,
        };

        let (image_id, image_url) = match &new_image {
            Some((id, url)) => (id.clone(), url.clone()),
            None => (update.image_id.clone(), update.image_url.clone()),
        };

        let written = self
            .platform
            .update_document(
                Collection::Posts,
                update.post_id.as_str(),
                post_update_data(update, &image_id, &image_url),
            )
            .await;

        let doc = match (written, new_image) {
            (Ok(doc), _) => doc,
            (Err(cause), Some((uploaded_id, _))) => {
                return Err(self.roll_back_upload(uploaded_id, cause).await)
            }
            (Err(cause), None) => return Err(cause),
        };

        if update.has_new_file() && update.image_id != image_id {
            // The replaced image is garbage now; losing it is not an error
            if let Err(e) = self.platform.delete_file(&update.image_id).await {
                warn!(file_id = %update.image_id, error = %e, "Failed to delete replaced image");
            }
        }

        let updated = self.written_post(update.post_id.as_str(), doc).await?;
        info!(post_id = %updated.id, "Post updated");
        Ok(updated)
    }

    /// Delete a post's image, then its document
    pub async fn delete_post(&self, post_id: &PostId, image_id: &FileId) -> RemoteResult<()> {
        if post_id.is_empty() || image_id.is_empty() {
            return Err(RemoteError::Remote(
                "post id and image id are required".to_string(),
            ));
        }

        self.platform.delete_file(image_id).await?;
        self.platform
            .delete_document(Collection::Posts, post_id.as_str())
            .await?;

        info!(post_id = %post_id, "Post deleted");
        Ok(())
    }

    pub async fn get_post_by_id(&self, post_id: &PostId) -> RemoteResult<Post> {
        let doc = self
            .platform
            .get_document(Collection::Posts, post_id.as_str())
            .await?;
        decode_post(doc)
    }

    /// Newest posts by creation time
    pub async fn list_recent_posts(&self) -> RemoteResult<Vec<Post>> {
        let query = DocumentQuery::new()
            .order_desc(fields::CREATED_AT)
            .limit(RECENT_POSTS_LIMIT);
        let list = self
            .platform
            .list_documents(Collection::Posts, &query)
            .await?;
        decode_posts(list.documents)
    }

    /// One feed page by descending update time, starting after `cursor`
    pub async fn list_posts_page(
        &self,
        cursor: Option<&PostId>,
        page_size: usize,
    ) -> RemoteResult<Vec<Post>> {
        let mut query = DocumentQuery::new()
            .order_desc(fields::UPDATED_AT)
            .limit(page_size);
        if let Some(cursor) = cursor {
            query = query.cursor_after(cursor.as_str());
        }

        let list = self
            .platform
            .list_documents(Collection::Posts, &query)
            .await?;
        decode_posts(list.documents)
    }

    /// Full-text search on captions
    pub async fn search_posts(&self, term: &str) -> RemoteResult<Vec<Post>> {
        let query = DocumentQuery::new().search(fields::CAPTION, term);
        let list = self
            .platform
            .list_documents(Collection::Posts, &query)
            .await?;
        decode_posts(list.documents)
    }

    // ============= Likes & Saves =============

    /// Overwrite the post's likes list (last writer wins)
    pub async fn set_likes(&self, post_id: &PostId, likes: &[UserId]) -> RemoteResult<Post> {
        let doc = self
            .platform
            .update_document(Collection::Posts, post_id.as_str(), likes_data(likes))
            .await?;
        decode_post(doc)
    }

    pub async fn create_save(&self, user_id: &UserId, post_id: &PostId) -> RemoteResult<Save> {
        let id = SaveId::unique();
        let doc = self
            .platform
            .create_document(Collection::Saves, id.as_str(), save_data(user_id, post_id))
            .await?;
        decode_save(doc)
    }

    pub async fn delete_save(&self, save_id: &SaveId) -> RemoteResult<()> {
        self.platform
            .delete_document(Collection::Saves, save_id.as_str())
            .await
    }
}
