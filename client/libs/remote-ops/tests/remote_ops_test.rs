//! Remote operations against the in-memory platform

use async_trait::async_trait;
use remote_ops::{
    AccountApi, Collection, DocumentApi, DocumentList, DocumentQuery, InMemoryPlatform,
    PlatformCall, RemoteError, RemoteOps, RemoteResult, StorageApi,
};
use serde_json::Value;
use snapgram_types::{
    parse_tags, Account, AccountId, FileId, FileUpload, NewAccount, NewPost, NewUserProfile,
    PostId, PostUpdate, Session, SignInCredentials, UploadedFile, User, UserId,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn setup() -> (Arc<InMemoryPlatform>, RemoteOps) {
    let platform = Arc::new(InMemoryPlatform::new());
    let ops = RemoteOps::new(platform.clone());
    (platform, ops)
}

fn image(name: &str) -> FileUpload {
    FileUpload::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47])
}

fn new_post(caption: &str) -> NewPost {
    NewPost {
        creator: UserId::new("u1"),
        caption: caption.to_string(),
        location: Some("Paris".to_string()),
        tags: parse_tags("a, b ,c"),
        file: image("photo.png"),
    }
}

async fn signed_up_user(ops: &RemoteOps) -> User {
    let account = ops
        .create_account(&NewAccount {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap();
    let user = ops
        .create_user_profile(&NewUserProfile {
            account_id: account.id,
            name: "Ada Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            image_url: ops.avatar_url_for("Ada Lovelace"),
        })
        .await
        .unwrap();
    ops.sign_in(&SignInCredentials {
        email: "ada@example.com".to_string(),
        password: "correct-horse".to_string(),
    })
    .await
    .unwrap();
    user
}

#[tokio::test]
async fn test_create_post_stores_document_and_image() {
    let (platform, ops) = setup();

    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    assert_eq!(post.caption, "Hello world!!");
    assert_eq!(post.location.as_deref(), Some("Paris"));
    assert_eq!(post.tags, vec!["a", "b", "c"]);
    assert!(post.likes.is_empty());
    assert!(platform.has_file(&post.image_id));
    assert!(post.image_url.contains(post.image_id.as_str()));

    let recent = ops.list_recent_posts().await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, post.id);
}

#[tokio::test]
async fn test_create_post_compensates_failed_document_write() {
    let (platform, ops) = setup();
    platform.fail_next(PlatformCall::CreateDocument(Collection::Posts));

    let err = ops.create_post(&new_post("Hello world!!")).await.unwrap_err();

    match err {
        RemoteError::PartialWrite { file_id, cause } => {
            assert!(!platform.has_file(&file_id));
            assert!(matches!(*cause, RemoteError::Remote(_)));
        }
        other => panic!("expected partial write, got {:?}", other),
    }
    assert_eq!(platform.file_count(), 0);
    assert_eq!(platform.document_count(Collection::Posts), 0);
    assert_eq!(platform.call_count(PlatformCall::DeleteFile), 1);
}

#[tokio::test]
async fn test_create_post_compensates_missing_preview() {
    let (platform, ops) = setup();
    platform.fail_next(PlatformCall::PreviewUrl);

    let err = ops.create_post(&new_post("Hello world!!")).await.unwrap_err();

    assert!(matches!(err, RemoteError::PartialWrite { .. }));
    assert_eq!(platform.file_count(), 0);
    assert_eq!(
        platform.call_count(PlatformCall::CreateDocument(Collection::Posts)),
        0
    );
}

#[tokio::test]
async fn test_failed_compensation_keeps_original_error() {
    let (platform, ops) = setup();
    platform.fail_next(PlatformCall::CreateDocument(Collection::Posts));
    platform.fail_next(PlatformCall::DeleteFile);

    let err = ops.create_post(&new_post("Hello world!!")).await.unwrap_err();

    assert_eq!(err.user_message(), "injected failure: CreateDocument(Posts)");
}

#[tokio::test]
async fn test_failed_upload_writes_nothing() {
    let (platform, ops) = setup();
    platform.fail_next(PlatformCall::CreateFile);

    let err = ops.create_post(&new_post("Hello world!!")).await.unwrap_err();

    assert!(matches!(err, RemoteError::Remote(_)));
    assert_eq!(platform.document_count(Collection::Posts), 0);
    assert_eq!(platform.call_count(PlatformCall::DeleteFile), 0);
}

#[tokio::test]
async fn test_update_post_without_file_keeps_image() {
    let (platform, ops) = setup();
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    let updated = ops
        .update_post(&PostUpdate {
            post_id: post.id.clone(),
            caption: "Edited caption".to_string(),
            location: Some("Rome".to_string()),
            tags: parse_tags(""),
            image_id: post.image_id.clone(),
            image_url: post.image_url.clone(),
            file: None,
        })
        .await
        .unwrap();

    assert_eq!(updated.caption, "Edited caption");
    assert!(updated.tags.is_empty());
    assert_eq!(updated.image_id, post.image_id);
    assert!(platform.has_file(&post.image_id));
    assert!(updated.updated_at > post.updated_at);
}

#[tokio::test]
async fn test_update_post_with_file_replaces_image() {
    let (platform, ops) = setup();
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    let updated = ops
        .update_post(&PostUpdate {
            post_id: post.id.clone(),
            caption: post.caption.clone(),
            location: post.location.clone(),
            tags: post.tags.clone(),
            image_id: post.image_id.clone(),
            image_url: post.image_url.clone(),
            file: Some(image("new.png")),
        })
        .await
        .unwrap();

    assert_ne!(updated.image_id, post.image_id);
    assert!(platform.has_file(&updated.image_id));
    assert!(!platform.has_file(&post.image_id));
}

#[tokio::test]
async fn test_update_post_failure_deletes_new_upload_only() {
    let (platform, ops) = setup();
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();
    platform.fail_next(PlatformCall::UpdateDocument(Collection::Posts));

    let err = ops
        .update_post(&PostUpdate {
            post_id: post.id.clone(),
            caption: post.caption.clone(),
            location: post.location.clone(),
            tags: post.tags.clone(),
            image_id: post.image_id.clone(),
            image_url: post.image_url.clone(),
            file: Some(image("new.png")),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::PartialWrite { .. }));
    // The existing image survives, the new upload is gone
    assert!(platform.has_file(&post.image_id));
    assert_eq!(platform.file_count(), 1);
}

#[tokio::test]
async fn test_delete_post_requires_both_ids() {
    let (platform, ops) = setup();
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    assert_err!(ops.delete_post(&post.id, &FileId::new("")).await);
    assert_err!(ops.delete_post(&PostId::new(""), &post.image_id).await);
    assert_eq!(platform.document_count(Collection::Posts), 1);

    assert_ok!(ops.delete_post(&post.id, &post.image_id).await);
    assert_eq!(platform.document_count(Collection::Posts), 0);
    assert!(!platform.has_file(&post.image_id));
    assert!(ops.get_post_by_id(&post.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_posts_page_walks_by_update_time() {
    let (_platform, ops) = setup();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(ops.create_post(&new_post(&format!("post {}", i))).await.unwrap().id);
    }

    let first = ops.list_posts_page(None, 3).await.unwrap();
    let first_ids: Vec<_> = first.iter().map(|p| p.id.clone()).collect();
    assert_eq!(first_ids, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);

    let second = ops.list_posts_page(Some(&ids[2]), 3).await.unwrap();
    let second_ids: Vec<_> = second.iter().map(|p| p.id.clone()).collect();
    assert_eq!(second_ids, vec![ids[1].clone(), ids[0].clone()]);

    assert!(ops.list_posts_page(Some(&ids[0]), 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_posts_matches_caption() {
    let (_platform, ops) = setup();
    ops.create_post(&new_post("Sunset over the bay")).await.unwrap();
    ops.create_post(&new_post("Morning coffee")).await.unwrap();

    let found = ops.search_posts("sunset").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].caption, "Sunset over the bay");
}

#[tokio::test]
async fn test_set_likes_overwrites_list() {
    let (_platform, ops) = setup();
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    let likes = vec![UserId::new("u2"), UserId::new("u3")];
    let liked = ops.set_likes(&post.id, &likes).await.unwrap();
    assert_eq!(liked.likes, likes);

    let unliked = ops.set_likes(&post.id, &[]).await.unwrap();
    assert!(unliked.likes.is_empty());
}

#[tokio::test]
async fn test_current_user_none_without_session() {
    let (_platform, ops) = setup();
    assert_eq!(ops.get_current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_up_flow_and_saves() {
    let (platform, ops) = setup();
    let user = signed_up_user(&ops).await;
    assert!(user.image_url.contains("Ada%20Lovelace"));

    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();
    let save = ops.create_save(&user.id, &post.id).await.unwrap();

    let current = ops.get_current_user().await.unwrap().unwrap();
    assert_eq!(current.id, user.id);
    assert_eq!(current.save_for(&post.id).map(|s| &s.id), Some(&save.id));

    ops.delete_save(&save.id).await.unwrap();
    let current = ops.get_current_user().await.unwrap().unwrap();
    assert!(current.save_for(&post.id).is_none());

    ops.sign_out().await.unwrap();
    assert!(!platform.has_session());
    assert_eq!(ops.get_current_user().await.unwrap(), None);
}

#[tokio::test]
async fn test_sign_in_with_wrong_password_is_unauthorized() {
    let (_platform, ops) = setup();
    signed_up_user(&ops).await;

    let err = ops
        .sign_in(&SignInCredentials {
            email: "ada@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized(_)));
}

/// Platform whose post write responses come back without `imageUrl`.
/// With `strip_reads` the same happens to post reads.
struct StrippedResponses {
    inner: Arc<InMemoryPlatform>,
    strip_reads: bool,
}

fn strip_image_url(collection: Collection, mut doc: Value) -> Value {
    if collection == Collection::Posts {
        if let Some(map) = doc.as_object_mut() {
            map.remove("imageUrl");
        }
    }
    doc
}

#[async_trait]
impl AccountApi for StrippedResponses {
    async fn create_account(&self, id: &AccountId, account: &NewAccount) -> RemoteResult<Account> {
        self.inner.create_account(id, account).await
    }

    async fn create_email_session(
        &self,
        credentials: &SignInCredentials,
    ) -> RemoteResult<Session> {
        self.inner.create_email_session(credentials).await
    }

    async fn get_account(&self) -> RemoteResult<Account> {
        self.inner.get_account().await
    }

    async fn delete_current_session(&self) -> RemoteResult<()> {
        self.inner.delete_current_session().await
    }

    fn avatar_initials_url(&self, name: &str) -> String {
        self.inner.avatar_initials_url(name)
    }
}

#[async_trait]
impl DocumentApi for StrippedResponses {
    async fn create_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        let doc = self
            .inner
            .create_document(collection, document_id, data)
            .await?;
        Ok(strip_image_url(collection, doc))
    }

    async fn update_document(
        &self,
        collection: Collection,
        document_id: &str,
        data: Value,
    ) -> RemoteResult<Value> {
        let doc = self
            .inner
            .update_document(collection, document_id, data)
            .await?;
        Ok(strip_image_url(collection, doc))
    }

    async fn get_document(&self, collection: Collection, document_id: &str) -> RemoteResult<Value> {
        let doc = self.inner.get_document(collection, document_id).await?;
        if self.strip_reads {
            return Ok(strip_image_url(collection, doc));
        }
        Ok(doc)
    }

    async fn delete_document(&self, collection: Collection, document_id: &str) -> RemoteResult<()> {
        self.inner.delete_document(collection, document_id).await
    }

    async fn list_documents(
        &self,
        collection: Collection,
        query: &DocumentQuery,
    ) -> RemoteResult<DocumentList> {
        self.inner.list_documents(collection, query).await
    }
}

#[async_trait]
impl StorageApi for StrippedResponses {
    async fn create_file(&self, file_id: &FileId, file: &FileUpload) -> RemoteResult<UploadedFile> {
        self.inner.create_file(file_id, file).await
    }

    async fn delete_file(&self, file_id: &FileId) -> RemoteResult<()> {
        self.inner.delete_file(file_id).await
    }

    fn file_preview_url(&self, file_id: &FileId) -> RemoteResult<String> {
        self.inner.file_preview_url(file_id)
    }
}

fn stripped(strip_reads: bool) -> (Arc<InMemoryPlatform>, RemoteOps) {
    let inner = Arc::new(InMemoryPlatform::new());
    let ops = RemoteOps::new(Arc::new(StrippedResponses {
        inner: inner.clone(),
        strip_reads,
    }));
    (inner, ops)
}

#[tokio::test]
async fn test_undecodable_create_response_reads_post_back() {
    let (platform, ops) = stripped(false);

    let post = assert_ok!(ops.create_post(&new_post("Hello world!!")).await);

    assert!(platform.has_file(&post.image_id));
    assert!(post.image_url.contains(post.image_id.as_str()));
    assert_eq!(platform.document_count(Collection::Posts), 1);
    assert_eq!(platform.call_count(PlatformCall::DeleteFile), 0);
    assert_eq!(
        platform.call_count(PlatformCall::GetDocument(Collection::Posts)),
        1
    );
}

#[tokio::test]
async fn test_stored_post_keeps_image_when_response_stays_undecodable() {
    let (platform, ops) = stripped(true);

    let err = assert_err!(ops.create_post(&new_post("Hello world!!")).await);

    // Stored document still points at a live image
    assert!(matches!(err, RemoteError::InvalidResponse(_)));
    assert_eq!(platform.document_count(Collection::Posts), 1);
    assert_eq!(platform.file_count(), 1);
    assert_eq!(platform.call_count(PlatformCall::DeleteFile), 0);
}

#[tokio::test]
async fn test_undecodable_update_response_keeps_new_image() {
    let (platform, ops) = stripped(false);
    let post = ops.create_post(&new_post("Hello world!!")).await.unwrap();

    let updated = assert_ok!(
        ops.update_post(&PostUpdate {
            post_id: post.id.clone(),
            caption: post.caption.clone(),
            location: post.location.clone(),
            tags: post.tags.clone(),
            image_id: post.image_id.clone(),
            image_url: post.image_url.clone(),
            file: Some(image("new.png")),
        })
        .await
    );

    assert_ne!(updated.image_id, post.image_id);
    assert!(platform.has_file(&updated.image_id));
    assert!(!platform.has_file(&post.image_id));
    assert_eq!(platform.file_count(), 1);
}
