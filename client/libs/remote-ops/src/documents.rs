//! Wire shape of platform documents
//!
//! Relationship attributes come back either as bare ids or as embedded
//! documents carrying `$id`; both decode to ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use snapgram_types::{
    AccountId, FileId, NewPost, NewUserProfile, Post, PostId, PostUpdate, Save, SaveId, User,
    UserId,
};

use crate::error::{RemoteError, RemoteResult};

fn relation_id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("$id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn relation_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Value::deserialize(deserializer)?;
    relation_id_of(&value)
        .map(T::from)
        .ok_or_else(|| serde::de::Error::custom("relationship is neither an id nor a document"))
}

fn relation_ids<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let value = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(value
        .unwrap_or_default()
        .iter()
        .filter_map(relation_id_of)
        .map(T::from)
        .collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDocument {
    #[serde(rename = "$id")]
    id: PostId,
    #[serde(deserialize_with = "relation_id")]
    creator: UserId,
    caption: String,
    image_id: FileId,
    image_url: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "relation_ids")]
    likes: Vec<UserId>,
    #[serde(rename = "$createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SaveDocument {
    #[serde(rename = "$id")]
    id: SaveId,
    #[serde(deserialize_with = "relation_id")]
    user: UserId,
    #[serde(deserialize_with = "relation_id")]
    post: PostId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "$id")]
    id: UserId,
    account_id: AccountId,
    name: String,
    #[serde(default)]
    username: Option<String>,
    email: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default)]
    save: Option<Vec<Value>>,
}

pub(crate) fn decode_post(doc: Value) -> RemoteResult<Post> {
    let doc: PostDocument = serde_json::from_value(doc)?;
    Ok(Post {
        id: doc.id,
        creator: doc.creator,
        caption: doc.caption,
        image_id: doc.image_id,
        image_url: doc.image_url,
        location: doc.location,
        tags: doc.tags.unwrap_or_default(),
        likes: doc.likes,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}

pub(crate) fn decode_posts(docs: Vec<Value>) -> RemoteResult<Vec<Post>> {
    docs.into_iter().map(decode_post).collect()
}

pub(crate) fn decode_save(doc: Value) -> RemoteResult<Save> {
    let doc: SaveDocument = serde_json::from_value(doc)?;
    Ok(Save {
        id: doc.id,
        user: doc.user,
        post: doc.post,
    })
}

pub(crate) fn decode_user(doc: Value) -> RemoteResult<User> {
    let doc: UserDocument = serde_json::from_value(doc)?;
    let user_id = doc.id.clone();

    let saves = doc
        .save
        .unwrap_or_default()
        .into_iter()
        .map(|mut save| {
            // Saves embedded in a user document may omit the back-reference
            if let Value::Object(map) = &mut save {
                map.entry("user")
                    .or_insert_with(|| Value::String(user_id.to_string()));
            }
            decode_save(save)
        })
        .collect::<RemoteResult<Vec<_>>>()?;

    Ok(User {
        id: doc.id,
        account_id: doc.account_id,
        name: doc.name,
        username: doc.username.unwrap_or_default(),
        email: doc.email,
        image_url: doc.image_url.unwrap_or_default(),
        bio: doc.bio,
        saves,
    })
}

pub(crate) fn user_profile_data(profile: &NewUserProfile) -> Value {
    json!({
        "accountId": profile.account_id,
        "email": profile.email,
        "name": profile.name,
        "imageUrl": profile.image_url,
        "username": profile.username,
    })
}

pub(crate) fn new_post_data(post: &NewPost, image_id: &FileId, image_url: &str) -> Value {
    json!({
        "creator": post.creator,
        "caption": post.caption,
        "imageUrl": image_url,
        "imageId": image_id,
        "location": post.location,
        "tags": post.tags,
    })
}

pub(crate) fn post_update_data(update: &PostUpdate, image_id: &FileId, image_url: &str) -> Value {
    json!({
        "caption": update.caption,
        "imageUrl": image_url,
        "imageId": image_id,
        "location": update.location,
        "tags": update.tags,
    })
}

pub(crate) fn likes_data(likes: &[UserId]) -> Value {
    json!({ "likes": likes })
}

pub(crate) fn save_data(user_id: &UserId, post_id: &PostId) -> Value {
    json!({ "user": user_id, "post": post_id })
}

pub(crate) fn invalid(what: &str, err: impl std::fmt::Display) -> RemoteError {
    RemoteError::InvalidResponse(format!("{}: {}", what, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_post_with_embedded_relations() {
        let doc = json!({
            "$id": "p1",
            "$createdAt": "2024-03-01T10:00:00.000+00:00",
            "$updatedAt": "2024-03-02T10:00:00.000+00:00",
            "creator": { "$id": "u1", "name": "Ada" },
            "caption": "Hello world!!",
            "imageId": "f1",
            "imageUrl": "https://cdn.test/f1",
            "location": "Paris",
            "tags": ["a", "b"],
            "likes": [{ "$id": "u2" }, "u3"]
        });

        let post = decode_post(doc).unwrap();
        assert_eq!(post.creator, UserId::new("u1"));
        assert_eq!(post.likes, vec![UserId::new("u2"), UserId::new("u3")]);
        assert_eq!(post.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_decode_post_null_arrays() {
        let doc = json!({
            "$id": "p1",
            "$createdAt": "2024-03-01T10:00:00Z",
            "$updatedAt": "2024-03-01T10:00:00Z",
            "creator": "u1",
            "caption": "caption",
            "imageId": "f1",
            "imageUrl": "https://cdn.test/f1",
            "tags": null,
            "likes": null
        });

        let post = decode_post(doc).unwrap();
        assert!(post.likes.is_empty());
        assert!(post.tags.is_empty());
    }

    #[test]
    fn test_decode_user_with_embedded_saves() {
        let doc = json!({
            "$id": "u1",
            "accountId": "a1",
            "name": "Ada",
            "username": "ada",
            "email": "ada@example.com",
            "imageUrl": "https://cdn.test/avatar",
            "save": [{ "$id": "s1", "post": { "$id": "p1" } }]
        });

        let user = decode_user(doc).unwrap();
        assert_eq!(user.saves.len(), 1);
        assert_eq!(user.saves[0].user, UserId::new("u1"));
        assert_eq!(user.saves[0].post, PostId::new("p1"));
    }

    #[test]
    fn test_decode_post_rejects_bad_creator() {
        let doc = json!({
            "$id": "p1",
            "$createdAt": "2024-03-01T10:00:00Z",
            "$updatedAt": "2024-03-01T10:00:00Z",
            "creator": 42,
            "caption": "caption",
            "imageId": "f1",
            "imageUrl": "https://cdn.test/f1"
        });

        assert!(matches!(
            decode_post(doc),
            Err(RemoteError::InvalidResponse(_))
        ));
    }
}
