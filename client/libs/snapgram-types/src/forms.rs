//! Form schemas validated before any remote call
//!
//! Failures are reported per field so the presentation layer can render the
//! message inline next to the originating input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

use crate::ids::{FileId, PostId, UserId};
use crate::params::{FileUpload, NewAccount, NewPost, PostUpdate, SignInCredentials};

/// Client-side schema rejection, keyed by form field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation failed: {}", summary(.fields))]
pub struct ValidationError {
    pub fields: BTreeMap<String, Vec<String>>,
}

fn summary(fields: &BTreeMap<String, Vec<String>>) -> String {
    fields
        .iter()
        .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn field(field: &str, message: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.to_string()]);
        Self { fields }
    }

    /// First message for a field (what the form shows inline)
    pub fn message_for(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|messages| messages.first())
            .map(|m| m.as_str())
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        Self { fields }
    }
}

/// Normalize comma-separated tag text: whitespace removed, empty segments dropped
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|segment| segment.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: String,
    #[validate(length(min = 2, message = "Username must be at least 2 characters long"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

impl SignUpForm {
    pub fn check(&self) -> Result<NewAccount, ValidationError> {
        self.validate()?;
        Ok(NewAccount {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }

    pub fn credentials(&self) -> SignInCredentials {
        SignInCredentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for SignUpForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpForm")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

impl SignInForm {
    pub fn check(&self) -> Result<SignInCredentials, ValidationError> {
        self.validate()?;
        Ok(SignInCredentials {
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

impl std::fmt::Debug for SignInForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInForm")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Create/edit post form
#[derive(Debug, Clone, Validate)]
pub struct PostForm {
    #[validate(length(
        min = 5,
        max = 2200,
        message = "Caption must be between 5 and 2200 characters long"
    ))]
    pub caption: String,
    #[validate(length(
        min = 2,
        max = 100,
        message = "Location must be between 2 and 100 characters long"
    ))]
    pub location: String,
    /// Comma-separated tag text as typed
    pub tags: String,
    pub file: Option<FileUpload>,
}

impl PostForm {
    /// Validate for creation; a file is mandatory
    pub fn into_new_post(self, creator: UserId) -> Result<NewPost, ValidationError> {
        self.validate()?;
        let file = self
            .file
            .ok_or_else(|| ValidationError::field("file", "An image is required"))?;

        Ok(NewPost {
            creator,
            caption: self.caption,
            location: Some(self.location),
            tags: parse_tags(&self.tags),
            file,
        })
    }

    /// Validate for editing an existing post; without a file the current image is kept
    pub fn into_update(
        self,
        post_id: PostId,
        image_id: FileId,
        image_url: String,
    ) -> Result<PostUpdate, ValidationError> {
        self.validate()?;

        Ok(PostUpdate {
            post_id,
            caption: self.caption,
            location: Some(self.location),
            tags: parse_tags(&self.tags),
            image_id,
            image_url,
            file: self.file,
        })
    }
}
