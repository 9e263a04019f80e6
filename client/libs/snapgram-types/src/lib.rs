//! Snapgram shared types
//!
//! Entities, identifiers and form schemas shared by every client crate:
//! - Platform-issued string identifiers (`UserId`, `PostId`, ...)
//! - Read-mostly projections of platform documents (`User`, `Post`, `Save`)
//! - Plain parameter objects for remote writes (`NewPost`, `PostUpdate`, ...)
//! - Client-side form validation (`SignUpForm`, `SignInForm`, `PostForm`)

mod ids;

pub mod forms;
pub mod models;
pub mod params;

pub use forms::{parse_tags, PostForm, SignInForm, SignUpForm, ValidationError};
pub use ids::{AccountId, FileId, PostId, SaveId, SessionId, UserId};
pub use models::{Account, Post, Save, Session, UploadedFile, User};
pub use params::{FileUpload, NewAccount, NewPost, NewUserProfile, PostUpdate, SignInCredentials};
