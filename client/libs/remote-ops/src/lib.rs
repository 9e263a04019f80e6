//! Remote operations for the Snapgram client
//!
//! Typed facade over the hosted backend platform. Every remote interaction
//! of the client (identity, posts, likes, saves, files) goes through
//! [`RemoteOps`]; the platform itself sits behind the [`Platform`] traits so
//! the facade runs unchanged against the REST API or the in-memory double.
//!
//! Image-bearing writes are two-phase (upload, then document write). When
//! the second phase fails the uploaded binary is deleted again and the
//! operation fails with [`RemoteError::PartialWrite`].

pub mod config;
mod documents;
pub mod error;
pub mod http;
pub mod operations;
pub mod platform;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use config::{Collection, PlatformConfig, PreviewOptions};
pub use error::{RemoteError, RemoteResult};
pub use http::HttpPlatform;
pub use operations::{RemoteOps, RECENT_POSTS_LIMIT};
pub use platform::{
    fields, AccountApi, DocumentApi, DocumentList, DocumentQuery, Platform, QueryClause,
    StorageApi,
};

#[cfg(any(test, feature = "test-util"))]
pub use memory::{InMemoryPlatform, PlatformCall};
