//! Remote operation errors

use snapgram_types::FileId;
use thiserror::Error;

pub type RemoteResult<T> = Result<T, RemoteError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    /// Id-addressed read had no match
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No active session on the platform
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transport or platform-side validation failure
    #[error("Remote error: {0}")]
    Remote(String),

    /// Binary uploaded but the dependent write failed; the binary has already
    /// been deleted again when this is returned
    #[error("Partial write rolled back (file {file_id}): {cause}")]
    PartialWrite {
        file_id: FileId,
        cause: Box<RemoteError>,
    },

    /// Platform response did not match the expected document shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemoteError {
    /// Message suitable for a user-facing notification
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::PartialWrite { cause, .. } => cause.user_message(),
            RemoteError::NotFound(msg)
            | RemoteError::Unauthorized(msg)
            | RemoteError::Remote(msg)
            | RemoteError::InvalidResponse(msg)
            | RemoteError::Config(msg) => msg.clone(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::InvalidResponse(err.to_string())
        } else {
            RemoteError::Remote(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::InvalidResponse(err.to_string())
    }
}
