//! Cache error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// Stored value has a different type than the one requested
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

pub type CacheResult<T> = Result<T, CacheError>;
