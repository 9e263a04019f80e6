use remote_ops::RemoteError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session flag store error: {0}")]
    FlagStore(String),

    #[error("Session check failed: {0}")]
    Check(#[from] RemoteError),
}

pub type SessionResult<T> = Result<T, SessionError>;
