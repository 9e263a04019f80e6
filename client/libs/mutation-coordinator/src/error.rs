//! Mutation errors

use remote_ops::RemoteError;
use session_gate::SessionError;
use snapgram_types::ValidationError;
use std::fmt;
use thiserror::Error;

pub type MutationResult<T> = Result<T, MutationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    /// Rejected by the form schema; no remote call was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Sign-in went through but the follow-up session check found no user
    #[error("Signed in but no session is established")]
    SessionNotEstablished,
}

impl MutationError {
    /// Message carried into the user-visible notification
    pub fn user_message(&self) -> String {
        match self {
            MutationError::Remote(e) => e.user_message(),
            MutationError::Session(SessionError::Check(e)) => e.user_message(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MutationError::Validation(_))
    }
}

/// Sign-up pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignUpStep {
    Validate,
    CreateAccount,
    CreateProfile,
    SignIn,
    CheckSession,
}

impl fmt::Display for SignUpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignUpStep::Validate => "validate",
            SignUpStep::CreateAccount => "create_account",
            SignUpStep::CreateProfile => "create_profile",
            SignUpStep::SignIn => "sign_in",
            SignUpStep::CheckSession => "check_session",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Sign-up failed at {step}: {source}")]
pub struct SignUpError {
    pub step: SignUpStep,
    #[source]
    pub source: MutationError,
}

impl SignUpError {
    pub fn new(step: SignUpStep, source: impl Into<MutationError>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }
}
