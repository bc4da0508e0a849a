// ABOUTME: Error types for session persistence and session lifecycle operations
// ABOUTME: Defines store failures and the precondition failures of plan acceptance

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("Invalid session id: '{session_id}'")]
    InvalidSessionId { session_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: String },

    #[error("Session {session_id} has no plan")]
    NoPlan { session_id: String },

    #[error("Invalid plan: {reason}")]
    InvalidPlan { reason: String },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for SessionError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { session_id } => SessionError::NotFound { session_id },
            other => SessionError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
