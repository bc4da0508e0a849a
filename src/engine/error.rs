// ABOUTME: Error types for plan execution and task executor gateway calls
// ABOUTME: Separates run-aborting engine errors from per-task gateway failures

use thiserror::Error;

use crate::session::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid plan: {reason}")]
    InvalidPlan { reason: String },

    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Session {session_id} has no accepted plan")]
    PlanNotAccepted { session_id: String },

    #[error("Workflow stalled: {pending} tasks pending but none are ready and no tasks running")]
    Stall { pending: usize },

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { session_id } => EngineError::SessionNotFound { session_id },
            other => EngineError::Store(other),
        }
    }
}

/// Failure reported by a task executor; recovered as a failed task status.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("{0}")]
    Failed(String),

    #[error("Agent role '{role}' not found")]
    UnknownRole { role: String },
}

impl GatewayError {
    pub fn failed(message: impl Into<String>) -> Self {
        GatewayError::Failed(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
