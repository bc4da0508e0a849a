// ABOUTME: Progress reporting hooks invoked on every scheduler state transition
// ABOUTME: Provides the ProgressSink trait and the state snapshot handed to it

use indexmap::IndexMap;

use super::result::{OverallStatus, TaskStatus};
use crate::session::SessionState;

/// Point-in-time view of a session passed to progress sinks
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub session_id: String,
    pub overall_status: OverallStatus,
    pub task_status: IndexMap<String, TaskStatus>,
    pub final_result: Option<String>,
}

impl ProgressSnapshot {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            overall_status: state.overall_status,
            task_status: state.task_status.clone(),
            final_result: state.final_result.clone(),
        }
    }
}

/// Receives a human-readable message and a snapshot after every transition.
///
/// Called from the scheduler loop, so implementations should return quickly.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, message: &str, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, &ProgressSnapshot) + Send + Sync,
{
    fn notify(&self, message: &str, snapshot: &ProgressSnapshot) {
        self(message, snapshot)
    }
}

/// Sink that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn notify(&self, _message: &str, _snapshot: &ProgressSnapshot) {}
}
