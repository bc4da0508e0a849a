// ABOUTME: Task and session status types plus task output representations
// ABOUTME: Defines the opaque task result, artifact references and per-task outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    #[default]
    Pending,
    PlanCreated,
    Accepted,
    InProgress,
    Completed,
    Failed,
}

/// Opaque result of a task: inline text or a pointer to externally stored content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Text(String),
    Artifact(ArtifactRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    FileArtifact,
}

/// How a dispatched task ended, as seen by the scheduler
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Completed(TaskOutput),
    Failed(String),
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Skipped
        )
    }

    /// Failed and skipped both doom dependents
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed | TaskStatus::Skipped)
    }
}

impl OverallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OverallStatus::Completed | OverallStatus::Failed)
    }
}

impl TaskOutput {
    pub fn text(content: impl Into<String>) -> Self {
        TaskOutput::Text(content.into())
    }

    pub fn artifact(filename: impl Into<String>) -> Self {
        TaskOutput::Artifact(ArtifactRef {
            kind: ArtifactKind::FileArtifact,
            filename: filename.into(),
        })
    }

    pub fn as_artifact(&self) -> Option<&ArtifactRef> {
        match self {
            TaskOutput::Artifact(reference) => Some(reference),
            TaskOutput::Text(_) => None,
        }
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutput::Text(text) => write!(f, "{}", text),
            TaskOutput::Artifact(reference) => write!(f, "[file artifact: {}]", reference.filename),
        }
    }
}

impl From<String> for TaskOutput {
    fn from(content: String) -> Self {
        TaskOutput::Text(content)
    }
}

impl From<&str> for TaskOutput {
    fn from(content: &str) -> Self {
        TaskOutput::Text(content.to_string())
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Pending => write!(f, "pending"),
            OverallStatus::PlanCreated => write!(f, "plan_created"),
            OverallStatus::Accepted => write!(f, "accepted"),
            OverallStatus::InProgress => write!(f, "in_progress"),
            OverallStatus::Completed => write!(f, "completed"),
            OverallStatus::Failed => write!(f, "failed"),
        }
    }
}
