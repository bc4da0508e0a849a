// ABOUTME: Per-session execution state persisted between scheduler runs
// ABOUTME: Holds the plan, per-task statuses and results, the update log and the final result

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::engine::result::{OverallStatus, TaskOutput, TaskStatus};
use crate::plan::Plan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    #[serde(default)]
    pub user_query: String,
    #[serde(default)]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub accepted: bool,
    #[serde(default)]
    pub task_status: IndexMap<String, TaskStatus>,
    #[serde(default)]
    pub task_result: IndexMap<String, TaskOutput>,
    #[serde(default)]
    pub overall_status: OverallStatus,
    #[serde(default)]
    pub update_log: Vec<String>,
    #[serde(default)]
    pub final_result: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            user_query: user_query.into(),
            plan: None,
            accepted: false,
            task_status: IndexMap::new(),
            task_result: IndexMap::new(),
            overall_status: OverallStatus::Pending,
            update_log: Vec::new(),
            final_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status of a task; tasks without a recorded status are pending
    pub fn status_of(&self, task_id: &str) -> TaskStatus {
        self.task_status
            .get(task_id)
            .copied()
            .unwrap_or(TaskStatus::Pending)
    }

    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) {
        self.task_status.insert(task_id.to_string(), status);
        self.touch();
    }

    pub fn set_result(&mut self, task_id: &str, output: TaskOutput) {
        self.task_result.insert(task_id.to_string(), output);
        self.touch();
    }

    /// Append a line to the update log
    pub fn log(&mut self, message: impl Into<String>) {
        self.update_log.push(message.into());
        self.touch();
    }

    /// Reset every task to pending and drop previous results
    pub fn reset_progress(&mut self) {
        self.task_status = self
            .plan
            .iter()
            .flat_map(|plan| plan.tasks.iter())
            .map(|task| (task.id.clone(), TaskStatus::Pending))
            .collect();
        self.task_result.clear();
        self.final_result = None;
        self.touch();
    }

    pub fn count_with_status(&self, status: TaskStatus) -> usize {
        self.task_status.values().filter(|s| **s == status).count()
    }

    pub fn is_finished(&self) -> bool {
        self.overall_status.is_terminal()
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
