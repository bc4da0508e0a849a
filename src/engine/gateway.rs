// ABOUTME: Task executor gateway: the delegate interface that performs the work of a task
// ABOUTME: Defines the request passed to executors, role-based dispatch and prompt rendering

use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use super::error::GatewayError;
use super::result::{TaskOutput, TaskStatus};
use crate::plan::Task;
use crate::session::SessionState;

pub const UNAVAILABLE_MARKER: &str = "[Not Available (likely failed or skipped)]";

/// Result of one dependency as handed to an executor.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyResult {
    Available(TaskOutput),
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub task: Task,
    /// One entry per dependency, in the task's dependency order
    pub dependency_results: IndexMap<String, DependencyResult>,
    pub user_query: String,
}

/// Performs the work described by a task.
///
/// Implementations run on their own tokio task and only report back through
/// the returned value; they never see session state.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, GatewayError>;
}

impl TaskRequest {
    /// Build the request for `task` from the scheduler's current view of the session
    pub fn from_state(task: &Task, state: &SessionState) -> Self {
        let dependency_results = task
            .dependencies
            .iter()
            .map(|dep_id| {
                let result = match (state.status_of(dep_id), state.task_result.get(dep_id)) {
                    (TaskStatus::Completed, Some(output)) => {
                        DependencyResult::Available(output.clone())
                    }
                    _ => DependencyResult::Unavailable,
                };
                (dep_id.clone(), result)
            })
            .collect();

        Self {
            task: task.clone(),
            dependency_results,
            user_query: state.user_query.clone(),
        }
    }

    pub fn available_results(&self) -> impl Iterator<Item = (&String, &TaskOutput)> {
        self.dependency_results
            .iter()
            .filter_map(|(id, result)| match result {
                DependencyResult::Available(output) => Some((id, output)),
                DependencyResult::Unavailable => None,
            })
    }

    /// Text prompt for language-model backed executors
    pub fn render_prompt(&self) -> String {
        let mut prompt = String::new();
        let query = if self.user_query.trim().is_empty() {
            "[Original query not available]"
        } else {
            self.user_query.as_str()
        };

        let _ = writeln!(prompt, "--- Original User Query ---\n{}\n", query);
        let _ = writeln!(
            prompt,
            "--- Current Task ---\nTitle: {}\nDescription: {}\n",
            self.task.title, self.task.description
        );

        if self.dependency_results.is_empty() {
            prompt.push_str(
                "This task has no dependencies. Execute your assigned task based on its \
                 description and the original user query.\n",
            );
            return prompt;
        }

        prompt.push_str("--- Relevant Information from Previous Tasks ---\n");
        prompt.push_str(
            "(Note: Results might be text summaries or filenames for content saved by previous steps)\n",
        );
        for (dep_id, result) in &self.dependency_results {
            match result {
                DependencyResult::Available(output) => {
                    let _ = writeln!(prompt, "Result from task '{}':\n{}\n---", dep_id, output);
                }
                DependencyResult::Unavailable => {
                    let _ = writeln!(
                        prompt,
                        "Result from task '{}': {}\n---",
                        dep_id, UNAVAILABLE_MARKER
                    );
                }
            }
        }
        prompt.push_str(
            "\nExecute your assigned task based on its description, the original user query, \
             and the provided context from previous tasks.\n",
        );

        prompt
    }
}

/// Routes each task to the executor registered for its role.
#[derive(Default, Clone)]
pub struct ExecutorRegistry {
    executors: HashMap<String, Arc<dyn TaskExecutor>>,
    fallback: Option<Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, role: impl Into<String>, executor: Arc<dyn TaskExecutor>) {
        self.executors.insert(role.into(), executor);
    }

    pub fn with_executor(mut self, role: impl Into<String>, executor: Arc<dyn TaskExecutor>) -> Self {
        self.register(role, executor);
        self
    }

    /// Executor used for roles without a dedicated registration
    pub fn with_fallback(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.fallback = Some(executor);
        self
    }

    pub fn get_executor(&self, role: &str) -> Option<&Arc<dyn TaskExecutor>> {
        self.executors.get(role).or(self.fallback.as_ref())
    }

    pub fn list_roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.executors.keys().map(|k| k.as_str()).collect();
        roles.sort_unstable();
        roles
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("roles", &self.list_roles())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

#[async_trait]
impl TaskExecutor for ExecutorRegistry {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, GatewayError> {
        let role = request.task.role.as_str();
        let executor = self
            .get_executor(role)
            .ok_or_else(|| GatewayError::UnknownRole {
                role: role.to_string(),
            })?;

        debug!("Routing task {} to executor for role '{}'", request.task.id, role);
        executor.execute(request).await
    }
}
