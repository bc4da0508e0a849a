// ABOUTME: Core plan data structures produced by the plan-generation collaborator
// ABOUTME: Defines Task and Plan plus JSON/YAML loading helpers

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{PlanError, Result};

/// One schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(alias = "agent_role")]
    pub role: String,
}

/// The task graph for a single user request.
///
/// Task order is informational only; execution order is driven by the
/// dependency edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Plan {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub summary: String,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            dependencies: Vec::new(),
            role: role.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

impl Plan {
    pub fn new(tasks: Vec<Task>, summary: impl Into<String>) -> Self {
        Self {
            tasks,
            summary: summary.into(),
        }
    }

    /// Parse a plan from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(PlanError::JsonError)
    }

    /// Parse a plan from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(PlanError::YamlError)
    }

    /// Parse a plan file, choosing the format from the extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(PlanError::IoError)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.tasks.iter().map(|task| task.id.clone()).collect()
    }

    pub fn get_task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn has_task(&self, task_id: &str) -> bool {
        self.get_task(task_id).is_some()
    }

    /// Tasks that list `task_id` as a direct dependency
    pub fn get_dependent_tasks(&self, task_id: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|task| task.dependencies.iter().any(|dep| dep == task_id))
            .map(|task| task.id.clone())
            .collect()
    }
}
