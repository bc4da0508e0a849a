// ABOUTME: Error types for plan parsing and structural validation
// ABOUTME: Defines per-violation validation errors and the plan loading error

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Failed to read plan file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse plan JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse plan YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Task at position {position} has an empty id")]
    EmptyTaskId { position: usize },

    #[error("Duplicate task id: {task}")]
    DuplicateTask { task: String },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Task '{task}' depends on itself")]
    SelfDependency { task: String },

    #[error("Circular dependency detected in tasks: {tasks:?}")]
    CircularDependency { tasks: Vec<String> },
}

pub type Result<T> = std::result::Result<T, PlanError>;
