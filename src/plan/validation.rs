// ABOUTME: Structural validation for plans before and during execution
// ABOUTME: Checks task ids, dependency references, self-dependencies and optionally cycles

use std::collections::HashSet;

use super::error::ValidationError;
use super::graph::DependencyGraph;
use super::model::Plan;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlanValidator {
    detect_cycles: bool,
}

impl PlanValidator {
    /// Validator performing the basic structural checks only
    pub fn new() -> Self {
        Self {
            detect_cycles: false,
        }
    }

    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    /// Validate a plan, collecting every violation
    pub fn validate(&self, plan: &Plan) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.validate_task_ids(plan, &mut report);
        self.validate_dependencies(plan, &mut report);

        // A cycle check over a graph with broken references would be noise
        if self.detect_cycles && report.errors.is_empty() {
            if let Err(tasks) = DependencyGraph::from_plan(plan).topological_order() {
                report
                    .errors
                    .push(ValidationError::CircularDependency { tasks });
            }
        }

        report.is_valid = report.errors.is_empty();
        report
    }

    fn validate_task_ids(&self, plan: &Plan, report: &mut ValidationReport) {
        let mut seen = HashSet::new();

        for (position, task) in plan.tasks.iter().enumerate() {
            if task.id.is_empty() {
                report
                    .errors
                    .push(ValidationError::EmptyTaskId { position });
                continue;
            }

            if !seen.insert(task.id.as_str()) {
                report.errors.push(ValidationError::DuplicateTask {
                    task: task.id.clone(),
                });
            }
        }
    }

    fn validate_dependencies(&self, plan: &Plan, report: &mut ValidationReport) {
        let task_ids: HashSet<&str> = plan.tasks.iter().map(|t| t.id.as_str()).collect();

        for task in &plan.tasks {
            for dep in &task.dependencies {
                if dep == &task.id {
                    report.errors.push(ValidationError::SelfDependency {
                        task: task.id.clone(),
                    });
                } else if !task_ids.contains(dep.as_str()) {
                    report.errors.push(ValidationError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
    }
}

impl ValidationReport {
    /// Convert into a `Result`, keeping the violations on failure
    pub fn into_result(self) -> Result<(), Vec<ValidationError>> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Basic structural validation: ids present and unique, dependencies known, no self-dependency
pub fn validate(plan: &Plan) -> Result<(), Vec<ValidationError>> {
    PlanValidator::new().validate(plan).into_result()
}
