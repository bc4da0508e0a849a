// ABOUTME: Task graph model for execution plans
// ABOUTME: Exports plan data structures, validation and the dependency graph

pub mod error;
pub mod graph;
pub mod model;
pub mod validation;

pub use error::{PlanError, ValidationError};
pub use graph::DependencyGraph;
pub use model::{Plan, Task};
pub use validation::{validate, PlanValidator, ValidationReport};
