// ABOUTME: Plan execution engine for planflow
// ABOUTME: Handles ready-set scheduling, concurrent task dispatch and progress reporting

pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod progress;
pub mod result;
pub mod scheduler;

pub use dispatch::{Completion, Dispatcher};
pub use error::{EngineError, GatewayError, Result};
pub use gateway::{DependencyResult, ExecutorRegistry, TaskExecutor, TaskRequest};
pub use progress::{NoopProgress, ProgressSink, ProgressSnapshot};
pub use result::{ArtifactKind, ArtifactRef, OverallStatus, TaskOutcome, TaskOutput, TaskStatus};
pub use scheduler::{ExecutionReport, Scheduler};
