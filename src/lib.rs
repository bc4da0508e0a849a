// ABOUTME: Main library module for the planflow plan execution engine
// ABOUTME: Exports all core modules and provides the public API

pub mod config;
pub mod engine;
pub mod plan;
pub mod session;
pub mod synthesis;

// Re-export commonly used types
pub use config::{init_logging, Config};
pub use engine::{
    EngineError, ExecutionReport, ExecutorRegistry, OverallStatus, ProgressSink, ProgressSnapshot,
    Scheduler, TaskExecutor, TaskOutput, TaskRequest, TaskStatus,
};
pub use plan::{Plan, PlanValidator, Task};
pub use session::{
    accept_plan, attach_plan, create_session, load_session, FileStateStore, MemoryStateStore,
    SessionState, StateStore,
};
pub use synthesis::{ArtifactResolver, FsArtifactResolver};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
