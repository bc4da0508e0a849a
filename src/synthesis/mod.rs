// ABOUTME: Final result synthesis for finished sessions
// ABOUTME: Exports artifact resolution and the report builders

pub mod artifact;
pub mod report;

pub use artifact::{ArtifactError, ArtifactResolver, FsArtifactResolver};
pub use report::{fallback_report, synthesize, DEFAULT_SYNTHESIS_TASK_ID};
