// ABOUTME: Final result assembly once the task graph is exhausted
// ABOUTME: Prefers the synthesis task's output and falls back to a plain-text status report

use std::fmt::Write as _;
use tracing::{info, warn};

use super::artifact::ArtifactResolver;
use crate::engine::result::{TaskOutput, TaskStatus};
use crate::session::SessionState;

pub const DEFAULT_SYNTHESIS_TASK_ID: &str = "synthesize_final_report";

/// Produce the session's final result text.
///
/// Uses the synthesis task's output when that task completed, otherwise the
/// fallback report. Artifact resolution problems become bracketed diagnostics.
pub async fn synthesize(
    state: &SessionState,
    synthesis_task_id: &str,
    resolver: &dyn ArtifactResolver,
) -> String {
    let synthesized = match state.task_result.get(synthesis_task_id) {
        Some(output) if state.status_of(synthesis_task_id) == TaskStatus::Completed => output,
        _ => {
            warn!(
                "Synthesis task '{}' result not available, generating basic summary",
                synthesis_task_id
            );
            return fallback_report(state);
        }
    };

    match synthesized {
        TaskOutput::Text(text) => text.clone(),
        TaskOutput::Artifact(reference) => match resolver.resolve(reference).await {
            Ok(content) => {
                info!(
                    "Read final result from artifact file '{}'",
                    reference.filename
                );
                content
            }
            Err(e) => {
                warn!("Could not resolve final report artifact: {}", e);
                format!("[{}]", e)
            }
        },
    }
}

/// Plain-text summary of every task's status and every recorded result
pub fn fallback_report(state: &SessionState) -> String {
    let tasks = state
        .plan
        .as_ref()
        .map(|plan| plan.tasks.as_slice())
        .unwrap_or_default();

    let mut report = String::from("Workflow Execution Summary:\n\nTask Statuses:\n");
    if tasks.is_empty() {
        report.push_str("(no tasks recorded)\n");
    }
    for task in tasks {
        let _ = writeln!(
            report,
            "- {} (ID: {}): {}",
            task.title,
            task.id,
            state.status_of(&task.id)
        );
    }

    report.push_str("\nCompleted Task Results:\n");
    if state.task_result.is_empty() {
        report.push_str("No task results were successfully recorded.\n");
    }
    for (task_id, result) in &state.task_result {
        let title = tasks
            .iter()
            .find(|t| &t.id == task_id)
            .map(|t| t.title.as_str())
            .unwrap_or(task_id.as_str());
        let _ = write!(
            report,
            "--- Result for '{}' (ID: {}) ---\n{}\n\n",
            title, task_id, result
        );
    }

    report
}
