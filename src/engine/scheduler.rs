// ABOUTME: Dependency-driven scheduler that runs an accepted plan to completion
// ABOUTME: Dispatches ready tasks concurrently, propagates failures as skips and persists every transition

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use super::dispatch::{Completion, Dispatcher};
use super::error::{EngineError, Result};
use super::gateway::{TaskExecutor, TaskRequest};
use super::progress::{ProgressSink, ProgressSnapshot};
use super::result::{OverallStatus, TaskOutcome, TaskStatus};
use crate::config::Config;
use crate::plan::{validate as validate_plan, DependencyGraph, Plan, Task};
use crate::session::{SessionState, StateStore};
use crate::synthesis::{self, ArtifactResolver, FsArtifactResolver, DEFAULT_SYNTHESIS_TASK_ID};

/// Summary returned once a run finishes
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub session_id: String,
    pub overall_status: OverallStatus,
    pub final_result: Option<String>,
}

impl ExecutionReport {
    fn from_state(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            overall_status: state.overall_status,
            final_result: state.final_result.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.overall_status == OverallStatus::Completed
    }
}

pub struct Scheduler {
    store: Arc<dyn StateStore>,
    executor: Arc<dyn TaskExecutor>,
    resolver: Arc<dyn ArtifactResolver>,
    harvest_window: Duration,
    max_concurrent_tasks: Option<usize>,
    synthesis_task_id: String,
}

impl Scheduler {
    pub fn new(store: Arc<dyn StateStore>, executor: Arc<dyn TaskExecutor>) -> Self {
        let defaults = Config::default();
        Self {
            store,
            executor,
            resolver: Arc::new(FsArtifactResolver::new(defaults.artifacts.root)),
            harvest_window: defaults.engine.harvest_window,
            max_concurrent_tasks: None,
            synthesis_task_id: DEFAULT_SYNTHESIS_TASK_ID.to_string(),
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn StateStore>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        let resolver = FsArtifactResolver::new(config.artifacts.root.clone());

        Self::new(store, executor)
            .with_harvest_window(config.engine.harvest_window)
            .with_synthesis_task_id(config.engine.synthesis_task_id.clone())
            .with_artifact_resolver(Arc::new(resolver))
            .with_max_concurrent_tasks(config.engine.max_concurrent_tasks)
    }

    /// Set how long a dispatched task may run before it is failed
    pub fn with_harvest_window(mut self, window: Duration) -> Self {
        self.harvest_window = window;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_tasks = limit.map(|n| n.max(1));
        self
    }

    pub fn with_synthesis_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.synthesis_task_id = task_id.into();
        self
    }

    pub fn with_artifact_resolver(mut self, resolver: Arc<dyn ArtifactResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Run the accepted plan of `session_id` until every task is terminal.
    ///
    /// Safe to call again after an interruption: completed work is kept and
    /// tasks caught mid-flight are re-run. Calling it on a finished session
    /// returns the stored result without dispatching anything.
    #[instrument(skip(self, progress), fields(harvest_window = ?self.harvest_window))]
    pub async fn execute(
        &self,
        session_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ExecutionReport> {
        let state = self.store.load(session_id).await?;

        let plan = match (&state.plan, state.accepted) {
            (Some(plan), true) => plan.clone(),
            _ => {
                error!("Session {} has no accepted plan", session_id);
                return Err(EngineError::PlanNotAccepted {
                    session_id: session_id.to_string(),
                });
            }
        };

        if state.overall_status.is_terminal() {
            info!(
                "Session {} already finished with status {}, nothing to execute",
                session_id, state.overall_status
            );
            return Ok(ExecutionReport::from_state(&state));
        }

        if let Err(errors) = validate_plan(&plan) {
            let reason = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            error!("Refusing to execute invalid plan: {}", reason);
            return Err(EngineError::InvalidPlan { reason });
        }

        let mut run = Run {
            scheduler: self,
            plan: &plan,
            graph: DependencyGraph::from_plan(&plan),
            state,
            progress,
        };
        run.drive().await
    }
}

/// Mutable state of one scheduler run; only the driving loop touches it
struct Run<'a> {
    scheduler: &'a Scheduler,
    plan: &'a Plan,
    graph: DependencyGraph,
    state: SessionState,
    progress: &'a dyn ProgressSink,
}

impl<'a> Run<'a> {
    async fn drive(&mut self) -> Result<ExecutionReport> {
        self.resume();

        let start_message = format!(
            "Starting workflow execution for session {} with {} tasks.",
            self.state.session_id,
            self.plan.len()
        );
        info!("{}", start_message);
        debug!("Root tasks: {:?}", self.graph.get_root_tasks());
        self.state.overall_status = OverallStatus::InProgress;
        self.state.log(start_message.clone());
        self.commit(&start_message).await;

        let mut dispatcher = Dispatcher::new(
            Arc::clone(&self.scheduler.executor),
            self.scheduler.harvest_window,
        );
        let mut stalled = None;

        while !self.all_terminal() {
            let (ready, skipped) = self.readiness_pass(dispatcher.in_flight()).await;

            if ready.is_empty() && skipped == 0 && dispatcher.is_idle() {
                stalled = Some(self.fail_stalled().await);
                break;
            }

            for task in ready {
                dispatcher.dispatch(TaskRequest::from_state(task, &self.state));
            }

            if !dispatcher.is_idle() {
                for completion in dispatcher.harvest().await {
                    self.record(completion).await;
                }
            }
        }

        self.finish().await;

        match stalled {
            Some(pending) => Err(EngineError::Stall { pending }),
            None => Ok(ExecutionReport::from_state(&self.state)),
        }
    }

    /// Reset tasks interrupted by a previous run and fill in missing statuses
    fn resume(&mut self) {
        let plan = self.plan;
        for task in &plan.tasks {
            match self.state.task_status.get(&task.id).copied() {
                Some(TaskStatus::Running) => {
                    warn!("Task {} was running when interrupted, resetting to pending", task.id);
                    self.state.set_status(&task.id, TaskStatus::Pending);
                    self.state.log(format!(
                        "Resetting interrupted task: {} (ID: {})",
                        task.title, task.id
                    ));
                }
                None => self.state.set_status(&task.id, TaskStatus::Pending),
                Some(_) => {}
            }
        }

        let completed = self.state.count_with_status(TaskStatus::Completed);
        if completed > 0 {
            info!("Resuming with {} tasks already completed", completed);
        }
    }

    fn all_terminal(&self) -> bool {
        self.plan
            .tasks
            .iter()
            .all(|task| self.state.status_of(&task.id).is_terminal())
    }

    /// Walk pending tasks in plan order, marking ready tasks running and
    /// doomed tasks skipped. Returns the newly running tasks and the skip count.
    async fn readiness_pass(&mut self, in_flight: usize) -> (Vec<&'a Task>, usize) {
        let plan = self.plan;
        let mut ready = Vec::new();
        let mut skipped = 0;

        for task in &plan.tasks {
            if self.state.status_of(&task.id) != TaskStatus::Pending {
                continue;
            }

            let dependency_statuses: Vec<TaskStatus> = task
                .dependencies
                .iter()
                .map(|dep| self.state.status_of(dep))
                .collect();

            if dependency_statuses.iter().any(|s| s.is_failure()) {
                self.skip(task).await;
                skipped += 1;
            } else if dependency_statuses
                .iter()
                .all(|s| *s == TaskStatus::Completed)
            {
                if let Some(limit) = self.scheduler.max_concurrent_tasks {
                    if in_flight + ready.len() >= limit {
                        debug!("Concurrency limit reached, deferring task {}", task.id);
                        continue;
                    }
                }
                self.start(task).await;
                ready.push(task);
            }
        }

        (ready, skipped)
    }

    async fn start(&mut self, task: &Task) {
        info!(
            "Launching task {}: {} (Role: {})",
            task.id, task.title, task.role
        );
        self.state.set_status(&task.id, TaskStatus::Running);
        self.state
            .log(format!("Starting task: {} (ID: {})", task.title, task.id));
        self.commit(&format!("Starting task '{}'", task.title)).await;
    }

    async fn skip(&mut self, task: &Task) {
        warn!("Skipping task {} because a dependency failed", task.id);
        self.state.set_status(&task.id, TaskStatus::Skipped);
        self.state.log(format!(
            "Skipped task {} (ID: {}) due to failed dependency.",
            task.title, task.id
        ));
        self.commit(&format!("Task '{}' skipped", task.title)).await;
    }

    /// Nothing can make progress: fail every pending task
    async fn fail_stalled(&mut self) -> usize {
        let pending: Vec<String> = self
            .plan
            .tasks
            .iter()
            .filter(|task| self.state.status_of(&task.id) == TaskStatus::Pending)
            .map(|task| task.id.clone())
            .collect();

        let message = format!(
            "Workflow stalled: {} tasks pending but none are ready and no tasks running.",
            pending.len()
        );
        error!("{} Pending: {:?}", message, pending);

        for task_id in &pending {
            self.state.set_status(task_id, TaskStatus::Failed);
        }
        self.state.overall_status = OverallStatus::Failed;
        self.state.log(message.clone());
        self.commit(&message).await;

        pending.len()
    }

    async fn record(&mut self, completion: Completion) {
        let plan = self.plan;
        let Some(task) = plan.get_task(&completion.task_id) else {
            warn!("Received outcome for unknown task {}", completion.task_id);
            return;
        };

        match completion.outcome {
            TaskOutcome::Completed(output) => {
                info!("Task {} completed successfully", task.id);
                let message = format!("Completed task: {} (ID: {})", task.title, task.id);
                self.state.set_result(&task.id, output);
                self.state.set_status(&task.id, TaskStatus::Completed);
                self.state.log(message.clone());
                self.commit(&message).await;
            }
            TaskOutcome::Failed(reason) => {
                error!("Task {} failed: {}", task.id, reason);
                self.warn_downstream(task);
                self.state.set_status(&task.id, TaskStatus::Failed);
                self.state.log(format!(
                    "Failed task: {} (ID: {}) - Error: {}",
                    task.title, task.id, reason
                ));
                self.commit(&format!("Failed task '{}' - Error: {}", task.title, reason))
                    .await;
            }
            TaskOutcome::TimedOut => {
                error!("Task {} timed out", task.id);
                self.warn_downstream(task);
                self.state.set_status(&task.id, TaskStatus::Failed);
                self.state.log(format!(
                    "Failed task (timeout): {} (ID: {})",
                    task.title, task.id
                ));
                self.commit(&format!("Failed task '{}' (timeout)", task.title))
                    .await;
            }
        }
    }

    fn warn_downstream(&self, task: &Task) {
        let doomed = self.graph.transitive_dependents(&task.id);
        if !doomed.is_empty() {
            warn!(
                "{} downstream tasks of {} will be skipped: {:?}",
                doomed.len(),
                task.id,
                doomed
            );
        }
    }

    async fn finish(&mut self) {
        let any_failed = self
            .plan
            .tasks
            .iter()
            .any(|task| self.state.status_of(&task.id).is_failure());

        self.state.overall_status = if any_failed {
            OverallStatus::Failed
        } else {
            OverallStatus::Completed
        };

        let final_result = synthesis::synthesize(
            &self.state,
            &self.scheduler.synthesis_task_id,
            self.scheduler.resolver.as_ref(),
        )
        .await;
        self.state.final_result = Some(final_result);

        let message = if any_failed {
            format!("Workflow {} failed.", self.state.session_id)
        } else {
            format!("Workflow {} completed successfully.", self.state.session_id)
        };
        info!("{}", message);
        self.state.log(message.clone());
        self.commit(&message).await;
    }

    /// Persist the current state and notify the progress sink.
    ///
    /// A failed save is reported but does not stop the run.
    async fn commit(&self, message: &str) {
        if let Err(e) = self.scheduler.store.save(&self.state).await {
            warn!(
                "Failed to persist state for session {}: {}",
                self.state.session_id, e
            );
            let snapshot = ProgressSnapshot::from_state(&self.state);
            self.progress.notify(
                &format!("Warning: failed to persist workflow state: {}", e),
                &snapshot,
            );
        }

        let snapshot = ProgressSnapshot::from_state(&self.state);
        self.progress.notify(message, &snapshot);
    }
}
