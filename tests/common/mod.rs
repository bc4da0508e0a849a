// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides plan builders, a scripted executor, a recording progress sink and store wrappers

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use planflow::engine::{DependencyResult, GatewayError, ProgressSink, ProgressSnapshot};
use planflow::session::StoreError;
use planflow::{
    accept_plan, attach_plan, create_session, MemoryStateStore, Plan, SessionState, StateStore,
    Task, TaskExecutor, TaskOutput, TaskRequest,
};

pub struct TestPlanBuilder {
    tasks: Vec<Task>,
    summary: String,
}

impl TestPlanBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            summary: "test plan".to_string(),
        }
    }

    pub fn task(mut self, id: &str, depends_on: &[&str]) -> Self {
        self.tasks.push(
            Task::new(id, format!("Task {}", id), "worker")
                .with_description(format!("Do the work of {}", id))
                .depends_on(depends_on.iter().copied()),
        );
        self
    }

    pub fn task_with_role(mut self, id: &str, role: &str, depends_on: &[&str]) -> Self {
        self.tasks.push(
            Task::new(id, format!("Task {}", id), role).depends_on(depends_on.iter().copied()),
        );
        self
    }

    pub fn build(self) -> Plan {
        Plan::new(self.tasks, self.summary)
    }

    pub async fn write_json(self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.build())?;
        tokio::fs::write(path, json).await
    }
}

impl Default for TestPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a session, attach `plan` and accept it
pub async fn accepted_session(store: &dyn StateStore, query: &str, plan: Plan) -> String {
    let session_id = create_session(store, query).await.unwrap();
    attach_plan(store, &session_id, plan).await.unwrap();
    accept_plan(store, &session_id).await.unwrap();
    session_id
}

#[derive(Debug, Clone)]
pub enum Behavior {
    Succeed(TaskOutput),
    Fail(String),
    Delay(Duration, TaskOutput),
    Panic(String),
}

/// What an executor observed when a task was dispatched
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub task_id: String,
    pub dependency_results: Vec<(String, DependencyResult)>,
    pub user_query: String,
}

/// Executor whose per-task behaviour is set up front; everything else succeeds
#[derive(Default)]
pub struct ScriptedExecutor {
    behaviors: HashMap<String, Behavior>,
    dispatched: Mutex<Vec<DispatchRecord>>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, task_id: &str, output: TaskOutput) -> Self {
        self.behaviors
            .insert(task_id.to_string(), Behavior::Succeed(output));
        self
    }

    pub fn fail(mut self, task_id: &str, message: &str) -> Self {
        self.behaviors
            .insert(task_id.to_string(), Behavior::Fail(message.to_string()));
        self
    }

    pub fn delay(mut self, task_id: &str, delay: Duration) -> Self {
        let output = TaskOutput::text(format!("result of {}", task_id));
        self.behaviors
            .insert(task_id.to_string(), Behavior::Delay(delay, output));
        self
    }

    pub fn panic(mut self, task_id: &str, message: &str) -> Self {
        self.behaviors
            .insert(task_id.to_string(), Behavior::Panic(message.to_string()));
        self
    }

    pub fn dispatched(&self) -> Vec<DispatchRecord> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatched_ids(&self) -> Vec<String> {
        self.dispatched()
            .into_iter()
            .map(|record| record.task_id)
            .collect()
    }

    pub fn dispatch_count(&self, task_id: &str) -> usize {
        self.dispatched_ids()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, request: &TaskRequest) -> Result<TaskOutput, GatewayError> {
        self.dispatched.lock().unwrap().push(DispatchRecord {
            task_id: request.task.id.clone(),
            dependency_results: request
                .dependency_results
                .iter()
                .map(|(id, result)| (id.clone(), result.clone()))
                .collect(),
            user_query: request.user_query.clone(),
        });

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(now_running, Ordering::SeqCst);

        // Yield so sibling tasks get a chance to overlap
        tokio::time::sleep(Duration::from_millis(10)).await;

        let behavior = self.behaviors.get(&request.task.id).cloned();
        let result = match behavior {
            Some(Behavior::Succeed(output)) => Ok(output),
            Some(Behavior::Fail(message)) => Err(GatewayError::failed(message)),
            Some(Behavior::Delay(delay, output)) => {
                tokio::time::sleep(delay).await;
                Ok(output)
            }
            Some(Behavior::Panic(message)) => {
                self.running.fetch_sub(1, Ordering::SeqCst);
                panic!("{}", message);
            }
            None => Ok(TaskOutput::text(format!("result of {}", request.task.id))),
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Progress sink that keeps every notification
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(String, ProgressSnapshot)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(message, _)| message.clone())
            .collect()
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, snapshot)| snapshot.clone())
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn notify(&self, message: &str, snapshot: &ProgressSnapshot) {
        self.events
            .lock()
            .unwrap()
            .push((message.to_string(), snapshot.clone()));
    }
}

/// Memory store whose saves can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStateStore,
    fail_saves: AtomicBool,
    failed_saves: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn failed_saves(&self) -> usize {
        self.failed_saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn load(&self, session_id: &str) -> Result<SessionState, StoreError> {
        self.inner.load(session_id).await
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            self.failed_saves.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save(state).await
    }
}
