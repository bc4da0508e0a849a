// ABOUTME: Fan-out of ready tasks onto tokio tasks and fan-in of their outcomes
// ABOUTME: Tracks in-flight tasks with per-task deadlines and harvests completions over mpsc

use futures::FutureExt;
use indexmap::IndexMap;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use super::gateway::{TaskExecutor, TaskRequest};
use super::result::TaskOutcome;

/// Outcome of one dispatched task as delivered to the scheduler loop
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub task_id: String,
    pub outcome: TaskOutcome,
}

struct InFlightTask {
    handle: JoinHandle<()>,
    deadline: Instant,
}

/// Owns the completion channel and the set of in-flight tasks.
///
/// Only the scheduler loop touches this; executors report back solely
/// through the channel.
pub struct Dispatcher {
    executor: Arc<dyn TaskExecutor>,
    harvest_window: Duration,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: IndexMap<String, InFlightTask>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn TaskExecutor>, harvest_window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            executor,
            harvest_window,
            tx,
            rx,
            in_flight: IndexMap::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    pub fn is_in_flight(&self, task_id: &str) -> bool {
        self.in_flight.contains_key(task_id)
    }

    /// Spawn the executor for `request` on its own tokio task
    pub fn dispatch(&mut self, request: TaskRequest) {
        let task_id = request.task.id.clone();
        let executor = Arc::clone(&self.executor);
        let tx = self.tx.clone();
        let reported_id = task_id.clone();

        let handle = tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(executor.execute(&request))
                .catch_unwind()
                .await
            {
                Ok(Ok(output)) => TaskOutcome::Completed(output),
                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                Err(panic) => TaskOutcome::Failed(panic_message(panic)),
            };

            // Receiver gone means the run is over; nothing left to report to
            let _ = tx.send(Completion {
                task_id: reported_id,
                outcome,
            });
        });

        let deadline = Instant::now() + self.harvest_window;
        debug!(
            "Dispatched task {} with deadline in {:?}",
            task_id, self.harvest_window
        );
        self.in_flight
            .insert(task_id, InFlightTask { handle, deadline });
    }

    /// Wait for at least one in-flight task to finish or pass its deadline.
    ///
    /// Returns every completion available at that point plus a `TimedOut`
    /// entry for each task whose deadline has passed. Results for tasks no
    /// longer in flight are dropped.
    pub async fn harvest(&mut self) -> Vec<Completion> {
        let mut harvested = Vec::new();

        while harvested.is_empty() && !self.in_flight.is_empty() {
            let Some(deadline) = self.in_flight.values().map(|t| t.deadline).min() else {
                break;
            };

            let received = tokio::select! {
                received = self.rx.recv() => received,
                _ = sleep_until(deadline) => None,
            };
            if let Some(completion) = received {
                self.accept(completion, &mut harvested);
            }

            while let Ok(completion) = self.rx.try_recv() {
                self.accept(completion, &mut harvested);
            }

            self.expire(Instant::now(), &mut harvested);
        }

        harvested
    }

    fn accept(&mut self, completion: Completion, harvested: &mut Vec<Completion>) {
        if self.in_flight.shift_remove(&completion.task_id).is_some() {
            harvested.push(completion);
        } else {
            debug!(
                "Discarding late result for task {} that is no longer in flight",
                completion.task_id
            );
        }
    }

    fn expire(&mut self, now: Instant, harvested: &mut Vec<Completion>) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, task)| task.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for task_id in expired {
            if let Some(task) = self.in_flight.shift_remove(&task_id) {
                warn!(
                    "Task {} exceeded harvest window of {:?}, requesting cancellation",
                    task_id, self.harvest_window
                );
                task.handle.abort();
                harvested.push(Completion {
                    task_id,
                    outcome: TaskOutcome::TimedOut,
                });
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for (_, task) in self.in_flight.drain(..) {
            task.handle.abort();
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Task panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Task panicked: {}", message)
    } else {
        "Task panicked".to_string()
    }
}
