//! Bounded fan-out of independent work items.
//!
//! # Design
//! - One semaphore per call sized `min(limit, items)`; a permit is taken before
//!   each item is spawned and released when it finishes, so no more items run
//!   at once than the pool allows.
//! - Every item is its own task in a `JoinSet`; a panic surfaces as a join
//!   error and becomes a result for that item only.
//! - Task ids map join results back to input positions, so attribution never
//!   depends on completion order.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

use crate::runner::{TASK_FAULT_EXIT_CODE, Task, TaskResult, TaskRunner};

/// Bounded-concurrency dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatcher {
    worker_limit: usize,
}

impl Dispatcher {
    /// Dispatcher running at most `worker_limit` items concurrently (minimum one).
    #[must_use]
    pub fn new(worker_limit: usize) -> Self {
        Self {
            worker_limit: worker_limit.max(1),
        }
    }

    /// Configured concurrency cap.
    #[must_use]
    pub const fn worker_limit(&self) -> usize {
        self.worker_limit
    }

    /// Workers started for `items` inputs: `min(limit, items)`, at least one.
    #[must_use]
    pub fn pool_size(&self, items: usize) -> usize {
        self.worker_limit.min(items).max(1)
    }

    /// Apply `work` to every item and return one result per item, in input order.
    ///
    /// `on_fault` builds the result for an item whose work panicked or was lost,
    /// given the item's index and a description of the fault.
    pub async fn map<I, R, F, Fut, E>(&self, items: Vec<I>, work: F, on_fault: E) -> Vec<R>
    where
        I: Send + 'static,
        R: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        E: Fn(usize, &str) -> R,
    {
        let total = items.len();
        let workers = self.pool_size(total);
        debug!(items = total, workers, "dispatching work items");

        let semaphore = Arc::new(Semaphore::new(workers));
        let work = Arc::new(work);
        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut positions = HashMap::with_capacity(total);
        let mut join_set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                slots[index] = Some(on_fault(index, "worker pool closed"));
                continue;
            };
            let work = Arc::clone(&work);
            let handle = join_set.spawn(async move {
                let result = (*work)(item).await;
                drop(permit);
                (index, result)
            });
            positions.insert(handle.id(), index);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_, (index, result))) => slots[index] = Some(result),
                Err(err) => match positions.get(&err.id()).copied() {
                    Some(index) => slots[index] = Some(on_fault(index, &describe_join_error(err))),
                    None => error!(error = %err, "work item stopped without a known position"),
                },
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| on_fault(index, "work item produced no result")))
            .collect()
    }

    /// Run every task of a stage through `runner` and collect its report.
    pub async fn dispatch(&self, runner: &TaskRunner, tasks: Vec<Task>) -> StageReport {
        let identities: Vec<String> = tasks.iter().map(|task| task.identity().to_string()).collect();
        let shared = runner.clone();
        let results = self
            .map(
                tasks,
                move |task: Task| {
                    let runner = shared.clone();
                    async move { runner.run(&task).await }
                },
                |index, detail| {
                    let identity = identities.get(index).cloned().unwrap_or_default();
                    error!(task = %identity, detail, "task faulted");
                    TaskResult::fault(identity, TASK_FAULT_EXIT_CODE, detail)
                },
            )
            .await;
        StageReport::new(runner.stage(), results)
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("task panicked: {}", panic_message(err.into_panic().as_ref()))
    } else {
        "task was cancelled".to_string()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Every result produced by one stage, in task order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    stage: String,
    results: Vec<TaskResult>,
}

impl StageReport {
    /// Report for `stage`.
    #[must_use]
    pub fn new(stage: impl Into<String>, results: Vec<TaskResult>) -> Self {
        Self {
            stage: stage.into(),
            results,
        }
    }

    /// Stage name.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Results in task order.
    #[must_use]
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// Results accepted by their tool's exit policy.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|result| result.success).count()
    }

    /// Results rejected by their tool's exit policy.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// Whether every task succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Lowest negative sentinel if any task faulted, otherwise the highest exit
    /// code (`0` for an empty stage).
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let codes = self.results.iter().map(|result| result.exit_code);
        match codes.clone().filter(|code| *code < 0).min() {
            Some(fault) => fault,
            None => codes.max().unwrap_or(0),
        }
    }
}
