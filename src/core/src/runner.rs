//! Bounded-concurrency batch runner.
//!
//! A fixed number of workers pull items from a shared FIFO queue. Each item
//! runs in its own task so that an error or panic is confined to that item and
//! recorded as a failed result. Results flow over one channel to a single
//! collector, in completion order.

use std::any::Any;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};

use crate::error::{FerryError, Result};
use crate::task::{RunSummary, TaskOutcome, TaskResult, WorkItem};

/// Runs a task function over work items with at most `workers` in flight.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    workers: usize,
}

impl BatchRunner {
    /// Create a runner. `workers` must be at least 1.
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(FerryError::ConfigError(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` once per item and collect every result.
    ///
    /// Never stops early: a failing or panicking item is recorded as failed
    /// and the remaining items still run.
    pub async fn run<F, Fut>(&self, items: Vec<WorkItem>, task: F) -> RunSummary
    where
        F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskResult>> + Send + 'static,
    {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        if items.is_empty() {
            return summary;
        }

        let width = self.workers.min(items.len());
        tracing::debug!(items = items.len(), workers = width, "Starting batch");

        let queue = Arc::new(Mutex::new(items.into_iter().collect::<VecDeque<_>>()));
        let task = Arc::new(task);
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskResult>();

        for worker in 0..width {
            let queue = Arc::clone(&queue);
            let task = Arc::clone(&task);
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(item) = next else {
                        break;
                    };
                    tracing::debug!(worker, item = %item, "Picked up item");
                    let result = run_one(item, Arc::clone(&task)).await;
                    if tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        while let Some(result) = rx.recv().await {
            let mark = match result.outcome {
                TaskOutcome::Succeeded => "✓",
                TaskOutcome::Skipped => "-",
                TaskOutcome::Failed => "✗",
            };
            tracing::debug!(item = %result.item, "{mark} {}", result.identity);
            summary.record(result);
        }

        summary.duration = started.elapsed();
        summary
    }
}

/// Run one item in its own task. Building the future happens inside that
/// task too, so a panic anywhere in `task` is confined to this item.
async fn run_one<F, Fut>(item: WorkItem, task: Arc<F>) -> TaskResult
where
    F: Fn(WorkItem) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskResult>> + Send + 'static,
{
    let started = Instant::now();
    let identity = item.to_string();

    let owned = item.clone();
    let result = match tokio::spawn(async move { task(owned).await }).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => TaskResult::failed(item, identity, e.to_string()),
        Err(e) if e.is_panic() => {
            TaskResult::failed(item, identity, panic_message(e.into_panic()))
        }
        Err(e) => TaskResult::failed(item, identity, e.to_string()),
    };

    if result.elapsed.is_zero() {
        result.with_elapsed(started.elapsed())
    } else {
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("task panicked: {detail}")
}
