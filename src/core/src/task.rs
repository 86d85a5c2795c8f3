//! Work items, per-item results and the aggregated run summary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One unit of export or import work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItem {
    /// Image reference to pull and save (`repository[:tag]`)
    Image(String),
    /// Archive file to load
    Archive(PathBuf),
}

impl WorkItem {
    /// Image reference, if this is an export item.
    pub fn image(&self) -> Option<&str> {
        match self {
            WorkItem::Image(reference) => Some(reference),
            WorkItem::Archive(_) => None,
        }
    }

    /// Archive path, if this is an import item.
    pub fn archive(&self) -> Option<&Path> {
        match self {
            WorkItem::Image(_) => None,
            WorkItem::Archive(path) => Some(path),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItem::Image(reference) => write!(f, "{reference}"),
            WorkItem::Archive(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Outcome of processing one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Succeeded => write!(f, "succeeded"),
            TaskOutcome::Failed => write!(f, "failed"),
            TaskOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of processing one work item. Produced exactly once per item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// The item this result belongs to
    pub item: WorkItem,
    /// Resolved image identity (inferred at runtime for imports)
    pub identity: String,
    pub outcome: TaskOutcome,
    /// Diagnostic text, always set for failures
    pub message: Option<String>,
    /// Archive written or read by the task
    pub archive: Option<PathBuf>,
    /// Archive size in bytes, when known
    pub size_bytes: Option<u64>,
    /// Time spent on this item
    pub elapsed: Duration,
}

impl TaskResult {
    fn new(item: WorkItem, identity: impl Into<String>, outcome: TaskOutcome) -> Self {
        Self {
            item,
            identity: identity.into(),
            outcome,
            message: None,
            archive: None,
            size_bytes: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(item: WorkItem, identity: impl Into<String>) -> Self {
        Self::new(item, identity, TaskOutcome::Succeeded)
    }

    pub fn failed(
        item: WorkItem,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "unknown error".to_string();
        }
        Self::new(item, identity, TaskOutcome::Failed).with_message(message)
    }

    pub fn skipped(
        item: WorkItem,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(item, identity, TaskOutcome::Skipped).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_archive(mut self, archive: impl Into<PathBuf>, size_bytes: Option<u64>) -> Self {
        self.archive = Some(archive.into());
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

/// Aggregate outcome of one batch run.
///
/// Each collection keeps completion order.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub succeeded: Vec<TaskResult>,
    pub failed: Vec<TaskResult>,
    pub skipped: Vec<TaskResult>,
    /// Wall-clock time from first submission to last completion
    pub duration: Duration,
}

impl RunSummary {
    /// File a result into the collection matching its outcome.
    pub fn record(&mut self, result: TaskResult) {
        match result.outcome {
            TaskOutcome::Succeeded => self.succeeded.push(result),
            TaskOutcome::Failed => self.failed.push(result),
            TaskOutcome::Skipped => self.skipped.push(result),
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len() + self.skipped.len()
    }

    /// A batch succeeds iff nothing failed. Skipped items do not count.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// All results, succeeded first, then skipped, then failed.
    pub fn iter(&self) -> impl Iterator<Item = &TaskResult> {
        self.succeeded
            .iter()
            .chain(self.skipped.iter())
            .chain(self.failed.iter())
    }
}
