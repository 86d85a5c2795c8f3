//! A3S Ferry Core - offline container image transfer.
//!
//! This crate provides the types and building blocks shared by the export
//! and import pipelines: work item resolution, the bounded batch runner,
//! the side-car manifest, and the container runtime gateway contract.

pub mod archive;
pub mod config;
pub mod error;
pub mod manifest;
pub mod runner;
pub mod runtime;
pub mod source;
pub mod task;

// Re-export commonly used types
pub use config::{ExportConfig, ExportSource, ImportConfig};
pub use error::{FerryError, Result};
pub use manifest::{Manifest, ManifestCheck, ManifestEntry, MANIFEST_FILE_NAME};
pub use runner::BatchRunner;
pub use runtime::{CommandOutput, ContainerRuntime, LoadOutcome};
pub use task::{RunSummary, TaskOutcome, TaskResult, WorkItem};

/// A3S Ferry version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
