//! A3S Ferry Runtime - container runtime gateway and transfer pipelines.
//!
//! This crate drives a Docker-compatible CLI for pulling, saving and loading
//! images, and builds the export and import pipelines on top of the core
//! batch runner.

pub mod docker;
pub mod export;
pub mod import;

#[cfg(test)]
mod fake;

// Re-export common types
pub use docker::DockerCli;
pub use export::{run_export, ExportReport};
pub use import::{cleanup_dangling, load_and_check_manifest, run_import};

/// A3S Ferry Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
