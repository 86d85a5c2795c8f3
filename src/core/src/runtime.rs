//! Container runtime gateway contract.
//!
//! Every pull, save, load, inspect, list and remove goes through a
//! [`ContainerRuntime`]. Implementations never return errors: failures to
//! spawn, I/O errors and non-zero exits all come back as an unsuccessful
//! [`CommandOutput`] carrying the diagnostic text.

use async_trait::async_trait;
use std::path::Path;

/// Captured result of one runtime invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed invocation with the given diagnostic.
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Best single-line-ish diagnostic for a failure: stderr, else stdout.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "runtime command failed without output".to_string()
    }
}

/// Result of loading one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Image name reported by the runtime, or a filename-derived guess
    pub image: String,
    pub output: CommandOutput,
}

/// Gateway to an external container runtime (docker, podman, ...).
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime binary name, for log lines.
    fn name(&self) -> &str;

    /// Probe the binary and its daemon. `stdout` carries the version string.
    async fn check_available(&self) -> CommandOutput;

    /// Whether `reference` is present in the local image store.
    async fn exists_locally(&self, reference: &str) -> bool;

    /// Pull `reference`. Succeeds without network traffic when it is already present.
    async fn pull(&self, reference: &str) -> CommandOutput;

    /// Save `reference` into the archive at `path`.
    ///
    /// Succeeds without rewriting when `path` already exists and is non-empty.
    /// A partially written file is removed on failure.
    async fn save_to_file(&self, reference: &str, path: &Path) -> CommandOutput;

    /// Load the archive at `path` into the local store.
    async fn load_from_file(&self, path: &Path) -> LoadOutcome;

    /// Human-readable table of local images.
    async fn list_images(&self) -> CommandOutput;

    /// IDs of dangling images, one per line.
    async fn list_dangling(&self) -> CommandOutput;

    /// Remove the given images.
    async fn remove_images(&self, references: &[String]) -> CommandOutput;
}
