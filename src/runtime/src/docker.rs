//! Docker-compatible CLI gateway.
//!
//! Shells out to `docker` (or any CLI-compatible binary such as `podman`)
//! for every runtime operation. The configured command may carry leading
//! arguments, e.g. `sudo docker` or `podman --remote`.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;

use a3s_ferry_core::archive;
use a3s_ferry_core::runtime::{CommandOutput, ContainerRuntime, LoadOutcome};
use async_trait::async_trait;
use tokio::process::Command;

/// Format passed to `images` for the post-import listing.
const LIST_FORMAT: &str = "table {{.Repository}}:{{.Tag}}\t{{.Size}}\t{{.CreatedAt}}";

/// Gateway backed by a Docker-compatible command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    /// Full command as configured, for log lines
    command: String,
    program: String,
    base_args: Vec<String>,
}

impl DockerCli {
    /// Create a gateway from a command line such as `docker` or `sudo docker`.
    ///
    /// An empty command falls back to `docker`.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_else(|| "docker".to_string());
        let base_args: Vec<String> = parts.collect();
        let command = std::iter::once(program.as_str())
            .chain(base_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            command,
            program,
            base_args,
        }
    }

    fn command<I, S>(&self, args: I) -> (Command, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args).args(&args).stdin(Stdio::null());
        let shown = args.iter().map(|a| a.to_string_lossy().to_string()).collect();
        (cmd, shown)
    }

    /// Run the runtime with `args`, capturing stdout and stderr.
    async fn exec<I, S>(&self, args: I) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (mut cmd, shown) = self.command(args);
        tracing::debug!(runtime = %self.command, args = ?shown, "Running runtime command");

        match cmd.output().await {
            Ok(output) => CommandOutput {
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => CommandOutput::failed(format!("failed to run {}: {e}", self.command)),
        }
    }

    /// Run `save`, streaming the archive straight into `path`.
    async fn save_streaming(&self, reference: &str, path: &Path) -> CommandOutput {
        let file = match tokio::fs::File::create(path).await {
            Ok(file) => file.into_std().await,
            Err(e) => {
                return CommandOutput::failed(format!(
                    "failed to create {}: {e}",
                    path.display()
                ))
            }
        };

        let (mut cmd, shown) = self.command(["save", reference]);
        tracing::debug!(
            runtime = %self.command,
            args = ?shown,
            dest = %path.display(),
            "Running runtime command"
        );
        cmd.stdout(Stdio::from(file)).stderr(Stdio::piped());

        let output = match cmd.spawn() {
            Ok(child) => child.wait_with_output().await,
            Err(e) => Err(e),
        };

        let result = match output {
            Ok(output) => CommandOutput {
                success: output.status.success(),
                stdout: String::new(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Err(e) => CommandOutput::failed(format!("failed to run {}: {e}", self.command)),
        };

        if !result.success {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove partial archive"
                );
            }
        }
        result
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

/// Extract the image name from `load` output.
///
/// Recognises `Loaded image: <name>`, podman's `Loaded image(s): <name>[,...]`
/// and, for untagged archives, `Loaded image ID: <id>`.
pub fn parse_loaded_image(output: &str) -> Option<String> {
    let mut image_id = None;
    for line in output.lines().map(str::trim) {
        if let Some(rest) = line
            .strip_prefix("Loaded image:")
            .or_else(|| line.strip_prefix("Loaded image(s):"))
        {
            let name = rest.split(',').next().unwrap_or_default().trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        } else if let Some(rest) = line.strip_prefix("Loaded image ID:") {
            let id = rest.trim();
            if !id.is_empty() && image_id.is_none() {
                image_id = Some(id.to_string());
            }
        }
    }
    image_id
}

async fn non_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() > 0)
        .unwrap_or(false)
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        &self.command
    }

    async fn check_available(&self) -> CommandOutput {
        let version = self.exec(["--version"]).await;
        if !version.success {
            return CommandOutput::failed(format!(
                "{} is not installed or not runnable: {}",
                self.command,
                version.diagnostic()
            ));
        }

        let info = self.exec(["info"]).await;
        if !info.success {
            let diagnostic = info.diagnostic();
            let message = if diagnostic.contains("Cannot connect to the Docker daemon") {
                format!("{} daemon is not running: {diagnostic}", self.command)
            } else {
                format!("{} info failed: {diagnostic}", self.command)
            };
            return CommandOutput::failed(message);
        }

        CommandOutput::ok(version.stdout.trim())
    }

    async fn exists_locally(&self, reference: &str) -> bool {
        self.exec(["image", "inspect", reference]).await.success
    }

    async fn pull(&self, reference: &str) -> CommandOutput {
        if self.exists_locally(reference).await {
            tracing::info!(image = reference, "Image already present locally, skipping pull");
            return CommandOutput::ok(format!("{reference} already present locally"));
        }
        self.exec(["pull", reference]).await
    }

    async fn save_to_file(&self, reference: &str, path: &Path) -> CommandOutput {
        if non_empty_file(path).await {
            tracing::info!(
                image = reference,
                archive = %path.display(),
                "Archive already exists, skipping save"
            );
            return CommandOutput::ok(format!("{} already exists", path.display()));
        }
        self.save_streaming(reference, path).await
    }

    async fn load_from_file(&self, path: &Path) -> LoadOutcome {
        let output = self
            .exec([OsStr::new("load"), OsStr::new("--input"), path.as_os_str()])
            .await;

        let image = parse_loaded_image(&output.stdout)
            .or_else(|| parse_loaded_image(&output.stderr))
            .or_else(|| archive::guess_reference(path))
            .unwrap_or_else(|| "unknown".to_string());

        LoadOutcome { image, output }
    }

    async fn list_images(&self) -> CommandOutput {
        self.exec(["images", "--format", LIST_FORMAT]).await
    }

    async fn list_dangling(&self) -> CommandOutput {
        self.exec(["images", "-f", "dangling=true", "-q"]).await
    }

    async fn remove_images(&self, references: &[String]) -> CommandOutput {
        if references.is_empty() {
            return CommandOutput::ok("");
        }
        self.exec(std::iter::once("rmi").chain(references.iter().map(String::as_str)))
            .await
    }
}
