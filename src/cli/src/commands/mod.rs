//! CLI command definitions and dispatch.

mod export;
mod import;
mod version;

use std::sync::Arc;

use a3s_ferry_core::error::FerryError;
use a3s_ferry_core::runtime::ContainerRuntime;
use a3s_ferry_runtime::DockerCli;
use clap::{Parser, Subcommand};

/// A3S Ferry - move container images between hosts without a registry.
#[derive(Parser)]
#[command(name = "a3s-ferry", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Pull images and save them as archives
    Export(export::ExportArgs),
    /// Load image archives into the local runtime
    Import(import::ImportArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Build the runtime gateway and make sure it can be used.
pub(crate) async fn open_runtime(
    command: &str,
) -> Result<Arc<dyn ContainerRuntime>, FerryError> {
    let runtime = DockerCli::new(command);
    let status = runtime.check_available().await;
    if !status.success {
        return Err(FerryError::RuntimeUnavailable(status.diagnostic()));
    }
    tracing::info!(
        runtime = runtime.name(),
        version = %status.stdout.trim(),
        "Container runtime ready"
    );
    Ok(Arc::new(runtime))
}

/// Parse a worker count, rejecting zero.
pub(crate) fn parse_workers(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
///
/// Returns `Ok(false)` when the command ran but some items failed.
pub async fn dispatch(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Command::Export(args) => export::execute(args).await,
        Command::Import(args) => import::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}
