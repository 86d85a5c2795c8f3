//! `a3s-ferry export` command.

use std::path::PathBuf;

use a3s_ferry_core::config::{
    ExportConfig, ExportSource, DEFAULT_EXPORT_WORKERS, DEFAULT_IMAGES_DIR, DEFAULT_RUNTIME,
};
use a3s_ferry_core::error::FerryError;
use a3s_ferry_core::source::resolve_export;
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct ExportArgs {
    /// Compose file whose services' images are exported
    #[arg(long, value_name = "FILE")]
    pub compose: Option<PathBuf>,

    /// Image references to export
    #[arg(long, value_name = "REF", num_args = 1..)]
    pub images: Vec<String>,

    /// Database engine of a catalog bundle (mysql, postgresql)
    #[arg(long = "db", value_name = "ENGINE")]
    pub db: Option<String>,

    /// Product version of a catalog bundle (e.g. confluence_9.2.1)
    #[arg(long, value_name = "VERSION")]
    pub product_version: Option<String>,

    /// Directory the archives are written to
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_IMAGES_DIR)]
    pub output: PathBuf,

    /// Number of images exported in parallel
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_EXPORT_WORKERS,
        value_parser = super::parse_workers
    )]
    pub workers: usize,

    /// Do not write images_manifest.json
    #[arg(long)]
    pub no_manifest: bool,

    /// Container runtime command (e.g. "docker", "podman", "sudo docker")
    #[arg(long, value_name = "BIN", default_value = DEFAULT_RUNTIME)]
    pub runtime: String,
}

pub async fn execute(args: ExportArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let images = (!args.images.is_empty()).then_some(args.images);
    let source = ExportSource::from_selectors(args.compose, images, args.db, args.product_version)?;
    let config = ExportConfig {
        output_dir: args.output,
        workers: args.workers,
        no_manifest: args.no_manifest,
        runtime: args.runtime,
    };

    let runtime = super::open_runtime(&config.runtime).await?;

    let items = resolve_export(&source)?;
    if items.is_empty() {
        return Err(FerryError::NoWorkItems("no images to export".to_string()).into());
    }

    println!("Images to export ({}):", items.len());
    for (i, item) in items.iter().enumerate() {
        println!("  {:>2}. {item}", i + 1);
    }

    let report = a3s_ferry_runtime::run_export(runtime, items, &config).await?;

    println!("{}", output::render_summary("Export summary", &report.summary));
    if let Some(path) = &report.manifest {
        tracing::info!(path = %path.display(), "Manifest saved");
    }
    tracing::info!(output = %config.output_dir.display(), "Archives written");

    Ok(report.summary.is_success())
}
