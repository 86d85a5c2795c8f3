//! `a3s-ferry import` command.

use std::path::PathBuf;

use a3s_ferry_core::config::{
    ImportConfig, DEFAULT_IMAGES_DIR, DEFAULT_IMPORT_WORKERS, DEFAULT_RUNTIME,
};
use a3s_ferry_core::error::FerryError;
use a3s_ferry_core::source::{resolve_archive_files, scan_archive_dir};
use a3s_ferry_core::task::WorkItem;
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct ImportArgs {
    /// Directory holding the archives and manifest
    #[arg(short, long, value_name = "DIR", default_value = DEFAULT_IMAGES_DIR)]
    pub dir: PathBuf,

    /// Import only these archives (relative paths resolve against --dir)
    #[arg(short, long = "files", value_name = "FILE", num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Number of archives loaded in parallel
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_IMPORT_WORKERS,
        value_parser = super::parse_workers
    )]
    pub workers: usize,

    /// Load archives even when the image already exists locally
    #[arg(long)]
    pub force: bool,

    /// Remove dangling images afterwards
    #[arg(long)]
    pub cleanup: bool,

    /// List local images afterwards
    #[arg(short, long)]
    pub list: bool,

    /// Skip the manifest cross-check
    #[arg(long)]
    pub no_verify: bool,

    /// Container runtime command (e.g. "docker", "podman", "sudo docker")
    #[arg(long, value_name = "BIN", default_value = DEFAULT_RUNTIME)]
    pub runtime: String,
}

pub async fn execute(args: ImportArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let config = ImportConfig {
        images_dir: args.dir,
        files: args.files,
        workers: args.workers,
        force: args.force,
        cleanup: args.cleanup,
        list: args.list,
        no_verify: args.no_verify,
        runtime: args.runtime,
    };

    let runtime = super::open_runtime(&config.runtime).await?;

    let items = if config.files.is_empty() {
        scan_archive_dir(&config.images_dir)?
    } else {
        resolve_archive_files(&config.images_dir, &config.files)
    };
    if items.is_empty() {
        return Err(FerryError::NoWorkItems(format!(
            "no archive files found in {}",
            config.images_dir.display()
        ))
        .into());
    }

    let manifest = if config.no_verify {
        tracing::info!("Manifest verification disabled");
        None
    } else {
        a3s_ferry_runtime::load_and_check_manifest(&config.images_dir, &items)
    };

    println!("Archives to import ({}):", items.len());
    for (i, item) in items.iter().enumerate() {
        let size = item
            .archive()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|meta| output::format_bytes(meta.len()))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>2}. {} ({size})", i + 1, display_name(item));
    }

    let summary =
        a3s_ferry_runtime::run_import(runtime.clone(), items, &config, manifest).await?;
    println!("{}", output::render_summary("Import summary", &summary));

    if config.cleanup {
        a3s_ferry_runtime::cleanup_dangling(runtime.as_ref()).await;
    }
    if config.list {
        let listed = runtime.list_images().await;
        if listed.success {
            println!("{}", listed.stdout.trim_end());
        } else {
            tracing::warn!(error = %listed.diagnostic(), "Failed to list images");
        }
    }

    Ok(summary.is_success())
}

fn display_name(item: &WorkItem) -> String {
    match item.archive().and_then(|path| path.file_name()) {
        Some(name) => name.to_string_lossy().to_string(),
        None => item.to_string(),
    }
}
