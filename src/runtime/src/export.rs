//! Export pipeline: pull each image and save it to an archive.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use a3s_ferry_core::archive::archive_file_name;
use a3s_ferry_core::config::ExportConfig;
use a3s_ferry_core::error::{FerryError, Result};
use a3s_ferry_core::manifest::Manifest;
use a3s_ferry_core::runner::BatchRunner;
use a3s_ferry_core::runtime::ContainerRuntime;
use a3s_ferry_core::task::{RunSummary, TaskResult, WorkItem};

/// Outcome of an export run.
#[derive(Debug)]
pub struct ExportReport {
    pub summary: RunSummary,
    /// Manifest written after the batch, if any
    pub manifest: Option<PathBuf>,
}

/// Split items into those to export and those whose archive name is already
/// claimed by an earlier item.
///
/// Keeps workers from ever writing the same archive path. The second list
/// holds ready-made skipped results.
pub fn dedup_archives(
    items: Vec<WorkItem>,
    output_dir: &Path,
) -> (Vec<WorkItem>, Vec<TaskResult>) {
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut unique = Vec::new();
    let mut skipped = Vec::new();

    for item in items {
        let Some(reference) = item.image().map(str::to_string) else {
            unique.push(item);
            continue;
        };
        let file = archive_file_name(&reference);
        match claimed.get(&file) {
            Some(owner) => {
                let message = if *owner == reference {
                    "duplicate of an earlier item".to_string()
                } else {
                    format!("archive name {file} already used by {owner}")
                };
                tracing::warn!(image = %reference, "{message}");
                skipped.push(
                    TaskResult::skipped(item, reference, message)
                        .with_archive(output_dir.join(&file), None),
                );
            }
            None => {
                claimed.insert(file, reference);
                unique.push(item);
            }
        }
    }

    (unique, skipped)
}

/// Pull one image and save it into `output_dir`.
///
/// A failed pull never attempts the save.
pub async fn export_image(
    runtime: Arc<dyn ContainerRuntime>,
    item: WorkItem,
    output_dir: PathBuf,
) -> Result<TaskResult> {
    let started = Instant::now();
    let Some(reference) = item.image().map(str::to_string) else {
        return Err(FerryError::TaskFailure(format!(
            "{item} is not an image reference"
        )));
    };
    let archive = output_dir.join(archive_file_name(&reference));

    tracing::info!(image = %reference, "Pulling image");
    let pulled = runtime.pull(&reference).await;
    if !pulled.success {
        let diagnostic = pulled.diagnostic();
        tracing::error!(image = %reference, error = %diagnostic, "Pull failed");
        return Ok(
            TaskResult::failed(item, reference, format!("pull failed: {diagnostic}"))
                .with_elapsed(started.elapsed()),
        );
    }

    tracing::info!(image = %reference, archive = %archive.display(), "Saving image");
    let saved = runtime.save_to_file(&reference, &archive).await;
    if !saved.success {
        let diagnostic = saved.diagnostic();
        tracing::error!(image = %reference, error = %diagnostic, "Save failed");
        return Ok(
            TaskResult::failed(item, reference, format!("save failed: {diagnostic}"))
                .with_elapsed(started.elapsed()),
        );
    }

    let size_bytes = tokio::fs::metadata(&archive).await.map(|m| m.len()).ok();
    tracing::info!(
        image = %reference,
        archive = %archive.display(),
        size_bytes = size_bytes.unwrap_or(0),
        "Image exported"
    );
    Ok(TaskResult::succeeded(item, reference)
        .with_archive(archive, size_bytes)
        .with_elapsed(started.elapsed()))
}

/// Export every item, then write the manifest unless suppressed.
///
/// Manifest failures are logged and never change the outcome.
pub async fn run_export(
    runtime: Arc<dyn ContainerRuntime>,
    items: Vec<WorkItem>,
    config: &ExportConfig,
) -> Result<ExportReport> {
    let runner = BatchRunner::new(config.workers)?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let (unique, duplicates) = dedup_archives(items, &config.output_dir);
    tracing::info!(
        images = unique.len(),
        output = %config.output_dir.display(),
        workers = runner.workers(),
        "Starting export"
    );

    let output_dir = config.output_dir.clone();
    let mut summary = runner
        .run(unique, move |item| {
            export_image(Arc::clone(&runtime), item, output_dir.clone())
        })
        .await;
    for result in duplicates {
        summary.record(result);
    }

    let manifest = if config.no_manifest || summary.succeeded.is_empty() {
        None
    } else {
        write_manifest(&summary, &config.output_dir)
    };

    Ok(ExportReport { summary, manifest })
}

fn write_manifest(summary: &RunSummary, output_dir: &Path) -> Option<PathBuf> {
    let manifest = Manifest::from_results(&summary.succeeded);
    match manifest.save(output_dir) {
        Ok(path) => {
            tracing::info!(
                path = %path.display(),
                images = manifest.total_images,
                "Manifest written"
            );
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to write manifest");
            None
        }
    }
}
