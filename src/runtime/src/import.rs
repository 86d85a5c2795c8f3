//! Import pipeline: load archives back into the local image store.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use a3s_ferry_core::archive::guess_reference;
use a3s_ferry_core::config::ImportConfig;
use a3s_ferry_core::error::{FerryError, Result};
use a3s_ferry_core::manifest::Manifest;
use a3s_ferry_core::runner::BatchRunner;
use a3s_ferry_core::runtime::ContainerRuntime;
use a3s_ferry_core::task::{RunSummary, TaskResult, WorkItem};

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Load the manifest from `images_dir` and compare it with `items`.
///
/// A missing or unreadable manifest is only a warning; import proceeds on
/// file names alone.
pub fn load_and_check_manifest(images_dir: &Path, items: &[WorkItem]) -> Option<Manifest> {
    let manifest = match Manifest::load(images_dir) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            tracing::warn!(dir = %images_dir.display(), "No manifest found, skipping verification");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable manifest");
            return None;
        }
    };

    let found: Vec<String> = items
        .iter()
        .filter_map(WorkItem::archive)
        .map(file_name)
        .collect();
    let check = manifest.check(found.iter().map(String::as_str));

    if !check.missing.is_empty() {
        tracing::warn!(files = ?check.missing, "Archives listed in manifest are missing");
    }
    if !check.extra.is_empty() {
        tracing::warn!(files = ?check.extra, "Archives not listed in manifest");
    }
    if check.is_consistent() {
        tracing::info!(images = manifest.total_images, "Manifest verified");
    }

    Some(manifest)
}

/// Image an archive is expected to contain: the manifest's record if there
/// is one, else a guess from the file name.
pub fn expected_image(manifest: Option<&Manifest>, archive: &Path) -> Option<String> {
    let name = file_name(archive);
    manifest
        .and_then(|m| m.image_for_file(&name))
        .map(str::to_string)
        .or_else(|| guess_reference(archive))
}

/// Load one archive.
///
/// Missing and empty files fail without touching the runtime. Unless
/// `force` is set, an archive whose expected image is already present is
/// skipped.
pub async fn import_archive(
    runtime: Arc<dyn ContainerRuntime>,
    item: WorkItem,
    expected: Option<String>,
    force: bool,
) -> Result<TaskResult> {
    let started = Instant::now();
    let Some(path) = item.archive().map(Path::to_path_buf) else {
        return Err(FerryError::TaskFailure(format!("{item} is not an archive")));
    };
    let display = file_name(&path);

    let size_bytes = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta.len(),
        Err(_) => {
            tracing::error!(archive = %path.display(), "Archive does not exist");
            return Ok(TaskResult::failed(item, display, "file does not exist"));
        }
    };
    if size_bytes == 0 {
        tracing::error!(archive = %path.display(), "Archive is empty");
        return Ok(TaskResult::failed(item, display, "file is empty")
            .with_archive(path, Some(0)));
    }

    if !force {
        if let Some(image) = expected.as_deref() {
            if runtime.exists_locally(image).await {
                tracing::info!(
                    image,
                    archive = %path.display(),
                    "Image already present locally, skipping load"
                );
                return Ok(TaskResult::skipped(item, image, "already present locally")
                    .with_archive(path, Some(size_bytes))
                    .with_elapsed(started.elapsed()));
            }
        }
    }

    tracing::info!(archive = %path.display(), size_bytes, "Loading archive");
    let loaded = runtime.load_from_file(&path).await;
    if !loaded.output.success {
        let diagnostic = loaded.output.diagnostic();
        tracing::error!(archive = %path.display(), error = %diagnostic, "Load failed");
        return Ok(
            TaskResult::failed(item, display, format!("load failed: {diagnostic}"))
                .with_archive(path, Some(size_bytes))
                .with_elapsed(started.elapsed()),
        );
    }

    tracing::info!(image = %loaded.image, archive = %path.display(), "Image loaded");
    Ok(TaskResult::succeeded(item, loaded.image)
        .with_archive(path, Some(size_bytes))
        .with_elapsed(started.elapsed()))
}

/// Import every archive with the configured worker count.
pub async fn run_import(
    runtime: Arc<dyn ContainerRuntime>,
    items: Vec<WorkItem>,
    config: &ImportConfig,
    manifest: Option<Manifest>,
) -> Result<RunSummary> {
    let runner = BatchRunner::new(config.workers)?;
    tracing::info!(
        archives = items.len(),
        workers = runner.workers(),
        force = config.force,
        "Starting import"
    );

    let manifest = Arc::new(manifest);
    let force = config.force;
    let summary = runner
        .run(items, move |item| {
            let expected = item
                .archive()
                .and_then(|path| expected_image((*manifest).as_ref(), path));
            import_archive(Arc::clone(&runtime), item, expected, force)
        })
        .await;
    Ok(summary)
}

/// Remove dangling images. Returns how many were removed.
///
/// Failures are logged and never propagate.
pub async fn cleanup_dangling(runtime: &dyn ContainerRuntime) -> usize {
    let listed = runtime.list_dangling().await;
    if !listed.success {
        tracing::warn!(error = %listed.diagnostic(), "Failed to list dangling images");
        return 0;
    }

    let ids: Vec<String> = listed
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        tracing::info!("No dangling images to clean up");
        return 0;
    }

    let removed = runtime.remove_images(&ids).await;
    if removed.success {
        tracing::info!(count = ids.len(), "Removed dangling images");
        ids.len()
    } else {
        tracing::warn!(error = %removed.diagnostic(), "Failed to remove dangling images");
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRuntime;
    use a3s_ferry_core::manifest::ManifestEntry;
    use a3s_ferry_core::source::scan_archive_dir;
    use a3s_ferry_core::task::TaskOutcome;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(dir: &Path, workers: usize, force: bool) -> ImportConfig {
        ImportConfig {
            images_dir: dir.to_path_buf(),
            workers,
            force,
            ..Default::default()
        }
    }

    fn archive(dir: &Path, file: &str, image: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, format!("archive:{image}")).unwrap();
        path
    }

    #[test]
    fn test_expected_image_prefers_manifest() {
        let manifest = Manifest::new(vec![ManifestEntry {
            name: "bitnami/redis-cluster:7.2".to_string(),
            file: "bitnami_redis-cluster-7.2.tar".to_string(),
            size_bytes: 10,
        }]);
        let path = Path::new("/images/bitnami_redis-cluster-7.2.tar");

        assert_eq!(
            expected_image(Some(&manifest), path).as_deref(),
            Some("bitnami/redis-cluster:7.2")
        );
        assert_eq!(
            expected_image(None, path).as_deref(),
            Some("bitnami/redis:cluster-7.2")
        );
    }

    #[tokio::test]
    async fn test_import_loads_archives() {
        let dir = TempDir::new().unwrap();
        archive(dir.path(), "mysql-8.0.tar", "mysql:8.0");
        archive(dir.path(), "haxqer_confluence-9.2.1.tar", "haxqer/confluence:9.2.1");
        let items = scan_archive_dir(dir.path()).unwrap();
        let runtime = Arc::new(FakeRuntime::new());

        let summary = run_import(runtime.clone(), items, &config(dir.path(), 2, false), None)
            .await
            .unwrap();

        assert_eq!(summary.succeeded.len(), 2);
        assert!(summary.is_success());
        assert!(runtime.is_present("mysql:8.0"));
        assert!(runtime.is_present("haxqer/confluence:9.2.1"));
        let loaded = summary
            .succeeded
            .iter()
            .find(|r| r.identity == "mysql:8.0")
            .unwrap();
        assert_eq!(loaded.size_bytes, Some("archive:mysql:8.0".len() as u64));
    }

    #[tokio::test]
    async fn test_present_image_skipped_without_force() {
        let dir = TempDir::new().unwrap();
        archive(dir.path(), "mysql-8.0.tar", "mysql:8.0");
        let items = scan_archive_dir(dir.path()).unwrap();
        let runtime = Arc::new(FakeRuntime::new().with_present("mysql:8.0"));

        let summary = run_import(runtime.clone(), items, &config(dir.path(), 1, false), None)
            .await
            .unwrap();

        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].identity, "mysql:8.0");
        assert_eq!(
            summary.skipped[0].message.as_deref(),
            Some("already present locally")
        );
        assert!(summary.is_success());
        assert!(!runtime.calls().iter().any(|c| c.starts_with("load")));
    }

    #[tokio::test]
    async fn test_force_reloads_present_image() {
        let dir = TempDir::new().unwrap();
        archive(dir.path(), "mysql-8.0.tar", "mysql:8.0");
        let items = scan_archive_dir(dir.path()).unwrap();
        let runtime = Arc::new(FakeRuntime::new().with_present("mysql:8.0"));

        let summary = run_import(runtime.clone(), items, &config(dir.path(), 1, true), None)
            .await
            .unwrap();

        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.skipped.len(), 0);
        assert!(runtime.calls().iter().any(|c| c.starts_with("load")));
        assert!(!runtime.calls().iter().any(|c| c.starts_with("inspect")));
    }

    #[tokio::test]
    async fn test_manifest_name_used_for_skip_check() {
        let dir = TempDir::new().unwrap();
        let path = archive(
            dir.path(),
            "bitnami_redis-cluster-7.2.tar",
            "bitnami/redis-cluster:7.2",
        );
        let manifest = Manifest::new(vec![ManifestEntry {
            name: "bitnami/redis-cluster:7.2".to_string(),
            file: "bitnami_redis-cluster-7.2.tar".to_string(),
            size_bytes: 10,
        }]);
        let runtime = Arc::new(FakeRuntime::new().with_present("bitnami/redis-cluster:7.2"));

        let summary = run_import(
            runtime.clone(),
            vec![WorkItem::Archive(path)],
            &config(dir.path(), 1, false),
            Some(manifest),
        )
        .await
        .unwrap();

        assert_eq!(summary.skipped.len(), 1);
        assert!(runtime
            .calls()
            .contains(&"inspect bitnami/redis-cluster:7.2".to_string()));
    }

    #[tokio::test]
    async fn test_missing_and_empty_files_fail() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty-1.tar");
        std::fs::write(&empty, b"").unwrap();
        let gone = dir.path().join("gone-1.tar");
        let runtime = Arc::new(FakeRuntime::new());

        let summary = run_import(
            runtime.clone(),
            vec![WorkItem::Archive(empty), WorkItem::Archive(gone)],
            &config(dir.path(), 2, false),
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.failed.len(), 2);
        let mut messages: Vec<_> = summary
            .failed
            .iter()
            .map(|r| r.message.clone().unwrap())
            .collect();
        messages.sort();
        assert_eq!(messages, vec!["file does not exist", "file is empty"]);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_failure_is_isolated() {
        let dir = TempDir::new().unwrap();
        archive(dir.path(), "bad-1.tar", "bad:1");
        archive(dir.path(), "good-1.tar", "good:1");
        let items = scan_archive_dir(dir.path()).unwrap();
        let runtime = Arc::new(FakeRuntime::new().failing_load("bad-1.tar"));

        let summary = run_import(runtime, items, &config(dir.path(), 2, false), None)
            .await
            .unwrap();

        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.failed.len(), 1);
        let failed = &summary.failed[0];
        assert_eq!(failed.identity, "bad-1.tar");
        assert_eq!(failed.outcome, TaskOutcome::Failed);
        assert!(failed
            .message
            .as_deref()
            .unwrap()
            .starts_with("load failed: archive/tar"));
    }

    #[test]
    fn test_manifest_check_on_load() {
        let dir = TempDir::new().unwrap();
        let listed = archive(dir.path(), "mysql-8.0.tar", "mysql:8.0");
        Manifest::new(vec![
            ManifestEntry {
                name: "mysql:8.0".to_string(),
                file: "mysql-8.0.tar".to_string(),
                size_bytes: 17,
            },
            ManifestEntry {
                name: "postgres:15".to_string(),
                file: "postgres-15.tar".to_string(),
                size_bytes: 17,
            },
        ])
        .save(dir.path())
        .unwrap();

        let manifest =
            load_and_check_manifest(dir.path(), &[WorkItem::Archive(listed)]).unwrap();
        assert_eq!(manifest.total_images, 2);
    }

    #[test]
    fn test_manifest_absent_or_malformed() {
        let dir = TempDir::new().unwrap();
        assert!(load_and_check_manifest(dir.path(), &[]).is_none());

        std::fs::write(dir.path().join("images_manifest.json"), "{not json").unwrap();
        assert!(load_and_check_manifest(dir.path(), &[]).is_none());
    }

    #[tokio::test]
    async fn test_cleanup_dangling() {
        let runtime = FakeRuntime::new()
            .with_dangling("sha256:aaa")
            .with_dangling("sha256:bbb");
        assert_eq!(cleanup_dangling(&runtime).await, 2);
        assert!(runtime
            .calls()
            .contains(&"rmi sha256:aaa sha256:bbb".to_string()));
        assert_eq!(cleanup_dangling(&runtime).await, 0);
    }
}
