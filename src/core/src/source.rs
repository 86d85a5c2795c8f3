//! Task source resolution.
//!
//! Turns the selected export or import mode into an ordered list of
//! [`WorkItem`]s. An empty list is returned as `Ok` where the mode allows it;
//! callers treat an empty list as terminal before starting a batch.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::archive;
use crate::config::ExportSource;
use crate::error::{FerryError, Result};
use crate::task::WorkItem;

/// Fixed (engine, product version) → images table.
const CATALOG: &[(&str, &str, &[&str])] = &[
    ("mysql", "confluence_9.2.1", &["haxqer/confluence:9.2.1", "mysql:8.0"]),
    ("mysql", "confluence_8.5.23", &["haxqer/confluence:8.5.23", "mysql:8.0"]),
    ("postgresql", "confluence_9.2.1", &["haxqer/confluence:9.2.1", "postgres:15"]),
    ("postgresql", "confluence_8.5.23", &["haxqer/confluence:8.5.23", "postgres:15"]),
];

/// Database engines present in the catalog.
pub fn catalog_engines() -> Vec<&'static str> {
    let mut engines: Vec<_> = CATALOG.iter().map(|(engine, _, _)| *engine).collect();
    engines.dedup();
    engines
}

/// Product versions present in the catalog.
pub fn catalog_versions() -> Vec<&'static str> {
    let mut versions: Vec<&'static str> = Vec::new();
    for (_, version, _) in CATALOG {
        if !versions.contains(version) {
            versions.push(version);
        }
    }
    versions
}

/// Look up the fixed image list for an (engine, version) pair.
pub fn catalog_images(engine: &str, version: &str) -> Result<Vec<WorkItem>> {
    if !CATALOG.iter().any(|(e, _, _)| *e == engine) {
        return Err(FerryError::UnsupportedSelector(format!(
            "database engine '{engine}' (supported: {})",
            catalog_engines().join(", ")
        )));
    }

    CATALOG
        .iter()
        .find(|(e, v, _)| *e == engine && *v == version)
        .map(|(_, _, images)| images.iter().map(|i| WorkItem::Image(i.to_string())).collect())
        .ok_or_else(|| {
            FerryError::UnsupportedSelector(format!(
                "product version '{version}' (supported: {})",
                catalog_versions().join(", ")
            ))
        })
}

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: Option<serde_yaml::Mapping>,
}

/// Extract every service's `image` from a compose document, in declaration order.
///
/// Duplicates across services are kept.
pub fn parse_compose(content: &str) -> std::result::Result<Vec<String>, serde_yaml::Error> {
    let compose: ComposeFile = serde_yaml::from_str(content)?;
    let Some(services) = compose.services else {
        return Ok(Vec::new());
    };

    let mut images = Vec::new();
    for (name, service) in services {
        if let Some(image) = service.get("image").and_then(|i| i.as_str()) {
            tracing::debug!(
                service = name.as_str().unwrap_or("<unnamed>"),
                image,
                "Found image in compose file"
            );
            images.push(image.to_string());
        }
    }
    Ok(images)
}

/// Read and parse a compose file from disk.
pub fn compose_images(path: &Path) -> Result<Vec<WorkItem>> {
    let content = std::fs::read_to_string(path).map_err(|e| FerryError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let images = parse_compose(&content).map_err(|e| FerryError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(images.into_iter().map(WorkItem::Image).collect())
}

/// Resolve an export source into image work items.
pub fn resolve_export(source: &ExportSource) -> Result<Vec<WorkItem>> {
    let items = match source {
        ExportSource::Compose(path) => {
            let items = compose_images(path)?;
            tracing::info!(path = %path.display(), count = items.len(), "Parsed compose file");
            items
        }
        ExportSource::Images(images) => {
            tracing::info!(count = images.len(), "Using explicit image list");
            images.iter().cloned().map(WorkItem::Image).collect()
        }
        ExportSource::Catalog { engine, version } => {
            let items = catalog_images(engine, version)?;
            tracing::info!(
                engine = %engine,
                version = %version,
                count = items.len(),
                "Using catalog images"
            );
            items
        }
    };
    Ok(items)
}

/// List `.tar` archives in a directory, sorted by file name.
///
/// An empty directory yields an empty list and a warning.
pub fn scan_archive_dir(dir: &Path) -> Result<Vec<WorkItem>> {
    if !dir.is_dir() {
        return Err(FerryError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut archives: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && archive::is_archive(path))
        .collect();
    archives.sort();

    if archives.is_empty() {
        tracing::warn!(dir = %dir.display(), "No .tar archives found in directory");
    } else {
        tracing::info!(dir = %dir.display(), count = archives.len(), "Found archives");
    }

    Ok(archives.into_iter().map(WorkItem::Archive).collect())
}

/// Resolve an explicit archive list against the images directory.
///
/// Missing files are logged and dropped.
pub fn resolve_archive_files(images_dir: &Path, files: &[PathBuf]) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for file in files {
        let path = if file.is_absolute() {
            file.clone()
        } else {
            images_dir.join(file)
        };

        if path.exists() {
            items.push(WorkItem::Archive(path));
        } else {
            tracing::error!(path = %path.display(), "Archive file does not exist");
        }
    }
    tracing::info!(count = items.len(), "Using explicit archive list");
    items
}
