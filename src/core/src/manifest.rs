//! Side-car manifest (`images_manifest.json`).
//!
//! Written after an export batch, read back on import to cross-check which
//! archives were expected against the ones actually found.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FerryError, Result};
use crate::task::TaskResult;

/// Manifest file name inside the archive directory.
pub const MANIFEST_FILE_NAME: &str = "images_manifest.json";

/// Timestamp layout for `generated_at`.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One exported archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Image reference the archive was saved from
    pub name: String,
    /// Archive file name (no directory)
    pub file: String,
    pub size_bytes: u64,
}

/// The whole side-car document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub total_images: usize,
    #[serde(default)]
    pub images: Vec<ManifestEntry>,
}

/// Filenames that disagree between a manifest and a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestCheck {
    /// Listed in the manifest but not found on disk
    pub missing: Vec<String>,
    /// Found on disk but not listed in the manifest
    pub extra: Vec<String>,
}

impl ManifestCheck {
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

/// Path of the manifest inside `dir`.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE_NAME)
}

impl Manifest {
    /// Build a manifest from entries, stamping the current local time.
    pub fn new(images: Vec<ManifestEntry>) -> Self {
        Self {
            generated_at: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            total_images: images.len(),
            images,
        }
    }

    /// Build a manifest from the succeeded results of an export batch.
    ///
    /// Each archive is stat'ed now; results whose archive is missing or empty
    /// are left out.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut entries = Vec::new();
        for result in results {
            let Some(archive) = result.archive.as_deref() else {
                tracing::warn!(
                    image = %result.identity,
                    "No archive recorded, leaving out of manifest"
                );
                continue;
            };
            let size_bytes = std::fs::metadata(archive).map(|m| m.len()).unwrap_or(0);
            if size_bytes == 0 {
                tracing::warn!(
                    image = %result.identity,
                    archive = %archive.display(),
                    "Archive missing or empty, leaving out of manifest"
                );
                continue;
            }
            let Some(file) = archive.file_name() else {
                continue;
            };
            entries.push(ManifestEntry {
                name: result.identity.clone(),
                file: file.to_string_lossy().to_string(),
                size_bytes,
            });
        }
        Self::new(entries)
    }

    /// Write the manifest into `dir`, replacing any existing one.
    ///
    /// Writes to a temporary file first, then renames over the target.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = manifest_path(dir);
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| FerryError::ManifestError(format!("failed to encode manifest: {e}")))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).map_err(|e| {
            FerryError::ManifestError(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            FerryError::ManifestError(format!("failed to replace {}: {e}", path.display()))
        })?;
        Ok(path)
    }

    /// Load the manifest from `dir`. Returns `Ok(None)` when there is none.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = manifest_path(dir);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path).map_err(|e| {
            FerryError::ManifestError(format!("failed to read {}: {e}", path.display()))
        })?;
        let manifest = serde_json::from_str(&data).map_err(|e| {
            FerryError::ManifestError(format!("failed to parse {}: {e}", path.display()))
        })?;
        Ok(Some(manifest))
    }

    /// Recorded image name for an archive file name.
    pub fn image_for_file(&self, file: &str) -> Option<&str> {
        self.images
            .iter()
            .find(|entry| entry.file == file)
            .map(|entry| entry.name.as_str())
    }

    /// Compare recorded file names with the ones found on disk.
    pub fn check<'a>(&self, found: impl IntoIterator<Item = &'a str>) -> ManifestCheck {
        let expected: BTreeSet<&str> = self.images.iter().map(|e| e.file.as_str()).collect();
        let found: BTreeSet<&str> = found.into_iter().collect();

        ManifestCheck {
            missing: expected
                .difference(&found)
                .map(|s| s.to_string())
                .collect(),
            extra: found
                .difference(&expected)
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
