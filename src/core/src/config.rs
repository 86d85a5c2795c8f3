use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{FerryError, Result};

/// Default archive directory, relative to the working directory.
pub const DEFAULT_IMAGES_DIR: &str = "offline_images";

/// Default container runtime binary.
pub const DEFAULT_RUNTIME: &str = "docker";

/// Default export pool width.
pub const DEFAULT_EXPORT_WORKERS: usize = 3;

/// Default import pool width.
pub const DEFAULT_IMPORT_WORKERS: usize = 2;

/// Where the export image list comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSource {
    /// Service manifest (compose file) on disk
    Compose(PathBuf),
    /// Image references given verbatim
    Images(Vec<String>),
    /// Fixed catalog lookup
    Catalog { engine: String, version: String },
}

impl ExportSource {
    /// Build a source from the raw CLI selectors.
    ///
    /// Exactly one of compose, images, or the (engine, version) pair must be
    /// given, and the pair must be complete.
    pub fn from_selectors(
        compose: Option<PathBuf>,
        images: Option<Vec<String>>,
        engine: Option<String>,
        version: Option<String>,
    ) -> Result<Self> {
        let catalog = match (engine, version) {
            (Some(engine), Some(version)) => Some(Self::Catalog { engine, version }),
            (None, None) => None,
            _ => {
                return Err(FerryError::ConfigError(
                    "--db and --product-version must be given together".to_string(),
                ))
            }
        };

        let images = images.filter(|list| !list.is_empty()).map(Self::Images);
        let compose = compose.map(Self::Compose);

        let mut selected: Vec<Self> = [compose, images, catalog].into_iter().flatten().collect();
        match selected.len() {
            0 => Err(FerryError::ConfigError(
                "one of --compose, --images or --db/--product-version is required".to_string(),
            )),
            1 => Ok(selected.remove(0)),
            _ => Err(FerryError::ConfigError(
                "--compose, --images and --db/--product-version are mutually exclusive"
                    .to_string(),
            )),
        }
    }
}

/// Export run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Archive output directory
    pub output_dir: PathBuf,

    /// Worker pool width
    pub workers: usize,

    /// Skip writing images_manifest.json
    pub no_manifest: bool,

    /// Container runtime binary
    pub runtime: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            workers: DEFAULT_EXPORT_WORKERS,
            no_manifest: false,
            runtime: DEFAULT_RUNTIME.to_string(),
        }
    }
}

/// Import run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Archive source directory
    pub images_dir: PathBuf,

    /// Explicit archive files (relative paths resolve against `images_dir`)
    pub files: Vec<PathBuf>,

    /// Worker pool width
    pub workers: usize,

    /// Load even when the image already exists locally
    pub force: bool,

    /// Remove dangling images after the batch
    pub cleanup: bool,

    /// Print the runtime's image list after the batch
    pub list: bool,

    /// Skip the manifest cross-check
    pub no_verify: bool,

    /// Container runtime binary
    pub runtime: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            files: Vec::new(),
            workers: DEFAULT_IMPORT_WORKERS,
            force: false,
            cleanup: false,
            list: false,
            no_verify: false,
            runtime: DEFAULT_RUNTIME.to_string(),
        }
    }
}
