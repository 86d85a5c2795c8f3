//! Archive file naming.
//!
//! `namespace/repo:tag` maps to `namespace_repo-tag.tar`. The reverse mapping
//! is a heuristic: references whose repository already contains `_` or `-`,
//! or that have several path components, do not round-trip. Prefer the name
//! recorded in `images_manifest.json` when one is available.

use std::path::Path;

/// Archive file extension (without the dot).
pub const ARCHIVE_EXTENSION: &str = "tar";

/// Derive the archive filename for an image reference.
///
/// Every `/` becomes `_` and every `:` becomes `-`, so the result never
/// contains a path separator.
pub fn archive_file_name(reference: &str) -> String {
    let safe = reference.replace(':', "-").replace('/', "_");
    format!("{safe}.{ARCHIVE_EXTENSION}")
}

/// Best-effort guess of the image reference an archive was saved from.
///
/// `haxqer_confluence-9.2.1.tar` → `haxqer/confluence:9.2.1`,
/// `postgres-15.tar` → `postgres:15`. Returns `None` when the file stem
/// carries neither separator.
pub fn guess_reference(archive: &Path) -> Option<String> {
    let stem = archive.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }

    let (namespace, repo_tag) = match stem.split_once('_') {
        Some((namespace, rest)) if !namespace.is_empty() && !rest.is_empty() => {
            (Some(namespace), rest)
        }
        _ => (None, stem),
    };

    let repo_tag = match repo_tag.split_once('-') {
        Some((repo, tag)) if !repo.is_empty() && !tag.is_empty() => format!("{repo}:{tag}"),
        _ if namespace.is_some() => repo_tag.to_string(),
        _ => return None,
    };

    Some(match namespace {
        Some(namespace) => format!("{namespace}/{repo_tag}"),
        None => repo_tag,
    })
}

/// Whether a path looks like an image archive.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}
