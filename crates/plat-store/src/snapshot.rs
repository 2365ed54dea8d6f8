//! Snapshot file layout and retention.
//!
//! Each session root holds `current.json` (the latest site in storage form)
//! plus `version_<N>.json` retained snapshots kept solely to support undo.
//! Retention keeps the highest `RETAIN_LIMIT` version numbers; pruning is
//! best-effort and never fails a commit.

use std::fs;
use std::path::{Path, PathBuf};

use plat_model::SiteDoc;

use crate::error::{Result, StoreError};

pub(crate) const CURRENT_FILE: &str = "current.json";

/// Default number of retained snapshots per session.
pub const RETAIN_LIMIT: usize = 20;

pub(crate) fn current_path(root: &Path) -> PathBuf {
    root.join(CURRENT_FILE)
}

pub(crate) fn version_file_name(version: u64) -> String {
    format!("version_{version}.json")
}

/// Read a snapshot file; `Ok(None)` when it does not exist.
pub(crate) fn read_snapshot(path: &Path) -> Result<Option<SiteDoc>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let doc = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupted {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(doc))
}

/// Write a snapshot file as pretty-printed JSON.
pub(crate) fn write_snapshot(path: &Path, doc: &SiteDoc) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Io {
        operation: "encode",
        path: path.to_path_buf(),
        source: std::io::Error::other(source),
    })?;
    fs::write(path, bytes).map_err(|source| StoreError::Io {
        operation: "write",
        path: path.to_path_buf(),
        source,
    })
}

/// Retained snapshot files in the root, sorted by version ascending.
pub(crate) fn retained_versions(root: &Path) -> Result<Vec<(u64, PathBuf)>> {
    let entries = fs::read_dir(root).map_err(|source| StoreError::Io {
        operation: "list",
        path: root.to_path_buf(),
        source,
    })?;
    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| StoreError::Io {
            operation: "list",
            path: root.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(version) = name
            .strip_prefix("version_")
            .and_then(|rest| rest.strip_suffix(".json"))
            .and_then(|digits| digits.parse::<u64>().ok())
        else {
            continue;
        };
        versions.push((version, entry.path()));
    }
    versions.sort_by_key(|(version, _)| *version);
    Ok(versions)
}

/// Delete all but the newest `keep` retained snapshots. Failures are logged
/// and swallowed; pruning must never block a successful commit.
pub(crate) fn prune_retained(root: &Path, keep: usize) {
    let versions = match retained_versions(root) {
        Ok(versions) => versions,
        Err(error) => {
            tracing::warn!(root = %root.display(), %error, "failed to list retained snapshots");
            return;
        }
    };
    if versions.len() <= keep {
        return;
    }
    let excess = versions.len() - keep;
    for (version, path) in &versions[..excess] {
        if let Err(error) = fs::remove_file(path) {
            tracing::warn!(version, path = %path.display(), %error, "failed to prune snapshot");
        } else {
            tracing::debug!(version, "pruned retained snapshot");
        }
    }
}
