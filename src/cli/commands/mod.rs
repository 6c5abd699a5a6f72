//! Command implementations.

pub mod completions;
pub mod init;
pub mod list;
pub mod reconcile;
pub mod show;
pub mod status;
pub mod version;

use std::path::{Path, PathBuf};

use crate::config::resolve_cache_path;
use crate::error::{Error, Result};
use crate::storage::{Snapshot, SnapshotCache};

/// Resolve the cache path without requiring it to exist.
pub(crate) fn cache_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_cache_path(explicit)
        .ok_or_else(|| Error::Config("Could not determine cache location".to_string()))
}

/// Open an existing cache.
///
/// # Errors
///
/// Returns `Error::NotInitialized` if no cache exists at the resolved path.
pub(crate) fn open_cache(explicit: Option<&Path>) -> Result<(PathBuf, SnapshotCache)> {
    let path = cache_path(explicit)?;
    if !path.exists() {
        return Err(Error::NotInitialized { path });
    }
    let cache = SnapshotCache::open(&path)?;
    Ok((path, cache))
}

/// Load the cached snapshot, treating a never-saved cache as empty.
pub(crate) fn load_snapshot(explicit: Option<&Path>) -> Result<Snapshot> {
    let (_, cache) = open_cache(explicit)?;
    Ok(cache.load()?.unwrap_or_default())
}

/// First characters of an id for table output.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
