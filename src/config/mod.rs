//! Configuration management.
//!
//! This module resolves where notes are mirrored and where the snapshot
//! cache lives, and carries the resolved values as [`SyncConfig`].
//!
//! # Layout
//!
//! - **Sync directory**: one `.note` file per note, archived notes under
//!   `archived/` when archival sync is enabled (default `~/notes`)
//! - **Cache**: SQLite snapshot of the last remote state at
//!   `~/.notesync/data/cache.db`

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Subdirectory of the sync root holding archived notes.
pub const ARCHIVE_DIR_NAME: &str = "archived";

/// Extension of mirrored note files.
pub const NOTE_EXT: &str = "note";

/// Resolved sync settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    sync_dir: PathBuf,
    sync_archived: bool,
}

impl SyncConfig {
    /// Create a config rooted at `sync_dir`. Relative paths are made
    /// absolute against the current directory.
    #[must_use]
    pub fn new(sync_dir: impl Into<PathBuf>) -> Self {
        let sync_dir = sync_dir.into();
        let sync_dir = std::path::absolute(&sync_dir).unwrap_or(sync_dir);
        Self {
            sync_dir,
            sync_archived: false,
        }
    }

    /// Enable or disable mirroring of archived notes.
    #[must_use]
    pub const fn with_archived(mut self, sync_archived: bool) -> Self {
        self.sync_archived = sync_archived;
        self
    }

    #[must_use]
    pub fn sync_dir(&self) -> &Path {
        &self.sync_dir
    }

    #[must_use]
    pub const fn sync_archived(&self) -> bool {
        self.sync_archived
    }

    /// Directory for archived notes, or `None` when they stay virtual.
    #[must_use]
    pub fn archive_dir(&self) -> Option<PathBuf> {
        self.sync_archived
            .then(|| self.sync_dir.join(ARCHIVE_DIR_NAME))
    }
}

/// Get the global notesync directory location (`~/.notesync/`).
#[must_use]
pub fn global_notesync_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".notesync"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `NOTESYNC_TEST_CACHE=1` (or any
/// non-empty value other than `0`/`false`). This redirects the cache to an
/// isolated location.
#[must_use]
pub fn is_test_mode() -> bool {
    env_flag("NOTESYNC_TEST_CACHE")
}

/// Get the test cache path (`~/.notesync/test/cache.db`).
#[must_use]
pub fn test_cache_path() -> Option<PathBuf> {
    global_notesync_dir().map(|dir| dir.join("test").join("cache.db"))
}

/// Resolve the snapshot cache path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `NOTESYNC_TEST_CACHE` environment variable → test cache
/// 3. `NOTESYNC_CACHE` environment variable
/// 4. Global location: `~/.notesync/data/cache.db`
#[must_use]
pub fn resolve_cache_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_cache_path();
    }

    if let Ok(path) = std::env::var("NOTESYNC_CACHE") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    global_notesync_dir().map(|dir| dir.join("data").join("cache.db"))
}

/// Resolve the sync directory.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `NOTESYNC_DIR` environment variable
/// 3. `~/notes`
#[must_use]
pub fn resolve_sync_dir(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("NOTESYNC_DIR") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    directories::BaseDirs::new().map(|b| b.home_dir().join("notes"))
}

/// Whether archived notes should be mirrored (`NOTESYNC_SYNC_ARCHIVED`).
#[must_use]
pub fn sync_archived_from_env() -> bool {
    env_flag("NOTESYNC_SYNC_ARCHIVED")
}

/// Build a [`SyncConfig`] from CLI flags and the environment.
///
/// # Errors
///
/// Returns `Error::Config` if no sync directory can be determined.
pub fn load_sync_config(explicit_dir: Option<&Path>, archived_flag: bool) -> Result<SyncConfig> {
    let dir = resolve_sync_dir(explicit_dir)
        .ok_or_else(|| Error::Config("Could not determine sync directory".to_string()))?;
    Ok(SyncConfig::new(dir).with_archived(archived_flag || sync_archived_from_env()))
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_dir_only_when_enabled() {
        let config = SyncConfig::new("/tmp/notes");
        assert!(config.archive_dir().is_none());

        let config = config.with_archived(true);
        assert_eq!(
            config.archive_dir(),
            Some(PathBuf::from("/tmp/notes").join(ARCHIVE_DIR_NAME))
        );
    }

    #[test]
    fn test_relative_sync_dir_made_absolute() {
        let config = SyncConfig::new("relative/notes");
        assert!(config.sync_dir().is_absolute());
        assert!(config.sync_dir().ends_with("relative/notes"));
    }

    #[test]
    fn test_explicit_paths_win() {
        let explicit = PathBuf::from("/explicit/cache.db");
        assert_eq!(resolve_cache_path(Some(&explicit)), Some(explicit));

        let dir = PathBuf::from("/explicit/notes");
        assert_eq!(resolve_sync_dir(Some(&dir)), Some(dir));
    }
}
