//! Create the snapshot cache.
//!
//! A fresh cache holds no snapshot, so the first `reconcile` treats every
//! file in the sync directory as edited and lets it win.

use crate::cli::commands::cache_path;
use crate::config::load_sync_config;
use crate::error::{Error, Result};
use crate::storage::SnapshotCache;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct InitOutput {
    cache: PathBuf,
    sync_dir: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `Error::AlreadyInitialized` if a cache exists and `force` is not
/// set, or an error if the cache cannot be created.
pub fn execute(
    cache: Option<&Path>,
    sync_dir: Option<&Path>,
    archived: bool,
    force: bool,
    json: bool,
) -> Result<()> {
    let path = cache_path(cache)?;
    let config = load_sync_config(sync_dir, archived)?;

    if path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path });
        }
        fs::remove_file(&path)?;
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = path.clone().into_os_string();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                fs::remove_file(sidecar)?;
            }
        }
    }

    SnapshotCache::open(&path)?;
    fs::create_dir_all(config.sync_dir())?;

    if json {
        let output = InitOutput {
            cache: path,
            sync_dir: config.sync_dir().to_path_buf(),
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized notesync cache");
        println!("  Cache:    {}", path.display());
        println!("  Sync dir: {}", config.sync_dir().display());
        println!();
        println!("Next: run 'notesync reconcile' to pick up files in the sync directory.");
    }

    Ok(())
}
