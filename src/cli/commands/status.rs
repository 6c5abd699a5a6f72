//! Status command implementation.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::open_cache;
use crate::config::load_sync_config;
use crate::error::Result;
use crate::storage::MemoryStore;
use crate::sync::{find_files, SyncEngine};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    cache: String,
    sync_dir: String,
    snapshot: bool,
    saved_at: Option<i64>,
    note_count: usize,
    dirty_count: usize,
    edited: Vec<String>,
    untracked: Vec<String>,
}

/// Execute status command.
///
/// Runs the startup check against the cached snapshot without writing
/// anything: `edited` lists files that would win over the cached note,
/// `untracked` lists files that would become new notes.
///
/// # Errors
///
/// Returns `Error::NotInitialized` without a cache, or an error if the
/// cache or sync directory cannot be read.
pub fn execute(
    cache: Option<&Path>,
    sync_dir: Option<&Path>,
    archived: bool,
    json: bool,
) -> Result<()> {
    let (cache_path, cache) = open_cache(cache)?;
    let config = load_sync_config(sync_dir, archived)?;
    let snapshot = cache.load()?;

    let mut store = MemoryStore::new();
    let mut engine = SyncEngine::new(config);
    engine.start(&mut store, snapshot.as_ref())?;

    let untracked: Vec<String> = find_files(engine.config())?
        .into_iter()
        .filter(|(_, file_ref)| file_ref.id.is_none())
        .map(|(path, _)| path.display().to_string())
        .collect();
    let mut edited: Vec<String> = engine
        .protected_files()
        .iter()
        .map(|path| path.display().to_string())
        .filter(|path| !untracked.contains(path))
        .collect();
    edited.sort();

    let output = StatusOutput {
        cache: cache_path.display().to_string(),
        sync_dir: engine.config().sync_dir().display().to_string(),
        snapshot: snapshot.is_some(),
        saved_at: cache.saved_at()?,
        note_count: store.len(),
        dirty_count: store.dirty_ids().len(),
        edited,
        untracked,
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Cache:    {}", output.cache);
    println!("Sync dir: {}", output.sync_dir);
    if output.snapshot {
        println!(
            "Notes:    {} ({} with local changes)",
            output.note_count, output.dirty_count
        );
    } else {
        println!("{}", "No snapshot yet: every file counts as edited".yellow());
    }

    if output.edited.is_empty() && output.untracked.is_empty() {
        println!("{}", "Sync directory matches the cache".green());
        return Ok(());
    }
    if !output.edited.is_empty() {
        println!();
        println!("{}", "Edited files".cyan().bold());
        for path in &output.edited {
            println!("  {path}");
        }
    }
    if !output.untracked.is_empty() {
        println!();
        println!("{}", "Untracked files".cyan().bold());
        for path in &output.untracked {
            println!("  {}", path.dimmed());
        }
    }

    Ok(())
}
