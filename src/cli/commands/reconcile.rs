//! Offline reconciliation.
//!
//! Runs a full startup pass against the cached snapshot with no remote
//! changes: edited files are loaded into their notes, notes without a file
//! are written, orphaned files are soft-deleted and files without an id
//! become new notes. Renames are applied on disk and the result is saved
//! back to the cache.

use std::collections::HashSet;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use crate::cli::commands::open_cache;
use crate::config::load_sync_config;
use crate::error::Result;
use crate::storage::{MemoryStore, NoteStore};
use crate::sync::{apply_renames, RenameMap, SyncEngine, SyncStats};

#[derive(Serialize)]
struct ReconcileOutput {
    sync_dir: String,
    stats: SyncStats,
    renames: RenameMap,
    moved: usize,
    dirty: usize,
}

/// Execute the reconcile command.
///
/// # Errors
///
/// Returns `Error::NotInitialized` without a cache, or the first sync or
/// cache error.
pub fn execute(
    cache: Option<&Path>,
    sync_dir: Option<&Path>,
    archived: bool,
    json: bool,
) -> Result<()> {
    let (_, mut cache) = open_cache(cache)?;
    let config = load_sync_config(sync_dir, archived)?;
    let snapshot = cache.load()?;

    let mut store = MemoryStore::new();
    let mut engine = SyncEngine::new(config);
    engine.start(&mut store, snapshot.as_ref())?;
    let outcome = engine.finish_startup(&mut store, &HashSet::new())?;
    let moved = apply_renames(&outcome.renames)?;
    engine.shutdown();

    cache.save(&store.dump())?;

    if json {
        let output = ReconcileOutput {
            sync_dir: engine.config().sync_dir().display().to_string(),
            stats: outcome.stats,
            renames: outcome.renames,
            moved,
            dirty: store.dirty_ids().len(),
        };
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    let stats = outcome.stats;
    if stats.is_empty() && moved == 0 {
        println!("{}", "Already in sync".green());
        return Ok(());
    }

    println!("Reconciled {}", engine.config().sync_dir().display());
    let rows = [
        ("written", stats.written),
        ("updated", stats.overwritten),
        ("loaded", stats.loaded),
        ("conflicts", stats.conflicts),
        ("soft-deleted", stats.soft_deleted),
        ("created", stats.created),
        ("renamed", moved),
    ];
    for (label, count) in rows.into_iter().filter(|(_, count)| *count > 0) {
        let line = format!("  {label:<13} {count}");
        if label == "conflicts" || label == "soft-deleted" {
            println!("{}", line.yellow());
        } else {
            println!("{line}");
        }
    }
    if stats.conflicts > 0 {
        println!(
            "{}",
            "  Conflicting notes were backed up as trashed '[Backup ...]' notes.".dimmed()
        );
    }

    Ok(())
}
