//! Note → file export.
//!
//! The [`Exporter`] places each note at its target address. Existing files
//! are found by the id in their header, so a note whose title changed is
//! still written to the file the user has open; the rename is reported for
//! the host to apply.
//!
//! What happens when content differs is up to the caller: steady-state
//! write-back always overwrites, while startup reconciliation consults the
//! protected set first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::SyncConfig;
use crate::sync::address::NoteAddress;
use crate::sync::file::{ensure_sync_dirs, find_files, soft_delete, write_lines};
use crate::sync::hash::{content_hash, file_hash};
use crate::sync::types::{NoteFile, SyncOutcome, SyncResult};

/// What [`Exporter::export`] found at a note's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The note has no file; any old file was soft-deleted.
    Virtual,
    /// The file did not exist and was written.
    Created(PathBuf),
    /// The file already holds exactly this content.
    Unchanged(PathBuf),
    /// The file exists with other content; nothing was written yet.
    Differs(PathBuf),
}

/// Exports notes into the sync directory.
pub struct Exporter<'a> {
    config: &'a SyncConfig,
    files_by_id: HashMap<String, PathBuf>,
    outcome: SyncOutcome,
}

impl<'a> Exporter<'a> {
    /// Scan the sync directory and prepare for a pass.
    ///
    /// Creates the sync root (and `archived/` when enabled).
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or scanned.
    pub fn new(config: &'a SyncConfig) -> SyncResult<Self> {
        ensure_sync_dirs(config)?;
        let files_by_id = find_files(config)?
            .into_iter()
            .filter_map(|(path, file_ref)| file_ref.id.map(|id| (id, path)))
            .collect();
        Ok(Self {
            config,
            files_by_id,
            outcome: SyncOutcome::default(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        self.config
    }

    /// Place one note.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read, written or renamed.
    pub fn export(&mut self, file: &NoteFile) -> SyncResult<Placement> {
        let existing = self.files_by_id.remove(&file.id);

        let (NoteAddress::File(path), Some(lines)) = (&file.address, &file.lines) else {
            if let Some(existing) = existing.filter(|p| p.exists()) {
                soft_delete(&existing)?;
                self.outcome.stats.soft_deleted += 1;
                self.outcome
                    .renames
                    .insert(existing.display().to_string(), file.address.to_string());
            }
            return Ok(Placement::Virtual);
        };

        let target = match existing {
            Some(existing) => {
                if existing != *path {
                    self.outcome
                        .renames
                        .insert(existing.display().to_string(), path.display().to_string());
                }
                existing
            }
            None => path.clone(),
        };

        if !target.exists() {
            info!(file = %target.display(), "Writing note file");
            write_lines(&target, lines)?;
            self.outcome.stats.written += 1;
            if target == *path {
                self.outcome
                    .renames
                    .insert(file.virtual_address().to_string(), path.display().to_string());
            }
            return Ok(Placement::Created(target));
        }

        if content_hash(lines) == file_hash(&target)? {
            Ok(Placement::Unchanged(target))
        } else {
            Ok(Placement::Differs(target))
        }
    }

    /// Replace a file's content with the note's serialized form.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn overwrite(&mut self, path: &Path, file: &NoteFile) -> SyncResult<()> {
        if let Some(lines) = &file.lines {
            info!(file = %path.display(), "Updating note file");
            write_lines(path, lines)?;
            self.outcome.stats.overwritten += 1;
        }
        Ok(())
    }

    /// Mutable access to the running totals.
    pub fn outcome_mut(&mut self) -> &mut SyncOutcome {
        &mut self.outcome
    }

    /// Finish the pass.
    ///
    /// Returns files whose header id matched no exported note (sorted by
    /// path) together with the accumulated outcome.
    #[must_use]
    pub fn finish(self) -> (Vec<PathBuf>, SyncOutcome) {
        let mut unmatched: Vec<PathBuf> = self.files_by_id.into_values().collect();
        unmatched.sort();
        (unmatched, self.outcome)
    }
}

/// Steady-state write-back of changed notes.
///
/// Never consults the note store: `files` carries everything needed.
/// Virtual targets soft-delete any existing file, differing content is
/// rewritten, absent files are created and identical files are left alone.
/// Files of notes not in `files` are not touched.
///
/// # Errors
///
/// Returns an error on the first I/O failure. Files already written stay
/// written.
pub fn write_back(config: &SyncConfig, files: &[NoteFile]) -> SyncResult<SyncOutcome> {
    let mut exporter = Exporter::new(config)?;
    for file in files {
        if let Placement::Differs(path) = exporter.export(file)? {
            exporter.overwrite(&path, file)?;
        }
    }
    Ok(exporter.finish().1)
}
