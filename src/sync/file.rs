//! Atomic file operations for sync.
//!
//! This module provides the file-level primitives write-back is built on:
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - Soft-delete: move a file aside to `<path>.local`
//! - Scanning the sync directory for note files

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::sync::address::{address_from_path, is_virtual_address, FileRef};
use crate::sync::types::{RenameMap, SyncResult};

/// Suffix appended to soft-deleted files.
pub const LOCAL_SUFFIX: &str = ".local";

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file (`<path>.tmp`)
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> SyncResult<()> {
    let temp_path = with_suffix(path, ".tmp");

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

/// Write lines to a file atomically, each terminated by `\n`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> SyncResult<()> {
    let mut content = String::new();
    for line in lines {
        content.push_str(line.as_ref());
        content.push('\n');
    }
    atomic_write(path, &content)
}

/// Path a soft-deleted file is moved to.
#[must_use]
pub fn local_path(path: &Path) -> PathBuf {
    with_suffix(path, LOCAL_SUFFIX)
}

/// Move a file aside to `<path>.local`, replacing any earlier copy.
///
/// # Errors
///
/// Returns an error if the rename fails.
pub fn soft_delete(path: &Path) -> SyncResult<PathBuf> {
    let target = local_path(path);
    warn!(file = %path.display(), backup = %target.display(), "Moving local file aside");
    fs::rename(path, &target)?;
    Ok(target)
}

/// Create the sync root and, when archival sync is on, `archived/`.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn ensure_sync_dirs(config: &SyncConfig) -> SyncResult<()> {
    fs::create_dir_all(config.sync_dir())?;
    if let Some(archive) = config.archive_dir() {
        fs::create_dir_all(archive)?;
    }
    Ok(())
}

/// Find every note file under the sync directory.
///
/// Files that do not resolve to a note address are skipped. Results are
/// sorted by path. A missing sync directory yields no files.
///
/// # Errors
///
/// Returns an error if a directory or file header cannot be read.
pub fn find_files(config: &SyncConfig) -> SyncResult<Vec<(PathBuf, FileRef)>> {
    let mut paths = Vec::new();
    if config.sync_dir().is_dir() {
        collect_files(config.sync_dir(), &mut paths)?;
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(file_ref) = address_from_path(config, &path)? {
            files.push((path, file_ref));
        }
    }
    debug!(dir = %config.sync_dir().display(), count = files.len(), "Scanned sync directory");
    Ok(files)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> SyncResult<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

/// Apply a rename map to files on disk.
///
/// For hosts without open buffers: every entry whose source is an existing
/// file and whose target is a free path is renamed. Virtual addresses on
/// either side are skipped. Returns the number of files moved.
///
/// # Errors
///
/// Returns an error if a rename fails.
pub fn apply_renames(renames: &RenameMap) -> SyncResult<usize> {
    let mut moved = 0;
    for (old, new) in renames {
        if is_virtual_address(old) || is_virtual_address(new) {
            continue;
        }
        let (old, new) = (Path::new(old), Path::new(new));
        if !old.is_file() {
            continue;
        }
        if new.exists() {
            warn!(from = %old.display(), to = %new.display(), "Rename target exists, leaving file in place");
            continue;
        }
        if let Some(parent) = new.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(from = %old.display(), to = %new.display(), "Renaming note file");
        fs::rename(old, new)?;
        moved += 1;
    }
    Ok(moved)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("test.note");

        atomic_write(&path, "line 1\nline 2\n").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "line 1\nline 2\n");
        assert!(!local_path(&path).exists());
        assert!(!with_suffix(&path, ".tmp").exists());
    }

    #[test]
    fn test_write_lines_terminates_each_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.note");

        write_lines(&path, &["a", "", "b"]).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a\n\nb\n");
    }

    #[test]
    fn test_soft_delete() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Foo.note");
        fs::write(&path, "x\n").unwrap();

        let moved = soft_delete(&path).unwrap();

        assert!(!path.exists());
        assert_eq!(moved, temp_dir.path().join("Foo.note.local"));
        assert_eq!(fs::read_to_string(moved).unwrap(), "x\n");
    }

    #[test]
    fn test_find_files_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::new(temp_dir.path());
        let root = config.sync_dir().to_path_buf();
        fs::create_dir_all(root.join("archived")).unwrap();
        fs::write(root.join("b.note"), "# B\nid: 2\n").unwrap();
        fs::write(root.join("a.note"), "# A\nid: 1\n").unwrap();
        fs::write(root.join("archived").join("c.note"), "no header\n").unwrap();
        fs::write(root.join("a.note.local"), "# A\nid: 1\n").unwrap();
        fs::write(root.join("readme.txt"), "ignored\n").unwrap();

        let files = find_files(&config).unwrap();
        let names: Vec<_> = files.iter().map(|(_, r)| r.title.as_str()).collect();

        assert_eq!(names, vec!["A", "c", "B"]);
        assert_eq!(files[0].1.id.as_deref(), Some("1"));
        assert!(files[1].1.id.is_none());
    }

    #[test]
    fn test_find_files_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = SyncConfig::new(temp_dir.path().join("absent"));
        assert!(find_files(&config).unwrap().is_empty());
    }

    #[test]
    fn test_apply_renames() {
        let temp_dir = TempDir::new().unwrap();
        let old = temp_dir.path().join("Old.note");
        let new = temp_dir.path().join("New.note");
        fs::write(&old, "x\n").unwrap();

        let mut renames = RenameMap::new();
        renames.insert(old.display().to_string(), new.display().to_string());
        renames.insert("note://abc/Gone.note".into(), temp_dir.path().join("Gone.note").display().to_string());

        assert_eq!(apply_renames(&renames).unwrap(), 1);
        assert!(!old.exists());
        assert!(new.exists());
    }
}
