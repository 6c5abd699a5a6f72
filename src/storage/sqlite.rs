//! SQLite snapshot cache.
//!
//! Persists the last known remote state between runs so startup can tell
//! which files on disk were edited while the mirror was not running.
//! A save replaces the whole snapshot inside one transaction.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::model::Note;
use crate::storage::notes::Snapshot;
use crate::storage::schema::apply_schema;

const META_VERSION: &str = "version";
const META_SAVED_AT: &str = "saved_at";

/// SQLite-backed snapshot storage.
#[derive(Debug)]
pub struct SnapshotCache {
    conn: Connection,
}

impl SnapshotCache {
    /// Open (or create) a cache at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a cache with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis))?;

        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory cache (for tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any statement fails. The
    /// previous snapshot is kept on error.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM notes", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO notes (id, kind, data, updated_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for note in &snapshot.notes {
                let data = serde_json::to_string(note)?;
                stmt.execute(params![note.id(), note.kind().as_str(), data, note.updated_at()])?;
            }
        }

        match &snapshot.version {
            Some(version) => {
                tx.execute(
                    "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
                    params![META_VERSION, version],
                )?;
            }
            None => {
                tx.execute("DELETE FROM sync_meta WHERE key = ?1", [META_VERSION])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
            params![META_SAVED_AT, now.to_string()],
        )?;

        tx.commit()?;
        debug!(notes = snapshot.notes.len(), "Saved snapshot cache");
        Ok(())
    }

    /// Load the stored snapshot, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a stored note is malformed.
    pub fn load(&self) -> Result<Option<Snapshot>> {
        if self.saved_at()?.is_none() {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare("SELECT data FROM notes ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut notes = Vec::new();
        for data in rows {
            let note: Note = serde_json::from_str(&data?)?;
            notes.push(note);
        }

        Ok(Some(Snapshot {
            version: self.meta(META_VERSION)?,
            notes,
        }))
    }

    /// Forget the stored snapshot (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if a statement fails.
    pub fn clear(&mut self) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM notes", [])?;
        tx.execute(
            "DELETE FROM sync_meta WHERE key IN (?1, ?2)",
            params![META_VERSION, META_SAVED_AT],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Number of cached notes.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn note_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// When the snapshot was last saved (Unix milliseconds).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn saved_at(&self) -> Result<Option<i64>> {
        Ok(self
            .meta(META_SAVED_AT)?
            .and_then(|value| value.parse().ok()))
    }

    fn meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM sync_meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?)
    }
}
