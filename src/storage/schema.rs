//! Snapshot cache schema.

use rusqlite::{Connection, Result};

/// Current schema version, recorded in `sync_meta`.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The SQL schema for the snapshot cache.
///
/// Timestamps are stored as INTEGER (Unix milliseconds). Each note is
/// stored whole as JSON in `data`; `kind` and `updated_at` are copied out
/// for listing without deserializing.
pub const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at DESC);

CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Apply pragmas and create tables.
///
/// # Errors
///
/// Returns an error if a pragma or statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO sync_meta (key, value) VALUES ('schema_version', ?1)",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
