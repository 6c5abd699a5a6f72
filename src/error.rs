//! Error types for the notesync CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=cache, 3=not_found, 4=validation, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::SyncError;

/// Result type alias for notesync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Cache (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    NoteNotFound,
    AmbiguousId,

    // Validation (exit 4)
    InvalidState,

    // Sync (exit 6)
    SyncError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NoteNotFound => "NOTE_NOT_FOUND",
            Self::AmbiguousId => "AMBIGUOUS_ID",
            Self::InvalidState => "INVALID_STATE",
            Self::SyncError => "SYNC_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Category-based exit code (2-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::NoteNotFound | Self::AmbiguousId => 3,
            Self::InvalidState => 4,
            Self::SyncError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying with corrected input can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AmbiguousId | Self::DatabaseError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors surfaced by the notesync CLI.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `notesync init` first")]
    NotInitialized { path: PathBuf },

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Note not found: {id}")]
    NoteNotFound { id: String },

    #[error("Note not found: {id} (did you mean: {}?)", similar.join(", "))]
    NoteNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Ambiguous id '{id}' matches {} notes", matches.len())]
    AmbiguousId { id: String, matches: Vec<String> },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized { .. } => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::NoteNotFound { .. } | Self::NoteNotFoundSimilar { .. } => {
                ErrorCode::NoteNotFound
            }
            Self::AmbiguousId { .. } => ErrorCode::AmbiguousId,
            Self::Sync(SyncError::InvalidState { .. }) => ErrorCode::InvalidState,
            Self::Sync(SyncError::NoteNotFound(_)) => ErrorCode::NoteNotFound,
            Self::Sync(SyncError::Io(_)) => ErrorCode::IoError,
            Self::Sync(SyncError::Json(_)) => ErrorCode::JsonError,
            Self::Sync(SyncError::Database(_)) => ErrorCode::SyncError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Recovery hint, if one applies.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized { path } => Some(format!(
                "No snapshot cache at {}. Run `notesync init` to create one.",
                path.display()
            )),

            Self::AlreadyInitialized { path } => Some(format!(
                "Cache already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::NoteNotFound { id } => Some(format!(
                "No note with ID '{id}'. Use `notesync list` to see cached notes."
            )),
            Self::NoteNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::AmbiguousId { matches, .. } => {
                let mut hint = String::from("Use a longer prefix. Candidates:\n");
                for id in matches.iter().take(5) {
                    hint.push_str(&format!("    {id}\n"));
                }
                if matches.len() > 5 {
                    hint.push_str(&format!("    ... and {} more", matches.len() - 5));
                }
                Some(hint.trim_end().to_string())
            }

            Self::Sync(SyncError::InvalidState { .. }) => Some(
                "The sync engine was not in the right state. Retry after the current sync finishes."
                    .to_string(),
            ),

            Self::Config(_) => Some(
                "Check --sync-dir / NOTESYNC_DIR and --cache / NOTESYNC_CACHE.".to_string(),
            ),

            Self::Database(_) | Self::Sync(_) | Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
