//! Two-way mirror between the note store and a directory of text files.
//!
//! - **Export**: notes → `.note` files, located by the id in each header
//! - **Import**: edited files → notes; files without an id become new notes
//! - **Engine**: the startup/steady-state state machine and conflict rules
//! - **Session**: runs engine operations on background threads
//!
//! # Layout
//!
//! ```text
//! <sync_dir>/
//!   Groceries.note             # unique title
//!   Foo:3f2a...9c.note         # title shared by several notes
//!   Old.note.local             # soft-deleted, never read again
//!   archived/                  # only when archived sync is enabled
//!     Trip.note
//! ```
//!
//! Notes without a file (trashed, or archived while archived sync is off)
//! have a virtual address `note://<id>/<title>.note`. Rename maps returned
//! by the engine use these addresses so a host can retarget open buffers.
//!
//! # Example
//!
//! ```ignore
//! use notesync::sync::{SyncEngine, apply_renames};
//!
//! let mut engine = SyncEngine::new(config);
//! engine.start(&mut store, cached.as_ref())?;
//! // ... remote sync fills the store ...
//! let outcome = engine.finish_startup(&mut store, &updated)?;
//! apply_renames(&outcome.renames)?;
//! ```

pub mod address;
pub mod backup;
pub mod engine;
pub mod export;
pub mod file;
pub mod hash;
pub mod import;
pub mod session;
pub mod types;

pub use address::{escape, file_name, file_path, FileRef, NoteAddress, VIRTUAL_SCHEME};
pub use backup::{backup_note, backup_title};
pub use engine::SyncEngine;
pub use export::{write_back, Exporter, Placement};
pub use file::{apply_renames, atomic_write, find_files, soft_delete, LOCAL_SUFFIX};
pub use hash::{content_hash, file_hash};
pub use import::{create_note_from_file, load_file, load_new_files};
pub use session::SyncSession;
pub use types::{
    NoteFile, RenameMap, StateCell, SyncError, SyncOutcome, SyncResult, SyncState, SyncStats,
};
