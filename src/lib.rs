//! notesync - two-way mirror between a note store and plain-text files.
//!
//! # Architecture
//!
//! - [`model`] - Notes, checklist items and their edit operations
//! - [`codec`] - Note ↔ text file lines, checklist reconciliation
//! - [`sync`] - Addressing, export/import, the sync engine and session
//! - [`dispatch`] - Keyed background task scheduling
//! - [`storage`] - Note store trait and the SQLite snapshot cache
//! - [`config`] - Sync directory and cache path resolution
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;

pub use error::{Error, Result};
