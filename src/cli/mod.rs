//! CLI definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// notesync - mirror notes into a directory of plain text files
#[derive(Parser, Debug)]
#[command(name = "notesync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Sync directory (default: ~/notes)
    #[arg(long, global = true, env = "NOTESYNC_DIR")]
    pub sync_dir: Option<PathBuf>,

    /// Snapshot cache path (default: ~/.notesync/data/cache.db)
    #[arg(long, global = true, env = "NOTESYNC_CACHE")]
    pub cache: Option<PathBuf>,

    /// Mirror archived notes into `archived/`
    #[arg(long, global = true)]
    pub archived: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty snapshot cache
    Init {
        /// Overwrite an existing cache
        #[arg(long)]
        force: bool,
    },

    /// Show the cache and files edited since the last reconcile
    Status,

    /// Reconcile the sync directory with the cached notes
    Reconcile,

    /// List cached notes
    List {
        /// Include trashed notes
        #[arg(long)]
        trashed: bool,
    },

    /// Print a cached note in file form
    Show {
        /// Note ID or unique prefix
        id: String,
    },

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}
