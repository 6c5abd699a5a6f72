//! notesync CLI entry point.

use clap::Parser;
use notesync::cli::commands;
use notesync::cli::{Cli, Commands};
use notesync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let cache = cli.cache.as_deref();
    let sync_dir = cli.sync_dir.as_deref();

    match &cli.command {
        Commands::Init { force } => {
            commands::init::execute(cache, sync_dir, cli.archived, *force, cli.json)
        }
        Commands::Status => commands::status::execute(cache, sync_dir, cli.archived, cli.json),
        Commands::Reconcile => {
            commands::reconcile::execute(cache, sync_dir, cli.archived, cli.json)
        }
        Commands::List { trashed } => commands::list::execute(cache, *trashed, cli.json),
        Commands::Show { id } => commands::show::execute(cache, id, cli.json),
        Commands::Version => commands::version::execute(cli.json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
