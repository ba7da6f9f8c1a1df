//! # worm
//!
//! Command-line interface for the bibworm bibliography manager.

use anyhow::{Context, Result};
use bibworm::confirm::{Confirm, FixedAnswer, TerminalPrompt};
use bibworm::config::{CONFIG_FILE_NAME, Config};
use bibworm::source::{DblpSource, HttpClient, ScholarSource};
use bibworm::{AddOutcome, Library};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
#[cfg(feature = "clipboard")]
use tracing::warn;

const USER_AGENT: &str = concat!("bibworm/", env!("CARGO_PKG_VERSION"));

// Scholar serves an empty page to unknown agents
const BROWSER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

#[derive(Parser)]
#[command(name = "worm")]
#[command(author, version, about = "Keep a tidy BibTeX bibliography fed from DBLP and Google Scholar", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Add an entry by DBLP key (DBLP:...) or by title
    Add {
        /// DBLP key or publication title
        query: String,

        /// Search Google Scholar only
        #[arg(long)]
        scholar: bool,

        /// Add without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete an entry from the database
    Delete {
        /// Citation key of the entry
        id: String,
    },

    /// Render the bibliography file from the database
    Write,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { force } => init(&cli.config, force),
        Commands::Add {
            query,
            scholar,
            yes,
        } => add(&cli.config, &query, scholar, yes),
        Commands::Delete { id } => {
            let mut library = Library::open(&cli.config)?;
            library.delete(&id)?;
            println!("Deleted {id}");
            Ok(())
        }
        Commands::Write => {
            let library = Library::open(&cli.config)?;
            let rendered = library.write()?;
            println!(
                "Wrote {} entries to {} ({} skipped)",
                rendered.entries,
                library.config().bib_path().display(),
                rendered.skipped.len()
            );
            Ok(())
        }
    }
}

fn init(config_path: &Path, force: bool) -> Result<()> {
    let written = Config::write_template(config_path, force)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    if written {
        println!("Created {}", config_path.display());
    } else {
        println!(
            "{} already exists, use --force to overwrite it",
            config_path.display()
        );
    }
    Ok(())
}

fn add(config_path: &Path, query: &str, scholar_only: bool, yes: bool) -> Result<()> {
    let mut library = Library::open(config_path)?;
    let dblp = DblpSource::new(HttpClient::new(USER_AGENT)?);
    let scholar = ScholarSource::new(HttpClient::new(BROWSER_AGENT)?);

    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(FixedAnswer::approve())
    } else {
        Box::new(TerminalPrompt::stdio())
    };

    let outcome = if scholar_only {
        library.add_from_secondary(query, &scholar, &mut *confirm)?
    } else {
        library.add(query, &dblp, &scholar, &mut *confirm)?
    };

    match outcome {
        AddOutcome::Added(id) => {
            println!("Added {id}");
            copy_key(&id);
        }
        AddOutcome::Declined(_) => println!("Entry discarded"),
    }
    Ok(())
}

/// Puts the citation key of a new entry on the clipboard, ready to paste
/// into a `\cite{}`.
#[cfg(feature = "clipboard")]
fn copy_key(id: &str) {
    match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(id)) {
        Ok(()) => info!(%id, "copied key to clipboard"),
        Err(e) => warn!("could not copy {id} to the clipboard: {e}"),
    }
}

#[cfg(not(feature = "clipboard"))]
fn copy_key(id: &str) {
    info!(%id, "clipboard support not built in, key not copied");
}
