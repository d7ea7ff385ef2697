//! mediactl - command-line front end for the media store
//!
//! Subcommands:
//! - `mediactl save <dest> <files...>` - Upload files into a folder
//! - `mediactl list [path]` - List a folder as JSON
//! - `mediactl config` - Show the resolved configuration
//! - `mediactl purge --yes` - Delete all stored content

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mediaconf::MediaConfig;
use mediactl::{commands, telemetry};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediactl")]
#[command(about = "Hierarchical media storage with deduplicated atomic uploads")]
#[command(version)]
struct Cli {
    /// Config file used in place of ./mediastore.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files into a folder
    Save {
        /// Destination folder (slash-delimited, empty for the root)
        dest: String,

        /// Files to upload; `-` reads stdin
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// File name used for content read from stdin
        #[arg(long, default_value = "stdin.bin")]
        stdin_name: String,
    },

    /// List the files and folders directly under a path
    List {
        /// Folder to list
        #[arg(default_value = "")]
        path: String,

        /// Entries to skip
        #[arg(short, long, default_value = "0")]
        start: usize,

        /// Maximum entries to print
        #[arg(short = 'n', long, default_value_t = usize::MAX)]
        count: usize,
    },

    /// Print the resolved configuration and where it came from
    Config,

    /// Delete all stored content
    Purge {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = MediaConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    telemetry::init(&config.telemetry.log_level);
    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Save {
            dest,
            files,
            stdin_name,
        } => {
            let store = commands::open_store(&config)?;
            let mut uploads = commands::read_sources(&files, &stdin_name, &mut io::stdin())?;
            commands::save(&store, &dest, &mut uploads, &mut stdout)?;
        }
        Commands::List { path, start, count } => {
            let store = commands::open_store(&config)?;
            commands::list(&store, &path, start, count, &mut stdout)?;
        }
        Commands::Config => {
            commands::show_config(&config, &sources, &mut stdout)?;
        }
        Commands::Purge { yes } => {
            let store = commands::open_store(&config)?;
            commands::purge(&store, yes)?;
        }
    }

    Ok(())
}
