use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ConfigLoader;
use crate::storage;

pub mod commands;

use self::commands::{ListArgs, NewArgs};

#[derive(Parser, Debug)]
#[command(
    name = "journal",
    version,
    about = "Editor-driven command-line journaling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over JOURNAL_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over JOURNAL_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose a new journal entry in your editor (default)
    New(NewArgs),
    /// Print the entries recorded in a journal
    List(ListArgs),
    /// List the journals present in the data directory
    Journals,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("JOURNAL_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("JOURNAL_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let store = storage::init(loader.paths(), &config.storage)?;

    let config = Arc::new(config);
    let command = cli
        .command
        .unwrap_or_else(|| Commands::New(NewArgs::default()));
    match command {
        Commands::New(args) => commands::new_entry(config, &store, args),
        Commands::List(args) => commands::list_entries(config, &store, args),
        Commands::Journals => commands::list_journals(&store),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
