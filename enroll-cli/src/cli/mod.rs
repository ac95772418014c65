//! Command-line interface

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "enroll-cli", about = "Bulk enrollment spreadsheet ingestion", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import an enrollment spreadsheet into the identity store
    Import(ImportArgs),
    /// Database maintenance
    #[command(subcommand)]
    Db(DbCommands),
}

#[derive(Parser)]
pub struct ImportArgs {
    /// Path to the .xlsx or .csv file to import
    pub file: PathBuf,

    /// Database file (defaults to the user data directory)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Worksheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,

    /// TOML file overriding the builtin alias/software tables
    #[arg(long)]
    pub tables: Option<PathBuf>,

    /// Run the full pipeline against an in-memory store; nothing persists
    #[arg(long)]
    pub dry_run: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Create the database and schema
    Init {
        /// Database file (defaults to the user data directory)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import(args) => commands::import::handle_import(args).await,
        Commands::Db(command) => commands::db::handle_db(command).await,
    }
}
