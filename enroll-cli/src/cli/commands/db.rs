//! Database maintenance commands

use anyhow::Result;
use colored::*;

use crate::cli::DbCommands;
use crate::config;
use crate::store::SqliteStore;

pub async fn handle_db(command: DbCommands) -> Result<()> {
    match command {
        DbCommands::Init { db } => {
            let path = db.unwrap_or_else(config::default_db_path);
            SqliteStore::open(&path).await?;
            println!(
                "Database ready at {}",
                path.display().to_string().green()
            );
            Ok(())
        }
    }
}
