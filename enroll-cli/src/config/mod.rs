//! Static configuration: alias and software tables
//!
//! Both tables are fixed data, loaded once before the first row is
//! processed and never mutated afterwards, so the pipeline can read them
//! without locks.

mod tables;

pub use tables::{SoftwareColumn, Tables, fields};

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

static TABLES: OnceCell<Tables> = OnceCell::new();

/// Load the process-wide tables, optionally merging a TOML override file on
/// top of the builtins. When `path` is `None`, `tables.toml` under the user
/// config directory is used if it exists. Idempotent; the first successful
/// call wins.
pub fn init_tables(path: Option<&Path>) -> Result<&'static Tables> {
    if let Some(tables) = TABLES.get() {
        return Ok(tables);
    }

    let mut tables = Tables::builtin();
    let override_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => default_tables_path().filter(|p| p.exists()),
    };
    if let Some(p) = override_path {
        let content = std::fs::read_to_string(&p)
            .with_context(|| format!("Failed to read tables file: {}", p.display()))?;
        tables
            .apply_overrides(&content)
            .with_context(|| format!("Invalid tables file: {}", p.display()))?;
        log::info!("Loaded table overrides from {}", p.display());
    }

    Ok(TABLES.get_or_init(|| tables))
}

fn default_tables_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("enroll-cli").join("tables.toml"))
}

/// Default database location under the user data directory.
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_dir()
        .map(|d| d.join("enroll-cli").join("enroll.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("enroll.db"))
}
