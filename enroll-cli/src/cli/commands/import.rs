//! Import command handler

use anyhow::{Context, Result};
use colored::*;

use crate::cli::{ImportArgs, ReportFormat};
use crate::config;
use crate::import::{self, ImportReport};
use crate::store::{MemoryStore, SqliteStore};

pub async fn handle_import(args: ImportArgs) -> Result<()> {
    let tables = config::init_tables(args.tables.as_deref())?;

    let sheet = import::read_file(&args.file, args.sheet.as_deref())?;
    if sheet.is_empty() {
        anyhow::bail!("File contains no data rows: {}", args.file.display());
    }
    log::debug!(
        "{}: {} columns, {} data rows",
        sheet.source,
        sheet.headers.len(),
        sheet.rows.len()
    );

    let report = if args.dry_run {
        log::info!("Dry run: importing into an in-memory store");
        let store = MemoryStore::new();
        import::run_import(&store, tables, &sheet).await
    } else {
        let db_path = args.db.clone().unwrap_or_else(config::default_db_path);
        let store = SqliteStore::open(&db_path).await?;
        import::run_import(&store, tables, &sheet).await
    };

    match args.format {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report")?;
            println!("{}", json);
        }
        ReportFormat::Text => print_report(&args, &report),
    }

    // Row failures are part of the report, not a process failure; only
    // fatal/setup errors exit nonzero.
    Ok(())
}

fn print_report(args: &ImportArgs, report: &ImportReport) {
    println!();
    println!(
        "Imported {} ({} rows)",
        args.file.display().to_string().cyan(),
        report.total()
    );
    println!("  {} {}", "succeeded:".green(), report.success);
    if report.has_failures() {
        println!("  {} {}", "failed:".red(), report.failed);
        println!();
        for failure in &report.errors {
            println!(
                "  {} {}: {}",
                "row".dimmed(),
                failure.row.to_string().bold(),
                failure.error
            );
        }
    } else {
        println!("  {} 0", "failed:".dimmed());
    }
    if args.dry_run {
        println!();
        println!("{}", "Dry run: no changes were persisted".yellow());
    }
}
