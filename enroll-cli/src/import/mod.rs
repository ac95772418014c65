//! Bulk enrollment ingestion pipeline
//!
//! Raw tabular rows flow through alias resolution, date and identity
//! normalization, identity resolution, and per-row transactional upserts.
//! Each row succeeds or fails on its own; the batch always yields a
//! report, even at 100% failure.

pub mod alias;
pub mod dates;
pub mod identity;
pub mod report;
pub mod resolver;
pub mod row;
pub mod sheet;
pub mod software;
pub mod value;

pub use report::{ImportReport, RowFailure};
pub use row::{RowError, process_row};
pub use sheet::{SheetData, read_file};
pub use value::{CellValue, RawRow};

use crate::config::Tables;
use crate::store::ImportStore;

/// Run the pipeline over a materialized sheet.
///
/// Rows are processed sequentially: identity lookup and create for rows
/// naming the same person must be serialized, and within one batch that is
/// every row until proven otherwise.
pub async fn run_import(
    store: &dyn ImportStore,
    tables: &Tables,
    sheet: &SheetData,
) -> ImportReport {
    let mut report = ImportReport::new();

    for row in &sheet.rows {
        match process_row(store, tables, row).await {
            Ok(()) => report.record_success(),
            Err(error) => {
                log::info!("Row {} failed: {}", row.number, error);
                report.record_failure(row.number, error.to_string());
            }
        }
    }

    log::info!(
        "Import finished: {} succeeded, {} failed of {} rows",
        report.success,
        report.failed,
        report.total()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tables;
    use crate::store::MemoryStore;

    fn sheet_of(rows: Vec<RawRow>) -> SheetData {
        SheetData {
            source: "test.csv".to_string(),
            headers: Vec::new(),
            rows,
        }
    }

    fn row(number: usize, cells: &[(&str, &str)]) -> RawRow {
        let mut row = RawRow::new(number);
        for (header, value) in cells {
            row.insert(*header, CellValue::Text(value.to_string()));
        }
        row
    }

    #[tokio::test]
    async fn test_bad_row_is_isolated_from_siblings() {
        let store = MemoryStore::new();
        let tables = Tables::builtin();

        let sheet = sheet_of(vec![
            row(2, &[("Name", "Jane"), ("Phone", "9876543210")]),
            row(3, &[("Name", "Bob"), ("Phone", "12345")]),
            row(4, &[("Name", "Asha"), ("Phone", "9123456780")]),
        ]);

        let report = run_import(&store, &tables, &sheet).await;

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 3);
        assert!(report.errors[0].error.contains("12345"));

        assert!(store.find_person_by_phone("9876543210").is_some());
        assert!(store.find_person_by_phone("9123456780").is_some());
        assert_eq!(store.person_count(), 2);
    }

    #[tokio::test]
    async fn test_double_import_is_idempotent() {
        let store = MemoryStore::new();
        let tables = Tables::builtin();

        let sheet = sheet_of(vec![row(
            2,
            &[
                ("Name", "Jane"),
                ("Phone", "+91 98765 43210"),
                ("7", "IP"),
            ],
        )]);

        let first = run_import(&store, &tables, &sheet).await;
        let second = run_import(&store, &tables, &sheet).await;

        assert_eq!(first.success, 1);
        assert_eq!(second.success, 1);
        assert_eq!(store.person_count(), 1);
        assert_eq!(store.progress_count(), 1);
    }

    #[tokio::test]
    async fn test_all_rows_failing_still_yields_report() {
        let store = MemoryStore::new();
        let tables = Tables::builtin();

        let sheet = sheet_of(vec![
            row(2, &[("Name", "Jane")]),
            row(3, &[("Name", "Bob")]),
        ]);

        let report = run_import(&store, &tables, &sheet).await;
        assert_eq!(report.success, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(
            report.errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3]
        );
    }
}
