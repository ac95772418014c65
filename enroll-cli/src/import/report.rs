//! Per-batch outcome aggregation
//!
//! Pure accumulation; counts plus an ordered error list keyed by the
//! 1-based source row number so operators can find the bad row in the
//! original file. Never persisted; serialized back to the caller as
//! `{ success, failed, errors: [{ row, error }] }`.

use serde::Serialize;

/// One failed row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowFailure {
    /// 1-based row number in the source file (header row is 1)
    pub row: usize,
    pub error: String,
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub failed: usize,
    pub errors: Vec<RowFailure>,
}

impl ImportReport {
    pub fn new() -> Self {
        ImportReport::default()
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, row: usize, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(RowFailure {
            row,
            error: error.into(),
        });
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_error_order() {
        let mut report = ImportReport::new();
        report.record_success();
        report.record_failure(3, "bad phone");
        report.record_success();
        report.record_failure(7, "missing identity");

        assert_eq!(report.success, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.total(), 4);
        assert_eq!(
            report.errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![3, 7]
        );
    }

    #[test]
    fn test_serializes_to_result_shape() {
        let mut report = ImportReport::new();
        report.record_success();
        report.record_failure(2, "invalid phone: 12345");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["errors"][0]["row"], 2);
        assert_eq!(json["errors"][0]["error"], "invalid phone: 12345");
    }
}
