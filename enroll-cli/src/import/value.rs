//! Raw cell representation for imported rows

use chrono::NaiveDate;
use std::collections::HashMap;

/// A single cell as read from the source file, before any field-level
/// normalization. Alias resolution and the normalizers operate purely on
/// this variant so type coercion stays out of the rest of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No cell under this header (distinct from an explicit empty string)
    Absent,
    /// Text cell (may be blank)
    Text(String),
    /// Numeric cell (spreadsheet numbers, including date serials and phones)
    Number(f64),
    /// Boolean cell
    Bool(bool),
    /// Already-parsed calendar date
    Date(NaiveDate),
}

/// Shared sentinel so alias resolution can hand out a reference
/// when no header matches.
pub const ABSENT: CellValue = CellValue::Absent;

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    /// Absent, or text that trims to nothing
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Absent => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell the way it looked in the source file. Whole-number
    /// floats come back without the trailing `.0` so numeric phone and code
    /// cells compare like their text equivalents.
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Absent => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Absent => write!(f, "(absent)"),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d),
        }
    }
}

/// One row of the source file: header → cell, with headers kept in file
/// order so case-insensitive scans are deterministic.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    /// 1-based source row number (header row is 1, first data row is 2)
    pub number: usize,
    headers: Vec<String>,
    cells: HashMap<String, CellValue>,
}

impl RawRow {
    pub fn new(number: usize) -> Self {
        RawRow {
            number,
            headers: Vec::new(),
            cells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: impl Into<String>, value: CellValue) {
        let header = header.into();
        if !self.cells.contains_key(&header) {
            self.headers.push(header.clone());
        }
        self.cells.insert(header, value);
    }

    /// Exact (case-sensitive) header lookup
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells.get(header)
    }

    /// First header equal to `name` ignoring case, in file order
    pub fn get_ignore_case(&self, name: &str) -> Option<&CellValue> {
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
            .and_then(|h| self.cells.get(h))
    }

    /// True when every cell is absent or blank
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_cell_renders_without_fraction() {
        assert_eq!(
            CellValue::Number(9876543210.0).to_text(),
            Some("9876543210".to_string())
        );
        assert_eq!(CellValue::Number(1.5).to_text(), Some("1.5".to_string()));
    }

    #[test]
    fn test_blank_text_is_empty_but_not_absent() {
        let blank = CellValue::Text("   ".to_string());
        assert!(blank.is_empty());
        assert!(!blank.is_absent());
        assert_eq!(blank.to_text(), None);
    }

    #[test]
    fn test_row_case_insensitive_lookup_prefers_file_order() {
        let mut row = RawRow::new(2);
        row.insert("PHONE", CellValue::Text("111".into()));
        row.insert("Phone", CellValue::Text("222".into()));
        assert_eq!(
            row.get_ignore_case("phone"),
            Some(&CellValue::Text("111".into()))
        );
        assert_eq!(row.get("Phone"), Some(&CellValue::Text("222".into())));
    }
}
