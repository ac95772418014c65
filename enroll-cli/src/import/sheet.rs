//! Reading source files into raw rows
//!
//! Supports `.xlsx` workbooks (first sheet unless one is named) and `.csv`
//! files. The whole file is materialized up front; batches are processed
//! to completion, never streamed. Failures here are fatal for the run: no
//! rows have been touched yet, so there is no per-row report to return.

use std::path::Path;

use anyhow::{Context, Result, bail};
use calamine::{Data, Reader, Xlsx, open_workbook};

use super::value::{CellValue, RawRow};

/// The materialized input file: data rows only, each carrying its 1-based
/// source row number (the header row is row 1, so the first data row
/// reports as row 2). Blank rows are dropped but numbering is preserved.
#[derive(Debug)]
pub struct SheetData {
    pub source: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SheetData {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a source file, dispatching on extension. Anything that is not
/// `.csv` is treated as a workbook.
pub fn read_file(path: &Path, sheet: Option<&str>) -> Result<SheetData> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        read_csv(path)
    } else {
        read_workbook(path, sheet)
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<SheetData> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                bail!("Workbook has no sheet named {:?}", name);
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .context("Workbook has no sheets")?
            .clone(),
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Failed to read sheet: {}", sheet_name))?;

    let mut rows = range.rows();
    let header_row = rows.next().context("Sheet has no header row")?;
    let headers = parse_headers(header_row);
    if headers.iter().all(|h| h.is_empty()) {
        bail!("Sheet header row is empty");
    }

    let mut data = SheetData {
        source: path.display().to_string(),
        headers: headers.clone(),
        rows: Vec::new(),
    };

    for (physical_idx, cells) in rows.enumerate() {
        // Header is physical row 0; this data row's 1-based number
        let mut row = RawRow::new(physical_idx + 2);
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = cells.get(col).map(convert_cell).unwrap_or(CellValue::Absent);
            row.insert(header.clone(), value);
        }
        if !row.is_blank() {
            data.rows.push(row);
        }
    }

    log::info!(
        "Read {} data rows from {} (sheet {:?})",
        data.rows.len(),
        path.display(),
        sheet_name
    );
    Ok(data)
}

fn read_csv(path: &Path) -> Result<SheetData> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .context("CSV file has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        bail!("CSV header row is empty");
    }

    let mut data = SheetData {
        source: path.display().to_string(),
        headers: headers.clone(),
        rows: Vec::new(),
    };

    for (physical_idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| {
            format!("Failed to read CSV record {}", physical_idx + 2)
        })?;
        let mut row = RawRow::new(physical_idx + 2);
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = match record.get(col) {
                Some(s) if !s.trim().is_empty() => CellValue::Text(s.to_string()),
                _ => CellValue::Absent,
            };
            row.insert(header.clone(), value);
        }
        if !row.is_blank() {
            data.rows.push(row);
        }
    }

    log::info!("Read {} data rows from {}", data.rows.len(), path.display());
    Ok(data)
}

fn parse_headers(cells: &[Data]) -> Vec<String> {
    cells
        .iter()
        .map(|cell| match cell {
            Data::String(s) => s.trim().to_string(),
            Data::Int(i) => i.to_string(),
            Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
            Data::Float(f) => f.to_string(),
            _ => String::new(),
        })
        .collect()
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Absent,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Absent
            } else {
                CellValue::Text(s.clone())
            }
        }
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        // Date cells surface their serial; the date normalizer applies the
        // epoch offset.
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_csv(content: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("enroll-cli-test-{}.csv", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_csv_rows_numbered_from_two() {
        let path = write_temp_csv("Name,Phone\nJane,9876543210\nBob,9123456780\n");
        let data = read_file(&path, None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[0].number, 2);
        assert_eq!(data.rows[1].number, 3);
        assert_eq!(
            data.rows[0].get("Name"),
            Some(&CellValue::Text("Jane".into()))
        );
    }

    #[test]
    fn test_csv_blank_rows_skipped_numbering_preserved() {
        let path = write_temp_csv("Name,Phone\nJane,9876543210\n,\nBob,9123456780\n");
        let data = read_file(&path, None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(data.rows.len(), 2);
        assert_eq!(data.rows[1].number, 4);
    }

    #[test]
    fn test_csv_empty_cells_are_absent() {
        let path = write_temp_csv("Name,Phone,Email\nJane,,jane@example.com\n");
        let data = read_file(&path, None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(data.rows[0].get("Phone"), Some(&CellValue::Absent));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(read_file(Path::new("/no/such/file.csv"), None).is_err());
        assert!(read_file(Path::new("/no/such/file.xlsx"), None).is_err());
    }

    #[test]
    fn test_headerless_csv_is_fatal() {
        let path = write_temp_csv("");
        let result = read_file(&path, None);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
