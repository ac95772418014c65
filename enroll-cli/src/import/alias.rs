//! Header alias resolution
//!
//! Source files spell the same column dozens of ways ("Phone",
//! "phoneNumber", "NUMBER", ...). Each canonical field carries an ordered
//! alias list; the first listed alias that holds a non-empty value wins, so
//! alias lists are authored most-canonical-first.

use super::value::{ABSENT, CellValue, RawRow};

/// Resolve a canonical field against a row.
///
/// For each alias in order: exact header match first, then a
/// case-insensitive scan over the row's headers in file order. Empty and
/// absent values are skipped so a populated later alias can still win over
/// a blank earlier one. Never fails; returns the `Absent` sentinel when no
/// alias yields a value.
pub fn resolve<'a, S: AsRef<str>>(row: &'a RawRow, aliases: &[S]) -> &'a CellValue {
    for alias in aliases {
        let alias = alias.as_ref();
        if let Some(value) = row.get(alias) {
            if !value.is_empty() {
                return value;
            }
        }
        if let Some(value) = row.get_ignore_case(alias) {
            if !value.is_empty() {
                return value;
            }
        }
    }
    &ABSENT
}

/// Convenience: resolve to trimmed text, `None` when absent or blank.
pub fn resolve_text<S: AsRef<str>>(row: &RawRow, aliases: &[S]) -> Option<String> {
    resolve(row, aliases).to_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_with(cells: &[(&str, &str)]) -> RawRow {
        let mut row = RawRow::new(2);
        for (header, value) in cells {
            row.insert(*header, CellValue::Text(value.to_string()));
        }
        row
    }

    #[test]
    fn test_exact_match_wins() {
        let row = row_with(&[("Phone", "123")]);
        assert_eq!(resolve_text(&row, &["Phone", "NUMBER"]), Some("123".into()));
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let row = row_with(&[("PHONENUMBER", "456")]);
        assert_eq!(
            resolve_text(&row, &["Phone", "phoneNumber"]),
            Some("456".into())
        );
    }

    #[test]
    fn test_first_listed_alias_wins_when_both_populated() {
        let row = row_with(&[("NUMBER", "999"), ("Phone", "111")]);
        // "Phone" is listed first, so it wins even though "NUMBER" appears
        // earlier in the file.
        assert_eq!(
            resolve_text(&row, &["Phone", "NUMBER"]),
            Some("111".into())
        );
    }

    #[test]
    fn test_blank_earlier_alias_is_skipped() {
        let row = row_with(&[("Phone", "  "), ("NUMBER", "777")]);
        assert_eq!(
            resolve_text(&row, &["Phone", "NUMBER"]),
            Some("777".into())
        );
    }

    #[test]
    fn test_no_match_returns_absent_sentinel() {
        let row = row_with(&[("Unrelated", "x")]);
        let value = resolve(&row, &["Phone", "NUMBER"]);
        assert!(value.is_absent());
        assert_eq!(resolve_text(&row, &["Phone"]), None);
    }

    #[test]
    fn test_numeric_cell_resolves_as_text() {
        let mut row = RawRow::new(2);
        row.insert("Phone", CellValue::Number(9876543210.0));
        assert_eq!(resolve_text(&row, &["Phone"]), Some("9876543210".into()));
    }
}
