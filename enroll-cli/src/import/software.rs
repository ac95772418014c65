//! Software column and status-token mapping
//!
//! Status columns carry a short header (a numeric code like "7" or a long
//! product name) and a bounded token vocabulary. Unrecognized tokens are
//! ignored rather than errored: these sheets are full of stray notes in
//! status cells and a stray note must not fail the row.

use chrono::NaiveDate;

use crate::config::{Tables, fields};
use crate::store::SoftwareStatus;

use super::alias;
use super::row::{RowError, parse_date_cell};
use super::value::RawRow;

/// Accumulated updates for one (person, software) pair from a single row.
/// `None` fields were not supplied and must not overwrite stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareUpdate {
    pub software: String,
    pub status: Option<SoftwareStatus>,
    pub batch_start: Option<NaiveDate>,
    pub batch_end: Option<NaiveDate>,
    pub faculty: Option<String>,
    pub schedule: Option<String>,
}

impl SoftwareUpdate {
    fn new(software: &str) -> Self {
        SoftwareUpdate {
            software: software.to_string(),
            status: None,
            batch_start: None,
            batch_end: None,
            faculty: None,
            schedule: None,
        }
    }
}

/// Recognized status tokens, case-sensitive exact match.
fn parse_status_token(token: &str) -> Option<SoftwareStatus> {
    match token {
        "XX" => Some(SoftwareStatus::Finished),
        "IP" => Some(SoftwareStatus::InProgress),
        "NO" => Some(SoftwareStatus::NotApplicable),
        "Finished" => Some(SoftwareStatus::Finished),
        _ => None,
    }
}

/// Case-insensitive substring match in either direction, used to attach
/// batch metadata to a software entry. Best-effort heuristic: when two
/// entries both qualify, the first in processing order wins.
fn name_matches(declared: &str, canonical: &str) -> bool {
    let declared = declared.to_lowercase();
    let canonical = canonical.to_lowercase();
    canonical.contains(&declared) || declared.contains(&canonical)
}

/// Software names the row declares in its "1st/2nd software" columns, in
/// slot order. These feed the profile's software list.
pub fn declared_software(row: &RawRow, tables: &Tables) -> Vec<String> {
    [fields::FIRST_SOFTWARE, fields::SECOND_SOFTWARE]
        .iter()
        .filter_map(|field| alias::resolve_text(row, tables.aliases(field)))
        .collect()
}

/// Produce the row's software updates: zero or more (software, status)
/// pairs from the status columns, with batch metadata attached from the
/// declared software slots.
///
/// Columns resolving to the same canonical name merge: the later column
/// wins for any field it explicitly sets and never erases fields it left
/// absent.
pub fn map_row(row: &RawRow, tables: &Tables) -> Result<Vec<SoftwareUpdate>, RowError> {
    let mut updates: Vec<SoftwareUpdate> = Vec::new();

    for col in tables.software_columns() {
        let cell = alias::resolve(row, &[col.column.as_str()]);
        let Some(token) = cell.to_text() else {
            continue;
        };
        let Some(status) = parse_status_token(token.trim()) else {
            log::debug!(
                "Row {}: ignoring unrecognized status token {:?} in column {:?}",
                row.number,
                token,
                col.column
            );
            continue;
        };

        match updates.iter_mut().find(|u| u.software == col.name) {
            Some(existing) => existing.status = Some(status),
            None => {
                let mut update = SoftwareUpdate::new(&col.name);
                update.status = Some(status);
                updates.push(update);
            }
        }
    }

    attach_slot_metadata(
        row,
        tables,
        &mut updates,
        fields::FIRST_SOFTWARE,
        fields::FIRST_BATCH_START,
        fields::FIRST_BATCH_END,
        fields::FIRST_FACULTY,
        fields::FIRST_SCHEDULE,
    )?;
    attach_slot_metadata(
        row,
        tables,
        &mut updates,
        fields::SECOND_SOFTWARE,
        fields::SECOND_BATCH_START,
        fields::SECOND_BATCH_END,
        fields::SECOND_FACULTY,
        fields::SECOND_SCHEDULE,
    )?;

    Ok(updates)
}

#[allow(clippy::too_many_arguments)]
fn attach_slot_metadata(
    row: &RawRow,
    tables: &Tables,
    updates: &mut [SoftwareUpdate],
    software_field: &str,
    start_field: &str,
    end_field: &str,
    faculty_field: &str,
    schedule_field: &str,
) -> Result<(), RowError> {
    let Some(declared) = alias::resolve_text(row, tables.aliases(software_field)) else {
        return Ok(());
    };

    let batch_start = parse_date_cell(
        alias::resolve(row, tables.aliases(start_field)),
        start_field,
    )?;
    let batch_end =
        parse_date_cell(alias::resolve(row, tables.aliases(end_field)), end_field)?;
    let faculty = alias::resolve_text(row, tables.aliases(faculty_field));
    let schedule = alias::resolve_text(row, tables.aliases(schedule_field));

    let Some(target) = updates.iter_mut().find(|u| name_matches(&declared, &u.software))
    else {
        log::debug!(
            "Row {}: no software entry matches declared name {:?}; batch metadata dropped",
            row.number,
            declared
        );
        return Ok(());
    };

    if batch_start.is_some() {
        target.batch_start = batch_start;
    }
    if batch_end.is_some() {
        target.batch_end = batch_end;
    }
    if faculty.is_some() {
        target.faculty = faculty;
    }
    if schedule.is_some() {
        target.schedule = schedule;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::value::CellValue;

    fn tables() -> Tables {
        Tables::builtin()
    }

    fn row_with(cells: &[(&str, &str)]) -> RawRow {
        let mut row = RawRow::new(2);
        for (header, value) in cells {
            row.insert(*header, CellValue::Text(value.to_string()));
        }
        row
    }

    #[test]
    fn test_code_column_maps_to_canonical_name() {
        let row = row_with(&[("7", "Finished")]);
        let updates = map_row(&row, &tables()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].software, "Illustrator");
        assert_eq!(updates[0].status, Some(SoftwareStatus::Finished));
    }

    #[test]
    fn test_token_vocabulary() {
        let row = row_with(&[("1", "XX"), ("2", "IP"), ("3", "NO")]);
        let updates = map_row(&row, &tables()).unwrap();
        let status_of = |name: &str| {
            updates
                .iter()
                .find(|u| u.software == name)
                .and_then(|u| u.status)
        };
        assert_eq!(status_of("Photoshop"), Some(SoftwareStatus::Finished));
        assert_eq!(status_of("CorelDRAW"), Some(SoftwareStatus::InProgress));
        assert_eq!(status_of("InDesign"), Some(SoftwareStatus::NotApplicable));
    }

    #[test]
    fn test_unrecognized_token_is_ignored_not_errored() {
        let row = row_with(&[("7", "maybe")]);
        let updates = map_row(&row, &tables()).unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn test_tokens_are_case_sensitive() {
        let row = row_with(&[("7", "xx"), ("1", "finished")]);
        let updates = map_row(&row, &tables()).unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn test_overlapping_columns_later_wins_without_erasing() {
        // "Adobe Illustrator" and "7" both resolve to Illustrator; the
        // later column's status wins, earlier-set fields survive.
        let row = row_with(&[
            ("7", "IP"),
            ("1st Software", "Illustrator"),
            ("1st Faculty", "R. Mehta"),
            ("Adobe Illustrator", "XX"),
        ]);
        let updates = map_row(&row, &tables()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, Some(SoftwareStatus::Finished));
        assert_eq!(updates[0].faculty.as_deref(), Some("R. Mehta"));
    }

    #[test]
    fn test_slot_metadata_attaches_by_substring() {
        let row = row_with(&[
            ("7", "IP"),
            ("1st Software", "illustrator"),
            ("1st Batch Start Date", "2024-01-05"),
            ("1st Batch End Date", "2024-03-05"),
            ("1st Faculty", "R. Mehta"),
            ("1st Schedule", "Mon-Wed-Fri 10:00"),
        ]);
        let updates = map_row(&row, &tables()).unwrap();
        let update = &updates[0];
        assert_eq!(update.software, "Illustrator");
        assert_eq!(
            update.batch_start,
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(update.batch_end, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(update.faculty.as_deref(), Some("R. Mehta"));
        assert_eq!(update.schedule.as_deref(), Some("Mon-Wed-Fri 10:00"));
    }

    #[test]
    fn test_slot_metadata_first_qualifying_match_wins() {
        // Declared "Ma" is a substring of both "Maya" and "3ds Max". The
        // first qualifying entry in processing order wins; this pins the
        // current first-match policy (a known ambiguity, deliberately not
        // tie-broken any smarter).
        let row = row_with(&[
            ("10", "IP"),
            ("11", "IP"),
            ("1st Software", "Ma"),
            ("1st Faculty", "S. Rao"),
        ]);
        let updates = map_row(&row, &tables()).unwrap();
        let maya = updates.iter().find(|u| u.software == "Maya").unwrap();
        assert_eq!(maya.faculty.as_deref(), Some("S. Rao"));
        let max = updates.iter().find(|u| u.software == "3ds Max").unwrap();
        assert_eq!(max.faculty, None);
    }

    #[test]
    fn test_slot_with_no_matching_entry_drops_metadata() {
        let row = row_with(&[
            ("1st Software", "Illustrator"),
            ("1st Faculty", "R. Mehta"),
        ]);
        // No status column produced an Illustrator entry.
        let updates = map_row(&row, &tables()).unwrap();
        assert!(updates.is_empty());
    }

    #[test]
    fn test_unparseable_batch_date_fails_row() {
        let row = row_with(&[
            ("7", "IP"),
            ("1st Software", "Illustrator"),
            ("1st Batch Start Date", "sometime soon"),
        ]);
        let err = map_row(&row, &tables()).unwrap_err();
        assert!(matches!(err, RowError::UnparseableDate { .. }));
    }

    #[test]
    fn test_declared_software_in_slot_order() {
        let row = row_with(&[
            ("2nd Software", "Photoshop"),
            ("1st Software", "Illustrator"),
        ]);
        assert_eq!(
            declared_software(&row, &tables()),
            vec!["Illustrator".to_string(), "Photoshop".to_string()]
        );
    }
}
