//! Date normalization for heterogeneous spreadsheet date cells
//!
//! Cells arrive as already-parsed dates, numeric serials, ISO strings, or
//! ambiguous slash-delimited strings. Attempts run in a fixed order and the
//! first structurally matching attempt decides the outcome: a cell that
//! looks like an ISO date but names an invalid day is rejected, not retried
//! as a slash date.

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::value::CellValue;

/// Serial day 0 of the source spreadsheet format. Offsetting whole days
/// from 1899-12-30 reproduces the format's historical leap-year quirk,
/// which is intentional: the tool producing these files counts the same
/// way, so serials round-trip.
pub fn sheet_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

static ISO_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("valid regex"));

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"));

/// Formats tried by the free-form fallback, most common first.
const FALLBACK_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Normalize a cell of unknown shape into a calendar date.
///
/// Returns `None` when the cell holds no recognizable date. Callers decide
/// whether an unparseable value is a row error (the cell was supplied) or
/// fine (the cell was empty); see [`CellValue::is_empty`].
pub fn normalize(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Text(s) => from_text(s.trim()),
        CellValue::Absent | CellValue::Bool(_) => None,
    }
}

/// Whole-day offset from the sheet epoch.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let delta = Duration::try_days(days)?;
    sheet_epoch().checked_add_signed(delta)
}

fn from_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    // ISO prefix: structural match consumes the attempt even when invalid
    if ISO_PREFIX.is_match(s) {
        return NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok();
    }

    if let Some(caps) = SLASH_DATE.captures(s) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return from_slash(first, second, year);
    }

    for format in FALLBACK_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return Some(d);
        }
    }
    None
}

/// Disambiguate `first/second/year`. A value over 12 pins its slot; when
/// both fit either slot the organization's files are day-first, so that is
/// the default, with the other arrangement only tried if day-first names an
/// impossible date.
fn from_slash(first: u32, second: u32, year: i32) -> Option<NaiveDate> {
    if first > 12 && second <= 12 {
        return NaiveDate::from_ymd_opt(year, second, first);
    }
    if first <= 12 && second > 12 {
        return NaiveDate::from_ymd_opt(year, first, second);
    }
    NaiveDate::from_ymd_opt(year, second, first)
        .or_else(|| NaiveDate::from_ymd_opt(year, first, second))
}
