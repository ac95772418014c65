//! Row transaction coordinator
//!
//! Drives one input row through validation, identity resolution, and the
//! profile/progress upserts inside a single unit of work. Any failure
//! rolls back that row's writes only; the batch carries on (bulkhead
//! isolation), so one corrupted row can never sink the file.

use chrono::NaiveDate;
use serde_json::{Map, Value as Json};

use crate::config::{Tables, fields};
use crate::store::{
    EnrollmentProfile, ImportStore, ProfileStatus, RowTx, SoftwareProgress, SoftwareStatus,
};

use super::alias;
use super::dates;
use super::identity::normalize_phone;
use super::resolver::{self, IdentityCandidate};
use super::software::{self, SoftwareUpdate};
use super::value::{CellValue, RawRow};

/// Why a row failed. Validation variants carry enough detail for an
/// operator to find and fix the offending cell.
#[derive(Debug, Clone, PartialEq)]
pub enum RowError {
    MissingIdentity,
    InvalidPhone(String),
    UnparseableDate { field: String, value: String },
    Store(String),
}

impl RowError {
    pub fn store(err: anyhow::Error) -> Self {
        RowError::Store(format!("{:#}", err))
    }
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowError::MissingIdentity => {
                write!(f, "row supplies neither a phone number nor an email address")
            }
            RowError::InvalidPhone(value) => write!(
                f,
                "invalid phone number {:?}: expected 10 digits after normalization",
                value
            ),
            RowError::UnparseableDate { field, value } => {
                write!(f, "unparseable date in {}: {:?}", field, value)
            }
            RowError::Store(message) => write!(f, "store error: {}", message),
        }
    }
}

impl std::error::Error for RowError {}

/// Where in its lifecycle a row currently is. Used for logging and error
/// context; the happy path runs straight through to `Committed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Pending,
    Validating,
    ResolvingIdentity,
    UpsertingProfile,
    UpsertingProgress,
    Committed,
    Failed,
    RolledBack,
}

impl std::fmt::Display for RowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RowState::Pending => "pending",
            RowState::Validating => "validating",
            RowState::ResolvingIdentity => "resolving identity",
            RowState::UpsertingProfile => "upserting profile",
            RowState::UpsertingProgress => "upserting progress",
            RowState::Committed => "committed",
            RowState::Failed => "failed",
            RowState::RolledBack => "rolled back",
        };
        write!(f, "{}", name)
    }
}

/// Everything extracted and validated from a row before any write happens.
#[derive(Debug)]
struct RowFacts {
    identity: IdentityCandidate,
    date_of_birth: Option<NaiveDate>,
    address: Option<String>,
    enrollment_date: Option<NaiveDate>,
    status: Option<ProfileStatus>,
    software_list: Vec<String>,
    metadata: Map<String, Json>,
    progress: Vec<SoftwareUpdate>,
}

/// Parse a date cell that may legitimately be empty. A supplied but
/// unparseable value is a row error; silence is not.
pub fn parse_date_cell(value: &CellValue, field: &str) -> Result<Option<NaiveDate>, RowError> {
    if value.is_empty() {
        return Ok(None);
    }
    match dates::normalize(value) {
        Some(date) => Ok(Some(date)),
        None => Err(RowError::UnparseableDate {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Process one row end to end. On success the row's writes are durable;
/// on failure they are rolled back and the error describes the cause.
pub async fn process_row(
    store: &dyn ImportStore,
    tables: &Tables,
    row: &RawRow,
) -> Result<(), RowError> {
    log::debug!("Row {}: {}", row.number, RowState::Validating);
    let facts = validate(row, tables)?;

    let mut tx = store.begin().await.map_err(RowError::store)?;
    let outcome = drive(tx.as_mut(), row, &facts).await;

    match outcome {
        Ok(()) => {
            tx.commit().await.map_err(RowError::store)?;
            log::debug!("Row {}: {}", row.number, RowState::Committed);
            Ok(())
        }
        Err((state, error)) => {
            log::debug!("Row {}: {} during {}", row.number, RowState::Failed, state);
            if let Err(rollback_err) = tx.rollback().await {
                log::warn!("Row {}: rollback failed: {:#}", row.number, rollback_err);
            } else {
                log::debug!("Row {}: {}", row.number, RowState::RolledBack);
            }
            Err(error)
        }
    }
}

/// Pre-write validation and field extraction (spec'd to run before any
/// store access so obviously-bad rows never open a transaction).
fn validate(row: &RawRow, tables: &Tables) -> Result<RowFacts, RowError> {
    let raw_phone = alias::resolve_text(row, tables.aliases(fields::PHONE));
    let phone = match &raw_phone {
        Some(raw) => match normalize_phone(raw) {
            Some(normalized) => Some(normalized),
            None => return Err(RowError::InvalidPhone(raw.clone())),
        },
        None => None,
    };

    let email = alias::resolve_text(row, tables.aliases(fields::EMAIL));
    if phone.is_none() && email.is_none() {
        return Err(RowError::MissingIdentity);
    }

    let identity = IdentityCandidate {
        name: alias::resolve_text(row, tables.aliases(fields::NAME)),
        email,
        phone,
    };

    let date_of_birth = parse_date_cell(
        alias::resolve(row, tables.aliases(fields::DATE_OF_BIRTH)),
        fields::DATE_OF_BIRTH,
    )?;
    let enrollment_date = parse_date_cell(
        alias::resolve(row, tables.aliases(fields::ENROLLMENT_DATE)),
        fields::ENROLLMENT_DATE,
    )?;
    let address = alias::resolve_text(row, tables.aliases(fields::ADDRESS));
    let status = alias::resolve_text(row, tables.aliases(fields::STATUS))
        .and_then(|s| ProfileStatus::parse(&s));

    let progress = software::map_row(row, tables)?;
    let software_list = software::declared_software(row, tables);
    let metadata = extract_metadata(row, tables);

    Ok(RowFacts {
        identity,
        date_of_birth,
        address,
        enrollment_date,
        status,
        software_list,
        metadata,
        progress,
    })
}

/// The write phase: everything between begin and commit. Returns the state
/// the row failed in alongside the error so the caller can log it.
async fn drive(
    tx: &mut dyn RowTx,
    row: &RawRow,
    facts: &RowFacts,
) -> Result<(), (RowState, RowError)> {
    let resolved = resolver::resolve(tx, &facts.identity)
        .await
        .map_err(|e| (RowState::ResolvingIdentity, e))?;
    log::debug!(
        "Row {}: {} person {}",
        row.number,
        if resolved.created { "created" } else { "matched" },
        resolved.person.id
    );

    upsert_profile(tx, resolved.person.id, facts)
        .await
        .map_err(|e| (RowState::UpsertingProfile, RowError::store(e)))?;

    upsert_progress(tx, resolved.person.id, facts)
        .await
        .map_err(|e| (RowState::UpsertingProgress, RowError::store(e)))?;

    Ok(())
}

async fn upsert_profile(
    tx: &mut dyn RowTx,
    person_id: uuid::Uuid,
    facts: &RowFacts,
) -> anyhow::Result<()> {
    match tx.find_profile(person_id).await? {
        Some(mut profile) => {
            merge_profile(&mut profile, facts);
            tx.update_profile(&profile).await
        }
        None => {
            let mut profile = EnrollmentProfile::new(person_id);
            merge_profile(&mut profile, facts);
            tx.insert_profile(&profile).await
        }
    }
}

/// Merge, never replace: scalars only overwrite when the row supplied a
/// value, the software list only when non-empty, and metadata key by key
/// (list-valued keys likewise only when non-empty, which the extractor
/// already guarantees).
fn merge_profile(profile: &mut EnrollmentProfile, facts: &RowFacts) {
    if facts.date_of_birth.is_some() {
        profile.date_of_birth = facts.date_of_birth;
    }
    if facts.address.is_some() {
        profile.address = facts.address.clone();
    }
    if facts.enrollment_date.is_some() {
        profile.enrollment_date = facts.enrollment_date;
    }
    if let Some(status) = facts.status {
        profile.status = status;
    }
    if !facts.software_list.is_empty() {
        profile.software = facts.software_list.clone();
    }

    if !profile.metadata.is_object() {
        profile.metadata = Json::Object(Map::new());
    }
    if let Some(existing) = profile.metadata.as_object_mut() {
        for (key, value) in &facts.metadata {
            existing.insert(key.clone(), value.clone());
        }
    }
}

async fn upsert_progress(
    tx: &mut dyn RowTx,
    person_id: uuid::Uuid,
    facts: &RowFacts,
) -> anyhow::Result<()> {
    for update in &facts.progress {
        match tx.find_progress(person_id, &update.software).await? {
            Some(mut progress) => {
                merge_progress(&mut progress, update, facts.enrollment_date);
                tx.update_progress(&progress).await?;
            }
            None => {
                let status = update.status.unwrap_or(SoftwareStatus::NotStarted);
                let mut progress = SoftwareProgress::new(person_id, &update.software, status);
                progress.enrollment_date = facts.enrollment_date;
                progress.batch_start = update.batch_start;
                progress.batch_end = update.batch_end;
                progress.faculty = update.faculty.clone();
                progress.schedule = update.schedule.clone();
                tx.insert_progress(&progress).await?;
            }
        }
    }
    Ok(())
}

/// A field is only overwritten when the new value is non-null; existing
/// faculty and dates survive rows that are silent on them.
fn merge_progress(
    progress: &mut SoftwareProgress,
    update: &SoftwareUpdate,
    enrollment_date: Option<NaiveDate>,
) {
    if let Some(status) = update.status {
        progress.status = status;
    }
    if enrollment_date.is_some() {
        progress.enrollment_date = enrollment_date;
    }
    if update.batch_start.is_some() {
        progress.batch_start = update.batch_start;
    }
    if update.batch_end.is_some() {
        progress.batch_end = update.batch_end;
    }
    if update.faculty.is_some() {
        progress.faculty = update.faculty.clone();
    }
    if update.schedule.is_some() {
        progress.schedule = update.schedule.clone();
    }
}

/// Scalar metadata fields copied into the profile's metadata document.
const METADATA_SCALARS: &[&str] = &[
    fields::TOTAL_FEE,
    fields::AMOUNT_PAID,
    fields::BALANCE_DUE,
    fields::EMERGENCY_CONTACT,
    fields::GUARDIAN_NAME,
    fields::LEAD_SOURCE,
    fields::REMARKS,
];

/// Comma-separated list fields; only included when non-empty so they can
/// never wipe an existing list on merge.
const METADATA_LISTS: &[&str] = &[
    fields::FINISHED_BATCHES,
    fields::CURRENT_BATCHES,
    fields::PENDING_BATCHES,
];

fn extract_metadata(row: &RawRow, tables: &Tables) -> Map<String, Json> {
    let mut metadata = Map::new();

    for field in METADATA_SCALARS {
        let cell = alias::resolve(row, tables.aliases(field));
        match cell {
            CellValue::Number(n) => {
                if let Some(number) = serde_json::Number::from_f64(*n) {
                    metadata.insert(field.to_string(), Json::Number(number));
                }
            }
            other => {
                if let Some(text) = other.to_text() {
                    metadata.insert(field.to_string(), Json::String(text));
                }
            }
        }
    }

    for field in METADATA_LISTS {
        if let Some(text) = alias::resolve_text(row, tables.aliases(field)) {
            let items: Vec<Json> = text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Json::String(s.to_string()))
                .collect();
            if !items.is_empty() {
                metadata.insert(field.to_string(), Json::Array(items));
            }
        }
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tables() -> Tables {
        Tables::builtin()
    }

    fn row_with(number: usize, cells: &[(&str, &str)]) -> RawRow {
        let mut row = RawRow::new(number);
        for (header, value) in cells {
            row.insert(*header, CellValue::Text(value.to_string()));
        }
        row
    }

    fn full_row(number: usize) -> RawRow {
        row_with(
            number,
            &[
                ("Name", "Jane Doe"),
                ("Phone", "+91 98765-43210"),
                ("Email", "jane@example.com"),
                ("DOB", "25/01/2000"),
                ("Admission Date", "2024-01-05"),
                ("Address", "12 Hill Road"),
                ("Status", "Active"),
                ("7", "IP"),
                ("1st Software", "Illustrator"),
                ("1st Faculty", "R. Mehta"),
                ("Total Fees", "45000"),
                ("Lead Source", "Walk-in"),
                ("Current Batches", "ILL-24A, PS-24B"),
            ],
        )
    }

    #[tokio::test]
    async fn test_full_row_commits_person_profile_progress() {
        let store = MemoryStore::new();
        process_row(&store, &tables(), &full_row(2)).await.unwrap();

        let person = store.find_person_by_phone("9876543210").unwrap();
        assert_eq!(person.name, "Jane Doe");

        let profile = store.profile(person.id).unwrap();
        assert_eq!(
            profile.date_of_birth,
            NaiveDate::from_ymd_opt(2000, 1, 25)
        );
        assert_eq!(
            profile.enrollment_date,
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(profile.status, ProfileStatus::Active);
        assert_eq!(profile.software, vec!["Illustrator".to_string()]);
        assert_eq!(profile.metadata["total_fee"], "45000");
        assert_eq!(profile.metadata["lead_source"], "Walk-in");
        assert_eq!(
            profile.metadata["current_batches"],
            serde_json::json!(["ILL-24A", "PS-24B"])
        );

        let progress = store.progress(person.id, "Illustrator").unwrap();
        assert_eq!(progress.status, SoftwareStatus::InProgress);
        assert_eq!(progress.faculty.as_deref(), Some("R. Mehta"));
    }

    #[tokio::test]
    async fn test_invalid_phone_names_offending_value() {
        let store = MemoryStore::new();
        let row = row_with(2, &[("Name", "Jane"), ("Phone", "12345")]);
        let err = process_row(&store, &tables(), &row).await.unwrap_err();
        assert_eq!(err, RowError::InvalidPhone("12345".to_string()));
        assert!(err.to_string().contains("12345"));
        assert_eq!(store.person_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_identity_fails_before_any_write() {
        let store = MemoryStore::new();
        let row = row_with(2, &[("Name", "Jane"), ("Address", "12 Hill Road")]);
        let err = process_row(&store, &tables(), &row).await.unwrap_err();
        assert_eq!(err, RowError::MissingIdentity);
        assert_eq!(store.person_count(), 0);
    }

    #[tokio::test]
    async fn test_supplied_unparseable_date_fails_row() {
        let store = MemoryStore::new();
        let row = row_with(
            2,
            &[("Phone", "9876543210"), ("Admission Date", "next monday")],
        );
        let err = process_row(&store, &tables(), &row).await.unwrap_err();
        assert!(matches!(err, RowError::UnparseableDate { .. }));
        assert_eq!(store.person_count(), 0);
    }

    #[tokio::test]
    async fn test_reimport_updates_instead_of_duplicating() {
        let store = MemoryStore::new();
        let t = tables();
        process_row(&store, &t, &full_row(2)).await.unwrap();
        process_row(&store, &t, &full_row(2)).await.unwrap();

        assert_eq!(store.person_count(), 1);
        assert_eq!(store.progress_count(), 1);
    }

    #[tokio::test]
    async fn test_second_row_merges_without_nulling() {
        let store = MemoryStore::new();
        let t = tables();
        process_row(&store, &t, &full_row(2)).await.unwrap();

        // Later row for the same person: new status for the same software,
        // silent on faculty, address, and metadata.
        let row = row_with(3, &[("Phone", "9876543210"), ("7", "XX")]);
        process_row(&store, &t, &row).await.unwrap();

        let person = store.find_person_by_phone("9876543210").unwrap();
        let profile = store.profile(person.id).unwrap();
        assert_eq!(profile.address.as_deref(), Some("12 Hill Road"));
        assert_eq!(profile.metadata["lead_source"], "Walk-in");
        // Software list untouched by a row that declared none
        assert_eq!(profile.software, vec!["Illustrator".to_string()]);

        let progress = store.progress(person.id, "Illustrator").unwrap();
        assert_eq!(progress.status, SoftwareStatus::Finished);
        assert_eq!(progress.faculty.as_deref(), Some("R. Mehta"));
    }

    #[tokio::test]
    async fn test_unrecognized_profile_status_leaves_stored_status() {
        let store = MemoryStore::new();
        let t = tables();
        process_row(&store, &t, &full_row(2)).await.unwrap();

        let row = row_with(3, &[("Phone", "9876543210"), ("Status", "graduated?")]);
        process_row(&store, &t, &row).await.unwrap();

        let person = store.find_person_by_phone("9876543210").unwrap();
        assert_eq!(store.profile(person.id).unwrap().status, ProfileStatus::Active);
    }
}
