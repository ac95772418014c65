//! Persistent records for the identity store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A known student identity. At most one Person exists per normalized
/// phone and per normalized email across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub name: String,
    /// Stored with original casing; compared lowercase
    pub email: String,
    /// Normalized ten-digit phone, when known
    pub phone: Option<String>,
    pub active: bool,
    /// Deterministic first-login credential issued at creation
    pub initial_credential: String,
}

/// Fields for creating a Person. The id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub initial_credential: String,
}

/// Partial update for a Person: only populated fields are written, so a
/// row that left a field blank can never null it out.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// Enrollment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileStatus {
    Active,
    Inactive,
    Completed,
    Cancelled,
    OnHold,
}

impl ProfileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileStatus::Active => "active",
            ProfileStatus::Inactive => "inactive",
            ProfileStatus::Completed => "completed",
            ProfileStatus::Cancelled => "cancelled",
            ProfileStatus::OnHold => "on-hold",
        }
    }

    /// Lenient parse of the status cell. Unrecognized spellings yield
    /// `None` and leave the stored status untouched.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(ProfileStatus::Active),
            "inactive" => Some(ProfileStatus::Inactive),
            "completed" | "complete" => Some(ProfileStatus::Completed),
            "cancelled" | "canceled" => Some(ProfileStatus::Cancelled),
            "on-hold" | "on hold" | "hold" => Some(ProfileStatus::OnHold),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-person enrollment facts, owned 1:1 by a Person.
///
/// `metadata` is a semi-structured document (financial terms, emergency
/// contact, lead source, batch lists, ...) whose keys are additive and
/// versionless; new keys appear without migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentProfile {
    pub person_id: Uuid,
    pub date_of_birth: Option<NaiveDate>,
    pub address: Option<String>,
    pub enrollment_date: Option<NaiveDate>,
    pub status: ProfileStatus,
    /// Declared software names, in declaration order
    pub software: Vec<String>,
    pub metadata: serde_json::Value,
}

impl EnrollmentProfile {
    pub fn new(person_id: Uuid) -> Self {
        EnrollmentProfile {
            person_id,
            date_of_birth: None,
            address: None,
            enrollment_date: None,
            status: ProfileStatus::Active,
            software: Vec::new(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Progress state for one software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftwareStatus {
    NotStarted,
    InProgress,
    Finished,
    NotApplicable,
}

impl SoftwareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoftwareStatus::NotStarted => "not-started",
            SoftwareStatus::InProgress => "in-progress",
            SoftwareStatus::Finished => "finished",
            SoftwareStatus::NotApplicable => "not-applicable",
        }
    }
}

impl std::fmt::Display for SoftwareStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Learning progress for one (Person, software) pair. Unique per pair; an
/// import row for an already-tracked software updates in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareProgress {
    pub person_id: Uuid,
    /// Canonical software name
    pub software: String,
    pub status: SoftwareStatus,
    pub enrollment_date: Option<NaiveDate>,
    pub course: Option<String>,
    pub batch_start: Option<NaiveDate>,
    pub batch_end: Option<NaiveDate>,
    pub faculty: Option<String>,
    pub schedule: Option<String>,
}

impl SoftwareProgress {
    pub fn new(person_id: Uuid, software: impl Into<String>, status: SoftwareStatus) -> Self {
        SoftwareProgress {
            person_id,
            software: software.into(),
            status,
            enrollment_date: None,
            course: None,
            batch_start: None,
            batch_end: None,
            faculty: None,
            schedule: None,
        }
    }
}
