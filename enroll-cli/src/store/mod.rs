//! Identity store behind a per-row unit-of-work boundary
//!
//! The coordinator only ever talks to these traits, so the same pipeline
//! runs against SQLite in production and the in-memory backend in tests
//! and `--dry-run`.

pub mod memory;
mod models;
pub mod sqlite;

pub use memory::MemoryStore;
pub use models::{
    EnrollmentProfile, NewPerson, Person, PersonPatch, ProfileStatus, SoftwareProgress,
    SoftwareStatus,
};
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Store handle. `begin` opens one atomic unit of work; every row of a
/// batch gets its own.
#[async_trait]
pub trait ImportStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RowTx>>;
}

/// One row's transaction. Writes are only durable after `commit`; dropping
/// or `rollback` discards them. Email lookups take the normalized
/// (lowercase) form; phone lookups take the ten-digit form.
#[async_trait]
pub trait RowTx: Send {
    async fn find_person_by_phone(&mut self, phone: &str) -> Result<Option<Person>>;
    async fn find_person_by_email(&mut self, email: &str) -> Result<Option<Person>>;
    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person>;
    async fn update_person(&mut self, id: Uuid, patch: &PersonPatch) -> Result<()>;

    async fn find_profile(&mut self, person_id: Uuid) -> Result<Option<EnrollmentProfile>>;
    async fn insert_profile(&mut self, profile: &EnrollmentProfile) -> Result<()>;
    async fn update_profile(&mut self, profile: &EnrollmentProfile) -> Result<()>;

    async fn find_progress(
        &mut self,
        person_id: Uuid,
        software: &str,
    ) -> Result<Option<SoftwareProgress>>;
    async fn insert_progress(&mut self, progress: &SoftwareProgress) -> Result<()>;
    async fn update_progress(&mut self, progress: &SoftwareProgress) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
