//! SQLite-backed identity store

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use super::models::{
    EnrollmentProfile, NewPerson, Person, PersonPatch, ProfileStatus, SoftwareProgress,
    SoftwareStatus,
};
use super::{ImportStore, RowTx};

/// Store backed by a SQLite database file. Each row of an import batch
/// runs inside its own transaction from the shared pool.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        init_schema(&pool).await?;

        Ok(SqliteStore { pool })
    }
}

/// Idempotent schema setup. The unique indexes on phone and lowercased
/// email are what makes duplicate identities a store-level constraint
/// violation rather than a silent second record.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            initial_credential TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create persons table")?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_persons_phone
         ON persons(phone) WHERE phone IS NOT NULL",
    )
    .execute(pool)
    .await
    .context("Failed to create phone index")?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_persons_email
         ON persons(lower(email))",
    )
    .execute(pool)
    .await
    .context("Failed to create email index")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrollment_profiles (
            person_id TEXT PRIMARY KEY REFERENCES persons(id),
            date_of_birth TEXT,
            address TEXT,
            enrollment_date TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            software TEXT NOT NULL DEFAULT '[]',
            metadata TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create enrollment_profiles table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS software_progress (
            person_id TEXT NOT NULL REFERENCES persons(id),
            software TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'not-started',
            enrollment_date TEXT,
            course TEXT,
            batch_start TEXT,
            batch_end TEXT,
            faculty TEXT,
            schedule TEXT,
            PRIMARY KEY (person_id, software)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create software_progress table")?;

    Ok(())
}

#[async_trait]
impl ImportStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn RowTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(Box::new(SqliteRowTx { tx }))
    }
}

struct SqliteRowTx {
    tx: sqlx::Transaction<'static, sqlx::Sqlite>,
}

fn person_from_row(row: &SqliteRow) -> Result<Person> {
    let id: String = row.try_get("id")?;
    Ok(Person {
        id: Uuid::parse_str(&id).context("Malformed person id in store")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        active: row.try_get::<i64, _>("active")? != 0,
        initial_credential: row.try_get("initial_credential")?,
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<EnrollmentProfile> {
    let person_id: String = row.try_get("person_id")?;
    let status: String = row.try_get("status")?;
    let software: String = row.try_get("software")?;
    let metadata: String = row.try_get("metadata")?;
    Ok(EnrollmentProfile {
        person_id: Uuid::parse_str(&person_id).context("Malformed person id in store")?,
        date_of_birth: row.try_get("date_of_birth")?,
        address: row.try_get("address")?,
        enrollment_date: row.try_get("enrollment_date")?,
        status: ProfileStatus::parse(&status).unwrap_or(ProfileStatus::Active),
        software: serde_json::from_str(&software).context("Malformed software list in store")?,
        metadata: serde_json::from_str(&metadata).context("Malformed metadata in store")?,
    })
}

fn progress_from_row(row: &SqliteRow) -> Result<SoftwareProgress> {
    let person_id: String = row.try_get("person_id")?;
    let status: String = row.try_get("status")?;
    let status = match status.as_str() {
        "not-started" => SoftwareStatus::NotStarted,
        "in-progress" => SoftwareStatus::InProgress,
        "finished" => SoftwareStatus::Finished,
        "not-applicable" => SoftwareStatus::NotApplicable,
        other => anyhow::bail!("Unknown progress status in store: {}", other),
    };
    Ok(SoftwareProgress {
        person_id: Uuid::parse_str(&person_id).context("Malformed person id in store")?,
        software: row.try_get("software")?,
        status,
        enrollment_date: row.try_get("enrollment_date")?,
        course: row.try_get("course")?,
        batch_start: row.try_get("batch_start")?,
        batch_end: row.try_get("batch_end")?,
        faculty: row.try_get("faculty")?,
        schedule: row.try_get("schedule")?,
    })
}

#[async_trait]
impl RowTx for SqliteRowTx {
    async fn find_person_by_phone(&mut self, phone: &str) -> Result<Option<Person>> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, active, initial_credential
             FROM persons WHERE phone = ?",
        )
        .bind(phone)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to look up person by phone")?;

        row.as_ref().map(person_from_row).transpose()
    }

    async fn find_person_by_email(&mut self, email: &str) -> Result<Option<Person>> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, active, initial_credential
             FROM persons WHERE lower(email) = ?",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to look up person by email")?;

        row.as_ref().map(person_from_row).transpose()
    }

    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO persons (id, name, email, phone, active, initial_credential)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(id.to_string())
        .bind(&person.name)
        .bind(&person.email)
        .bind(&person.phone)
        .bind(&person.initial_credential)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert person")?;

        Ok(Person {
            id,
            name: person.name.clone(),
            email: person.email.clone(),
            phone: person.phone.clone(),
            active: true,
            initial_credential: person.initial_credential.clone(),
        })
    }

    async fn update_person(&mut self, id: Uuid, patch: &PersonPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "UPDATE persons SET
                 name = COALESCE(?, name),
                 email = COALESCE(?, email),
                 phone = COALESCE(?, phone)
             WHERE id = ?",
        )
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.phone)
        .bind(id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to update person")?;

        Ok(())
    }

    async fn find_profile(&mut self, person_id: Uuid) -> Result<Option<EnrollmentProfile>> {
        let row = sqlx::query(
            "SELECT person_id, date_of_birth, address, enrollment_date, status,
                    software, metadata
             FROM enrollment_profiles WHERE person_id = ?",
        )
        .bind(person_id.to_string())
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to look up enrollment profile")?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert_profile(&mut self, profile: &EnrollmentProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO enrollment_profiles
                 (person_id, date_of_birth, address, enrollment_date, status,
                  software, metadata)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.person_id.to_string())
        .bind(profile.date_of_birth)
        .bind(&profile.address)
        .bind(profile.enrollment_date)
        .bind(profile.status.as_str())
        .bind(serde_json::to_string(&profile.software)?)
        .bind(serde_json::to_string(&profile.metadata)?)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert enrollment profile")?;

        Ok(())
    }

    async fn update_profile(&mut self, profile: &EnrollmentProfile) -> Result<()> {
        sqlx::query(
            "UPDATE enrollment_profiles SET
                 date_of_birth = ?,
                 address = ?,
                 enrollment_date = ?,
                 status = ?,
                 software = ?,
                 metadata = ?
             WHERE person_id = ?",
        )
        .bind(profile.date_of_birth)
        .bind(&profile.address)
        .bind(profile.enrollment_date)
        .bind(profile.status.as_str())
        .bind(serde_json::to_string(&profile.software)?)
        .bind(serde_json::to_string(&profile.metadata)?)
        .bind(profile.person_id.to_string())
        .execute(&mut *self.tx)
        .await
        .context("Failed to update enrollment profile")?;

        Ok(())
    }

    async fn find_progress(
        &mut self,
        person_id: Uuid,
        software: &str,
    ) -> Result<Option<SoftwareProgress>> {
        let row = sqlx::query(
            "SELECT person_id, software, status, enrollment_date, course,
                    batch_start, batch_end, faculty, schedule
             FROM software_progress WHERE person_id = ? AND software = ?",
        )
        .bind(person_id.to_string())
        .bind(software)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to look up software progress")?;

        row.as_ref().map(progress_from_row).transpose()
    }

    async fn insert_progress(&mut self, progress: &SoftwareProgress) -> Result<()> {
        sqlx::query(
            "INSERT INTO software_progress
                 (person_id, software, status, enrollment_date, course,
                  batch_start, batch_end, faculty, schedule)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(progress.person_id.to_string())
        .bind(&progress.software)
        .bind(progress.status.as_str())
        .bind(progress.enrollment_date)
        .bind(&progress.course)
        .bind(progress.batch_start)
        .bind(progress.batch_end)
        .bind(&progress.faculty)
        .bind(&progress.schedule)
        .execute(&mut *self.tx)
        .await
        .context("Failed to insert software progress")?;

        Ok(())
    }

    async fn update_progress(&mut self, progress: &SoftwareProgress) -> Result<()> {
        sqlx::query(
            "UPDATE software_progress SET
                 status = ?,
                 enrollment_date = ?,
                 course = ?,
                 batch_start = ?,
                 batch_end = ?,
                 faculty = ?,
                 schedule = ?
             WHERE person_id = ? AND software = ?",
        )
        .bind(progress.status.as_str())
        .bind(progress.enrollment_date)
        .bind(&progress.course)
        .bind(progress.batch_start)
        .bind(progress.batch_end)
        .bind(&progress.faculty)
        .bind(&progress.schedule)
        .bind(progress.person_id.to_string())
        .bind(&progress.software)
        .execute(&mut *self.tx)
        .await
        .context("Failed to update software progress")?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("Failed to commit row")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.context("Failed to roll back row")
    }
}
