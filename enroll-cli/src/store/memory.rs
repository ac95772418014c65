//! In-memory identity store
//!
//! Backs coordinator tests and `--dry-run` imports. A transaction works
//! on a snapshot of the shared state and swaps it back in on commit, so
//! rollback is just dropping the snapshot. Identity uniqueness is enforced
//! on insert to mirror the SQLite unique indexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;
use uuid::Uuid;

use crate::import::identity::normalize_email;

use super::models::{EnrollmentProfile, NewPerson, Person, PersonPatch, SoftwareProgress};
use super::{ImportStore, RowTx};

#[derive(Debug, Clone, Default)]
struct MemState {
    persons: Vec<Person>,
    profiles: HashMap<Uuid, EnrollmentProfile>,
    progress: HashMap<(Uuid, String), SoftwareProgress>,
}

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn person_count(&self) -> usize {
        self.lock().persons.len()
    }

    pub fn find_person_by_phone(&self, phone: &str) -> Option<Person> {
        self.lock()
            .persons
            .iter()
            .find(|p| p.phone.as_deref() == Some(phone))
            .cloned()
    }

    pub fn profile(&self, person_id: Uuid) -> Option<EnrollmentProfile> {
        self.lock().profiles.get(&person_id).cloned()
    }

    pub fn progress(&self, person_id: Uuid, software: &str) -> Option<SoftwareProgress> {
        self.lock()
            .progress
            .get(&(person_id, software.to_string()))
            .cloned()
    }

    pub fn progress_count(&self) -> usize {
        self.lock().progress.len()
    }
}

#[async_trait]
impl ImportStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn RowTx>> {
        let snapshot = self.lock().clone();
        Ok(Box::new(MemoryRowTx {
            shared: Arc::clone(&self.state),
            snapshot,
        }))
    }
}

struct MemoryRowTx {
    shared: Arc<Mutex<MemState>>,
    snapshot: MemState,
}

#[async_trait]
impl RowTx for MemoryRowTx {
    async fn find_person_by_phone(&mut self, phone: &str) -> Result<Option<Person>> {
        Ok(self
            .snapshot
            .persons
            .iter()
            .find(|p| p.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_person_by_email(&mut self, email: &str) -> Result<Option<Person>> {
        Ok(self
            .snapshot
            .persons
            .iter()
            .find(|p| normalize_email(&p.email) == email)
            .cloned())
    }

    async fn insert_person(&mut self, person: &NewPerson) -> Result<Person> {
        if let Some(phone) = &person.phone {
            if self
                .snapshot
                .persons
                .iter()
                .any(|p| p.phone.as_deref() == Some(phone.as_str()))
            {
                bail!("UNIQUE constraint violated: persons.phone = {}", phone);
            }
        }
        let email_key = normalize_email(&person.email);
        if self
            .snapshot
            .persons
            .iter()
            .any(|p| normalize_email(&p.email) == email_key)
        {
            bail!("UNIQUE constraint violated: persons.email = {}", person.email);
        }

        let created = Person {
            id: Uuid::new_v4(),
            name: person.name.clone(),
            email: person.email.clone(),
            phone: person.phone.clone(),
            active: true,
            initial_credential: person.initial_credential.clone(),
        };
        self.snapshot.persons.push(created.clone());
        Ok(created)
    }

    async fn update_person(&mut self, id: Uuid, patch: &PersonPatch) -> Result<()> {
        let Some(person) = self.snapshot.persons.iter_mut().find(|p| p.id == id) else {
            bail!("No person with id {}", id);
        };
        if let Some(name) = &patch.name {
            person.name = name.clone();
        }
        if let Some(email) = &patch.email {
            person.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            person.phone = Some(phone.clone());
        }
        Ok(())
    }

    async fn find_profile(&mut self, person_id: Uuid) -> Result<Option<EnrollmentProfile>> {
        Ok(self.snapshot.profiles.get(&person_id).cloned())
    }

    async fn insert_profile(&mut self, profile: &EnrollmentProfile) -> Result<()> {
        if self.snapshot.profiles.contains_key(&profile.person_id) {
            bail!("Profile already exists for person {}", profile.person_id);
        }
        self.snapshot
            .profiles
            .insert(profile.person_id, profile.clone());
        Ok(())
    }

    async fn update_profile(&mut self, profile: &EnrollmentProfile) -> Result<()> {
        if !self.snapshot.profiles.contains_key(&profile.person_id) {
            bail!("No profile for person {}", profile.person_id);
        }
        self.snapshot
            .profiles
            .insert(profile.person_id, profile.clone());
        Ok(())
    }

    async fn find_progress(
        &mut self,
        person_id: Uuid,
        software: &str,
    ) -> Result<Option<SoftwareProgress>> {
        Ok(self
            .snapshot
            .progress
            .get(&(person_id, software.to_string()))
            .cloned())
    }

    async fn insert_progress(&mut self, progress: &SoftwareProgress) -> Result<()> {
        let key = (progress.person_id, progress.software.clone());
        if self.snapshot.progress.contains_key(&key) {
            bail!(
                "Progress already exists for person {} software {}",
                progress.person_id,
                progress.software
            );
        }
        self.snapshot.progress.insert(key, progress.clone());
        Ok(())
    }

    async fn update_progress(&mut self, progress: &SoftwareProgress) -> Result<()> {
        let key = (progress.person_id, progress.software.clone());
        if !self.snapshot.progress.contains_key(&key) {
            bail!(
                "No progress for person {} software {}",
                progress.person_id,
                progress.software
            );
        }
        self.snapshot.progress.insert(key, progress.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut shared = self
            .shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *shared = self.snapshot;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Snapshot is simply dropped
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SoftwareStatus;

    fn new_person(name: &str, email: &str, phone: Option<&str>) -> NewPerson {
        NewPerson {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(|p| p.to_string()),
            initial_credential: "cred".to_string(),
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_person(&new_person("Jane", "jane@example.com", Some("9876543210")))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.person_count(), 1);
        assert!(store.find_person_by_phone("9876543210").is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_person(&new_person("Jane", "jane@example.com", None))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.person_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_phone_rejected() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_person(&new_person("Jane", "jane@example.com", Some("9876543210")))
            .await
            .unwrap();
        let err = tx
            .insert_person(&new_person("Janet", "janet@example.com", Some("9876543210")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("UNIQUE"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_person(&new_person("Jane", "Jane@Example.com", None))
            .await
            .unwrap();
        assert!(
            tx.insert_person(&new_person("Janet", "jane@EXAMPLE.com", None))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_progress_upsert_round_trip() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let person = tx
            .insert_person(&new_person("Jane", "jane@example.com", None))
            .await
            .unwrap();
        let progress = SoftwareProgress::new(person.id, "Illustrator", SoftwareStatus::InProgress);
        tx.insert_progress(&progress).await.unwrap();

        let mut updated = progress.clone();
        updated.status = SoftwareStatus::Finished;
        tx.update_progress(&updated).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.progress(person.id, "Illustrator").unwrap().status,
            SoftwareStatus::Finished
        );
        assert_eq!(store.progress_count(), 1);
    }
}
