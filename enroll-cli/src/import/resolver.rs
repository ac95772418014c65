//! Identity resolution: matching a row to an existing Person
//!
//! Phone is the primary identity key for this domain (emails are often
//! placeholders typed in by front-desk staff), so a phone match always
//! takes precedence over an email match. No match means a new Person is
//! created with synthesized fallbacks for whatever the row left out.

use anyhow::Result;

use crate::store::{NewPerson, Person, PersonPatch, RowTx};

use super::identity::{email_local_part, normalize_email};
use super::row::RowError;

/// Identity fields extracted from one row, already normalized.
#[derive(Debug, Clone, Default)]
pub struct IdentityCandidate {
    pub name: Option<String>,
    /// Original-cased email
    pub email: Option<String>,
    /// Ten-digit normalized phone
    pub phone: Option<String>,
}

/// Resolution outcome.
#[derive(Debug)]
pub struct ResolvedPerson {
    pub person: Person,
    pub created: bool,
}

/// Look up or create the Person an identity candidate refers to.
///
/// On a match, only fields the row actually supplied and that differ from
/// the stored values are written; a blank cell never clears stored data.
pub async fn resolve(
    tx: &mut dyn RowTx,
    candidate: &IdentityCandidate,
) -> Result<ResolvedPerson, RowError> {
    if candidate.phone.is_none() && candidate.email.is_none() {
        return Err(RowError::MissingIdentity);
    }

    let existing = find_existing(tx, candidate).await.map_err(RowError::store)?;

    match existing {
        Some(person) => {
            let patch = build_patch(&person, candidate);
            if !patch.is_empty() {
                tx.update_person(person.id, &patch)
                    .await
                    .map_err(RowError::store)?;
            }
            let person = apply_patch(person, patch);
            Ok(ResolvedPerson {
                person,
                created: false,
            })
        }
        None => {
            let new_person = synthesize(candidate);
            let person = tx.insert_person(&new_person).await.map_err(RowError::store)?;
            log::debug!("Created person {} ({})", person.name, person.id);
            Ok(ResolvedPerson {
                person,
                created: true,
            })
        }
    }
}

async fn find_existing(
    tx: &mut dyn RowTx,
    candidate: &IdentityCandidate,
) -> Result<Option<Person>> {
    if let Some(phone) = &candidate.phone {
        if let Some(person) = tx.find_person_by_phone(phone).await? {
            return Ok(Some(person));
        }
    }
    if let Some(email) = &candidate.email {
        if let Some(person) = tx.find_person_by_email(&normalize_email(email)).await? {
            return Ok(Some(person));
        }
    }
    Ok(None)
}

fn build_patch(person: &Person, candidate: &IdentityCandidate) -> PersonPatch {
    let mut patch = PersonPatch::default();
    if let Some(name) = &candidate.name {
        if name != &person.name {
            patch.name = Some(name.clone());
        }
    }
    if let Some(email) = &candidate.email {
        if normalize_email(email) != normalize_email(&person.email) {
            patch.email = Some(email.clone());
        }
    }
    if let Some(phone) = &candidate.phone {
        if person.phone.as_deref() != Some(phone.as_str()) {
            patch.phone = Some(phone.clone());
        }
    }
    patch
}

fn apply_patch(mut person: Person, patch: PersonPatch) -> Person {
    if let Some(name) = patch.name {
        person.name = name;
    }
    if let Some(email) = patch.email {
        person.email = email;
    }
    if let Some(phone) = patch.phone {
        person.phone = Some(phone);
    }
    person
}

/// Fill in the fields a new Person needs from whatever the row supplied.
/// Everything here is deterministic so a re-run of the same file produces
/// the same synthesized values.
fn synthesize(candidate: &IdentityCandidate) -> NewPerson {
    let name = candidate
        .name
        .clone()
        .or_else(|| {
            candidate
                .email
                .as_deref()
                .map(|e| email_local_part(e).to_string())
        })
        .or_else(|| candidate.phone.as_ref().map(|p| format!("Student {}", p)))
        .unwrap_or_else(|| "Unknown Student".to_string());

    let email = candidate.email.clone().unwrap_or_else(|| {
        // Placeholder for phone-only rows; the unique-email invariant still
        // holds because the phone is unique.
        let phone = candidate.phone.as_deref().unwrap_or("unknown");
        format!("{}@unknown.example", phone)
    });

    let initial_credential = candidate
        .phone
        .clone()
        .unwrap_or_else(|| email_local_part(&email).to_string());

    NewPerson {
        name,
        email,
        phone: candidate.phone.clone(),
        initial_credential,
    }
}
