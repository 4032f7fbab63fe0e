//! Identity resolution: one canonical Person per email address.
//!
//! Email is the natural key and is matched exactly (case-sensitive). A
//! re-sighting refreshes the name and phone with whatever the caller just
//! asserted, and brings a deactivated Person back.

use rusqlite::Connection;
use uuid::Uuid;

use super::error::EngineError;
use super::validation;
use crate::db::repository::{self, now, PersonDependents};
use crate::db::with_transaction;
use crate::models::*;

/// Find the Person owning `contact.email`, or create one.
///
/// Composes into an open transaction when there is one.
pub fn resolve_or_create(conn: &Connection, contact: &ContactDetails) -> Result<Person, EngineError> {
    let contact = validation::contact(contact)?;
    with_transaction(conn, |conn| resolve_validated(conn, &contact))
}

/// Resolution for contact details that already passed validation.
pub(crate) fn resolve_validated(conn: &Connection, contact: &ContactDetails) -> Result<Person, EngineError> {
    if let Some(existing) = repository::get_person_by_email(conn, &contact.email)? {
        return refresh(conn, existing, contact);
    }

    let ts = now();
    let id = Uuid::new_v4();
    let person = Person {
        id,
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        is_active: true,
        created_at: ts,
        updated_at: ts,
    };
    let resolved = insert_or_reread(conn, person)?;
    if resolved.id == id {
        tracing::info!(person_id = %resolved.id, "Person created");
        Ok(resolved)
    } else {
        refresh(conn, resolved, contact)
    }
}

/// Insert `person`; if another writer already took the email, return theirs.
pub(crate) fn insert_or_reread(conn: &Connection, person: Person) -> Result<Person, EngineError> {
    match repository::insert_person(conn, &person) {
        Ok(()) => Ok(person),
        Err(e) if e.is_unique_violation() => {
            tracing::warn!("Email already registered by a concurrent writer, re-reading");
            repository::get_person_by_email(conn, &person.email)?.ok_or_else(|| {
                EngineError::IdentityConflict {
                    email: person.email.clone(),
                    reason: "email is taken but the owning person could not be read".into(),
                }
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Last-write-wins refresh of contact facts on a re-sighting.
fn refresh(conn: &Connection, mut person: Person, contact: &ContactDetails) -> Result<Person, EngineError> {
    let mut changed = false;
    if person.first_name != contact.first_name {
        person.first_name = contact.first_name.clone();
        changed = true;
    }
    if person.last_name != contact.last_name {
        person.last_name = contact.last_name.clone();
        changed = true;
    }
    if contact.phone.is_some() && person.phone != contact.phone {
        person.phone = contact.phone.clone();
        changed = true;
    }
    if !person.is_active {
        person.is_active = true;
        changed = true;
        tracing::info!(person_id = %person.id, "Person reactivated");
    }

    if changed {
        person.updated_at = now();
        repository::update_person(conn, &person)?;
    }
    Ok(person)
}

pub fn get_person(conn: &Connection, id: &Uuid) -> Result<Person, EngineError> {
    repository::get_person(conn, id)?.ok_or_else(|| EngineError::not_found("Person", id))
}

pub fn get_person_by_email(conn: &Connection, email: &str) -> Result<Option<Person>, EngineError> {
    Ok(repository::get_person_by_email(conn, email.trim())?)
}

pub fn list_persons(
    conn: &Connection,
    filter: &PersonFilter,
    page: PageRequest,
) -> Result<Page<Person>, EngineError> {
    Ok(repository::list_persons(conn, filter, page)?)
}

/// Partial update. Moving to an email another Person owns is an identity conflict.
pub fn update_person(conn: &Connection, id: &Uuid, update: &PersonUpdate) -> Result<Person, EngineError> {
    with_transaction(conn, |conn| {
        let mut person = get_person(conn, id)?;

        if let Some(first_name) = &update.first_name {
            person.first_name =
                validation::required_text("first_name", first_name, validation::MAX_NAME_LEN)?;
        }
        if let Some(last_name) = &update.last_name {
            person.last_name =
                validation::required_text("last_name", last_name, validation::MAX_NAME_LEN)?;
        }
        if let Some(phone) = &update.phone {
            person.phone =
                validation::optional_text("phone", Some(phone), validation::MAX_PHONE_LEN)?;
        }
        if let Some(is_active) = update.is_active {
            person.is_active = is_active;
        }
        if let Some(email) = &update.email {
            let email = validation::email(email)?;
            if email != person.email {
                if let Some(owner) = repository::get_person_by_email(conn, &email)? {
                    return Err(EngineError::IdentityConflict {
                        email,
                        reason: format!("already belongs to person {}", owner.id),
                    });
                }
                person.email = email;
            }
        }

        person.updated_at = now();
        repository::update_person(conn, &person).map_err(|e| {
            if e.is_unique_violation() {
                EngineError::IdentityConflict {
                    email: person.email.clone(),
                    reason: "already belongs to another person".into(),
                }
            } else {
                e.into()
            }
        })?;
        Ok(person)
    })
}

/// Soft delete. History stays attached.
pub fn deactivate_person(conn: &Connection, id: &Uuid) -> Result<Person, EngineError> {
    update_person(conn, id, &PersonUpdate { is_active: Some(false), ..Default::default() })
}

/// Physical delete, only for a Person nothing else refers to.
/// Their role assignments go with them.
pub fn delete_person(conn: &Connection, id: &Uuid) -> Result<(), EngineError> {
    with_transaction(conn, |conn| {
        get_person(conn, id)?;
        let dependents: PersonDependents = repository::count_person_dependents(conn, id)?;
        if !dependents.is_empty() {
            return Err(EngineError::HasDependents {
                entity: "Person",
                id: id.to_string(),
            });
        }
        repository::delete_person_row(conn, id)?;
        tracing::info!(person_id = %id, "Person deleted");
        Ok(())
    })
}
