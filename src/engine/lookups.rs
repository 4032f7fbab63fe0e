//! Reference-data maintenance: medical conditions and their legacy aliases,
//! plus read access to the other lookup tables.

use rusqlite::Connection;
use uuid::Uuid;

use super::error::EngineError;
use super::validation;
use crate::db::repository::{self, now, LookupTable};
use crate::db::with_transaction;
use crate::models::*;

const MAX_ABBREVIATION_LEN: usize = 20;
const MAX_DESCRIPTION_LEN: usize = 1000;
const MAX_HOSPITAL_NAME_LEN: usize = 200;

/// Fails with a validation error unless the condition exists and is active.
pub(crate) fn require_active_condition(conn: &Connection, id: &Uuid) -> Result<MedicalCondition, EngineError> {
    match repository::get_medical_condition(conn, id)? {
        Some(condition) if condition.is_active => Ok(condition),
        Some(_) => Err(EngineError::validation("medical_condition_id", "condition is inactive")),
        None => Err(EngineError::validation("medical_condition_id", "unknown condition")),
    }
}

pub fn create_condition(conn: &Connection, new: &NewMedicalCondition) -> Result<MedicalCondition, EngineError> {
    let ts = now();
    let condition = MedicalCondition {
        id: Uuid::new_v4(),
        name: validation::required_text("name", &new.name, validation::MAX_NAME_LEN)?,
        abbreviation: validation::optional_text(
            "abbreviation",
            new.abbreviation.as_deref(),
            MAX_ABBREVIATION_LEN,
        )?,
        description: validation::optional_text(
            "description",
            new.description.as_deref(),
            MAX_DESCRIPTION_LEN,
        )?,
        is_active: true,
        created_at: ts,
        updated_at: ts,
    };

    repository::insert_medical_condition(conn, &condition).map_err(|e| {
        if e.is_unique_violation() {
            EngineError::validation("name", format!("condition '{}' already exists", condition.name))
        } else {
            e.into()
        }
    })?;
    tracing::info!(condition_id = %condition.id, "Medical condition created");
    Ok(condition)
}

pub fn get_condition(conn: &Connection, id: &Uuid) -> Result<MedicalCondition, EngineError> {
    repository::get_medical_condition(conn, id)?
        .ok_or_else(|| EngineError::not_found("MedicalCondition", id))
}

pub fn list_conditions(
    conn: &Connection,
    is_active: Option<bool>,
    page: PageRequest,
) -> Result<Page<MedicalCondition>, EngineError> {
    Ok(repository::list_medical_conditions(conn, is_active, page)?)
}

pub fn update_condition(
    conn: &Connection,
    id: &Uuid,
    update: &MedicalConditionUpdate,
) -> Result<MedicalCondition, EngineError> {
    with_transaction(conn, |conn| {
        let mut condition = get_condition(conn, id)?;
        if let Some(name) = &update.name {
            condition.name = validation::required_text("name", name, validation::MAX_NAME_LEN)?;
        }
        if let Some(abbreviation) = &update.abbreviation {
            condition.abbreviation =
                validation::optional_text("abbreviation", Some(abbreviation), MAX_ABBREVIATION_LEN)?;
        }
        if let Some(description) = &update.description {
            condition.description =
                validation::optional_text("description", Some(description), MAX_DESCRIPTION_LEN)?;
        }
        if let Some(is_active) = update.is_active {
            condition.is_active = is_active;
        }
        condition.updated_at = now();

        repository::update_medical_condition(conn, &condition).map_err(|e| {
            if e.is_unique_violation() {
                EngineError::validation("name", format!("condition '{}' already exists", condition.name))
            } else {
                e.into()
            }
        })?;
        Ok(condition)
    })
}

/// Soft activate or deactivate. Existing patients and leads keep their link.
pub fn set_condition_active(conn: &Connection, id: &Uuid, is_active: bool) -> Result<MedicalCondition, EngineError> {
    if !repository::set_lookup_active(conn, LookupTable::MedicalConditions, id, is_active)? {
        return Err(EngineError::not_found("MedicalCondition", id));
    }
    tracing::info!(condition_id = %id, is_active, "Medical condition activation changed");
    get_condition(conn, id)
}

/// Map a legacy free-text label to a condition.
pub fn add_condition_alias(conn: &Connection, alias: &str, condition_id: &Uuid) -> Result<(), EngineError> {
    let alias = validation::required_text("alias", alias, validation::MAX_NAME_LEN)?;
    get_condition(conn, condition_id)?;
    repository::upsert_condition_alias(conn, &alias, condition_id)?;
    Ok(())
}

pub fn list_contact_types(conn: &Connection) -> Result<Vec<ContactType>, EngineError> {
    Ok(repository::get_contact_types(conn)?)
}

pub fn list_specializations(conn: &Connection) -> Result<Vec<Specialization>, EngineError> {
    Ok(repository::get_specializations(conn)?)
}

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>, EngineError> {
    Ok(repository::get_hospitals(conn)?)
}

pub fn create_hospital(conn: &Connection, new: &NewHospital) -> Result<Hospital, EngineError> {
    let hospital = Hospital {
        id: Uuid::new_v4(),
        name: validation::required_text("name", &new.name, MAX_HOSPITAL_NAME_LEN)?,
        city: validation::optional_text("city", new.city.as_deref(), validation::MAX_NAME_LEN)?,
        country: validation::optional_text("country", new.country.as_deref(), validation::MAX_NAME_LEN)?,
        address: validation::optional_text("address", new.address.as_deref(), MAX_DESCRIPTION_LEN)?,
        is_active: true,
    };
    repository::insert_hospital(conn, &hospital)?;
    tracing::info!(hospital_id = %hospital.id, "Hospital created");
    Ok(hospital)
}
