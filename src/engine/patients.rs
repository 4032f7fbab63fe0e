//! Patient records. One per Person, for all time.

use rusqlite::Connection;
use uuid::Uuid;

use super::error::EngineError;
use super::{identity, lookups, roles, validation};
use crate::db::repository::{self, now};
use crate::db::with_transaction;
use crate::models::enums::{PatientStatus, RoleType};
use crate::models::*;

/// Register a Patient directly, without going through a lead.
pub fn create_patient(conn: &Connection, new: &NewPatient) -> Result<Patient, EngineError> {
    let contact = validation::contact(&new.contact)?;

    with_transaction(conn, |conn| {
        lookups::require_active_condition(conn, &new.medical_condition_id)?;
        let person = identity::resolve_validated(conn, &contact)?;
        insert_for_person(
            conn,
            &person.id,
            &NewPatientForPerson {
                person_id: person.id,
                medical_condition_id: new.medical_condition_id,
                first_contact_date: new.first_contact_date,
                initial_consult_date: new.initial_consult_date,
                status: new.status,
            },
        )
    })
}

/// Make an existing Person (say a navigator or a physician) a Patient by id.
///
/// An unknown Person is `NotFound`; a deactivated one is brought back, the
/// same as when their email is seen again.
pub fn create_patient_for_person(conn: &Connection, new: &NewPatientForPerson) -> Result<Patient, EngineError> {
    with_transaction(conn, |conn| {
        let person = identity::get_person(conn, &new.person_id)?;
        lookups::require_active_condition(conn, &new.medical_condition_id)?;
        if !person.is_active {
            let reactivate = PersonUpdate { is_active: Some(true), ..Default::default() };
            identity::update_person(conn, &person.id, &reactivate)?;
            tracing::info!(person_id = %person.id, "Person reactivated");
        }
        insert_for_person(conn, &person.id, new)
    })
}

fn insert_for_person(conn: &Connection, person_id: &Uuid, new: &NewPatientForPerson) -> Result<Patient, EngineError> {
    if repository::get_patient_by_person(conn, person_id)?.is_some() {
        return Err(EngineError::DuplicatePatientForPerson { person_id: *person_id });
    }

    let ts = now();
    let patient = Patient {
        id: Uuid::new_v4(),
        person_id: *person_id,
        medical_condition_id: new.medical_condition_id,
        first_contact_date: new.first_contact_date,
        initial_consult_date: new.initial_consult_date,
        status: new.status,
        created_at: ts,
        updated_at: ts,
    };
    repository::insert_patient(conn, &patient).map_err(|e| {
        if e.is_unique_violation() {
            EngineError::DuplicatePatientForPerson { person_id: *person_id }
        } else {
            e.into()
        }
    })?;

    if patient.status == PatientStatus::Active {
        roles::ensure_role(conn, person_id, RoleType::Patient)?;
    }
    tracing::info!(patient_id = %patient.id, person_id = %person_id, "Patient registered");
    Ok(patient)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Patient, EngineError> {
    repository::get_patient(conn, id)?.ok_or_else(|| EngineError::not_found("Patient", id))
}

pub fn get_patient_by_person(conn: &Connection, person_id: &Uuid) -> Result<Option<Patient>, EngineError> {
    Ok(repository::get_patient_by_person(conn, person_id)?)
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
    page: PageRequest,
) -> Result<Page<Patient>, EngineError> {
    Ok(repository::list_patients(conn, filter, page)?)
}

/// Partial update. A status change opens or closes the Person's patient role
/// to match.
pub fn update_patient(conn: &Connection, id: &Uuid, update: &PatientUpdate) -> Result<Patient, EngineError> {
    with_transaction(conn, |conn| {
        let mut patient = get_patient(conn, id)?;
        let previous_status = patient.status;

        if let Some(condition_id) = update.medical_condition_id {
            if condition_id != patient.medical_condition_id {
                lookups::require_active_condition(conn, &condition_id)?;
                patient.medical_condition_id = condition_id;
            }
        }
        if update.first_contact_date.is_some() {
            patient.first_contact_date = update.first_contact_date;
        }
        if update.initial_consult_date.is_some() {
            patient.initial_consult_date = update.initial_consult_date;
        }
        if let Some(status) = update.status {
            patient.status = status;
        }
        patient.updated_at = now();
        repository::update_patient(conn, &patient)?;

        match (previous_status, patient.status) {
            (PatientStatus::Active, PatientStatus::Inactive) => {
                roles::end_role(conn, &patient.person_id, RoleType::Patient, patient.updated_at)?;
                tracing::info!(patient_id = %patient.id, "Patient deactivated");
            }
            (PatientStatus::Inactive, PatientStatus::Active) => {
                roles::ensure_role(conn, &patient.person_id, RoleType::Patient)?;
                tracing::info!(patient_id = %patient.id, "Patient reactivated");
            }
            _ => {}
        }
        Ok(patient)
    })
}

/// Soft delete: the record and its history stay, status becomes inactive.
pub fn deactivate_patient(conn: &Connection, id: &Uuid) -> Result<Patient, EngineError> {
    update_patient(
        conn,
        id,
        &PatientUpdate { status: Some(PatientStatus::Inactive), ..Default::default() },
    )
}
