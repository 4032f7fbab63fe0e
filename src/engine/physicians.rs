use rusqlite::Connection;
use uuid::Uuid;

use super::error::{integrity_as_validation, EngineError};
use super::{identity, roles, validation};
use crate::db::repository::{self, now};
use crate::db::with_transaction;
use crate::models::enums::RoleType;
use crate::models::*;

const MAX_JOB_TITLE_LEN: usize = 100;
const MAX_LICENSE_LEN: usize = 50;

/// Resolve the Person and make them a Physician. One Physician per Person.
pub fn register_physician(conn: &Connection, registration: &PhysicianRegistration) -> Result<Physician, EngineError> {
    let contact = validation::contact(&registration.contact)?;
    let job_title =
        validation::optional_text("job_title", registration.job_title.as_deref(), MAX_JOB_TITLE_LEN)?;
    let license = validation::optional_text(
        "medical_license_number",
        registration.medical_license_number.as_deref(),
        MAX_LICENSE_LEN,
    )?;

    with_transaction(conn, |conn| {
        let person = identity::resolve_validated(conn, &contact)?;
        if repository::get_physician_by_person(conn, &person.id)?.is_some() {
            return Err(EngineError::DuplicatePhysicianForPerson { person_id: person.id });
        }

        let ts = now();
        let physician = Physician {
            id: Uuid::new_v4(),
            person_id: person.id,
            hospital_id: registration.hospital_id,
            specialization_id: registration.specialization_id,
            job_title,
            medical_license_number: license,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        repository::insert_physician(conn, &physician).map_err(|e| {
            if e.is_unique_violation() {
                EngineError::DuplicatePhysicianForPerson { person_id: person.id }
            } else {
                integrity_as_validation(e, "hospital_id", "unknown hospital or specialization")
            }
        })?;

        roles::ensure_role(conn, &person.id, RoleType::Physician)?;
        tracing::info!(physician_id = %physician.id, person_id = %person.id, "Physician registered");
        Ok(physician)
    })
}

pub fn get_physician(conn: &Connection, id: &Uuid) -> Result<Physician, EngineError> {
    repository::get_physician(conn, id)?.ok_or_else(|| EngineError::not_found("Physician", id))
}
