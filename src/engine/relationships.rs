//! Patient ↔ physician edges and the single-primary invariant.
//!
//! An edge is open while `end_date` is unset. A patient has at most one open
//! edge per physician and at most one open primary edge overall. Swapping the
//! primary demotes the old edge (it stays open as an ordinary relationship)
//! and promotes the new one in the same transaction.

use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

use super::error::EngineError;
use super::{patients, physicians};
use crate::db::repository::{self, now, today};
use crate::db::with_transaction;
use crate::models::enums::RelationshipType;
use crate::models::PatientPhysicianRelationship;

/// Make `physician_id` the patient's primary physician.
pub fn set_primary_physician(
    conn: &Connection,
    patient_id: &Uuid,
    physician_id: &Uuid,
) -> Result<PatientPhysicianRelationship, EngineError> {
    with_transaction(conn, |conn| {
        patients::get_patient(conn, patient_id)?;
        physicians::get_physician(conn, physician_id)?;

        let ts = now();
        if let Some(current) = repository::get_primary_relationship(conn, patient_id)? {
            if current.physician_id == *physician_id {
                return Ok(current);
            }
            repository::set_relationship_primary(conn, &current.id, false, &ts)?;
            tracing::info!(
                patient_id = %patient_id,
                physician_id = %current.physician_id,
                "Primary physician demoted"
            );
        }

        let duplicate = |e: crate::db::DatabaseError| {
            if e.is_unique_violation() {
                EngineError::DuplicatePrimaryPhysician { patient_id: *patient_id }
            } else {
                e.into()
            }
        };

        let primary = match repository::get_open_relationship(conn, patient_id, physician_id)? {
            Some(mut edge) => {
                repository::set_relationship_primary(conn, &edge.id, true, &ts).map_err(duplicate)?;
                edge.is_primary = true;
                edge.updated_at = ts;
                edge
            }
            None => {
                let edge = PatientPhysicianRelationship {
                    id: Uuid::new_v4(),
                    patient_id: *patient_id,
                    physician_id: *physician_id,
                    relationship_type: RelationshipType::Treating,
                    is_primary: true,
                    start_date: today(),
                    end_date: None,
                    created_at: ts,
                    updated_at: ts,
                };
                repository::insert_relationship(conn, &edge).map_err(duplicate)?;
                edge
            }
        };

        tracing::info!(patient_id = %patient_id, physician_id = %physician_id, "Primary physician set");
        Ok(primary)
    })
}

/// Open a non-primary edge, or return the one already open for this pair.
pub fn link_physician(
    conn: &Connection,
    patient_id: &Uuid,
    physician_id: &Uuid,
    relationship_type: RelationshipType,
) -> Result<PatientPhysicianRelationship, EngineError> {
    with_transaction(conn, |conn| {
        patients::get_patient(conn, patient_id)?;
        physicians::get_physician(conn, physician_id)?;

        if let Some(open) = repository::get_open_relationship(conn, patient_id, physician_id)? {
            return Ok(open);
        }

        let ts = now();
        let edge = PatientPhysicianRelationship {
            id: Uuid::new_v4(),
            patient_id: *patient_id,
            physician_id: *physician_id,
            relationship_type,
            is_primary: false,
            start_date: today(),
            end_date: None,
            created_at: ts,
            updated_at: ts,
        };
        repository::insert_relationship(conn, &edge)?;
        tracing::info!(patient_id = %patient_id, physician_id = %physician_id, "Physician linked");
        Ok(edge)
    })
}

/// End an open edge. `end_date` defaults to today.
pub fn end_relationship(
    conn: &Connection,
    relationship_id: &Uuid,
    end_date: Option<NaiveDate>,
) -> Result<PatientPhysicianRelationship, EngineError> {
    with_transaction(conn, |conn| {
        let mut edge = repository::get_relationship(conn, relationship_id)?
            .ok_or_else(|| EngineError::not_found("PatientPhysicianRelationship", relationship_id))?;
        if edge.end_date.is_some() {
            return Err(EngineError::transition("PatientPhysicianRelationship", "ended", "ended"));
        }

        let end_date = end_date.unwrap_or_else(today);
        if end_date < edge.start_date {
            return Err(EngineError::validation("end_date", "precedes the relationship start date"));
        }

        let ts = now();
        repository::end_relationship_row(conn, &edge.id, &end_date, &ts)?;
        edge.end_date = Some(end_date);
        edge.updated_at = ts;
        tracing::info!(relationship_id = %edge.id, "Relationship ended");
        Ok(edge)
    })
}

pub fn primary_physician(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<PatientPhysicianRelationship>, EngineError> {
    patients::get_patient(conn, patient_id)?;
    Ok(repository::get_primary_relationship(conn, patient_id)?)
}

pub fn list_relationships(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientPhysicianRelationship>, EngineError> {
    patients::get_patient(conn, patient_id)?;
    Ok(repository::list_relationships_for_patient(conn, patient_id)?)
}
