//! Lead intake and the conversion state machine.
//!
//! ```text
//! new ──► contacted ──► converted
//!  │          │
//!  └──────────┴──────► lost
//! ```
//!
//! `new` may also convert directly. Converted and lost are terminal.

use rusqlite::Connection;
use uuid::Uuid;

use super::error::{integrity_as_validation, EngineError};
use super::{identity, lookups, roles, validation};
use crate::db::repository::{self, now};
use crate::db::with_transaction;
use crate::models::enums::{LeadStatus, PatientStatus, RoleType};
use crate::models::*;

const MAX_LOST_REASON_LEN: usize = 500;

/// Record an expression of interest.
///
/// Resolves the Person, then reuses their open lead for the same condition or
/// opens a new one, and makes sure the Person holds an active lead role. A
/// repeated submission before conversion therefore lands on the same Lead.
pub fn intake_lead(conn: &Connection, intake: &LeadIntake) -> Result<Lead, EngineError> {
    let contact = validation::contact(&intake.contact)?;

    with_transaction(conn, |conn| {
        lookups::require_active_condition(conn, &intake.medical_condition_id)?;
        let person = identity::resolve_validated(conn, &contact)?;

        let lead = match repository::get_open_lead(conn, &person.id, &intake.medical_condition_id)? {
            Some(mut open) => {
                refresh_open_lead(conn, &mut open, intake)?;
                open
            }
            None => insert_new_lead(conn, &person.id, intake)?,
        };

        roles::ensure_role(conn, &person.id, RoleType::Lead)?;
        Ok(lead)
    })
}

fn insert_new_lead(conn: &Connection, person_id: &Uuid, intake: &LeadIntake) -> Result<Lead, EngineError> {
    let ts = now();
    let lead = Lead {
        id: Uuid::new_v4(),
        person_id: *person_id,
        medical_condition_id: intake.medical_condition_id,
        contact_type_id: intake.contact_type_id,
        status: LeadStatus::New,
        first_contact_date: intake.first_contact_date,
        initial_consult_date: intake.initial_consult_date,
        converted_to_patient_id: None,
        converted_at: None,
        lost_reason: None,
        created_at: ts,
        updated_at: ts,
    };

    match repository::insert_lead(conn, &lead) {
        Ok(()) => {
            tracing::info!(lead_id = %lead.id, person_id = %person_id, "Lead opened");
            Ok(lead)
        }
        Err(e) if e.is_unique_violation() => {
            tracing::warn!(person_id = %person_id, "Open lead created concurrently, re-reading");
            repository::get_open_lead(conn, person_id, &intake.medical_condition_id)?
                .ok_or_else(|| EngineError::Database(e))
        }
        Err(e) => Err(integrity_as_validation(e, "contact_type_id", "unknown contact type")),
    }
}

/// A re-submission carries newer facts about the same enquiry.
fn refresh_open_lead(conn: &Connection, lead: &mut Lead, intake: &LeadIntake) -> Result<(), EngineError> {
    let mut changed = false;
    if intake.contact_type_id.is_some() && lead.contact_type_id != intake.contact_type_id {
        lead.contact_type_id = intake.contact_type_id;
        changed = true;
    }
    if intake.first_contact_date.is_some() && lead.first_contact_date.is_none() {
        lead.first_contact_date = intake.first_contact_date;
        changed = true;
    }
    if intake.initial_consult_date.is_some() && lead.initial_consult_date != intake.initial_consult_date {
        lead.initial_consult_date = intake.initial_consult_date;
        changed = true;
    }
    if changed {
        lead.updated_at = now();
        repository::update_lead(conn, lead)
            .map_err(|e| integrity_as_validation(e, "contact_type_id", "unknown contact type"))?;
    }
    Ok(())
}

pub fn get_lead(conn: &Connection, id: &Uuid) -> Result<Lead, EngineError> {
    repository::get_lead(conn, id)?.ok_or_else(|| EngineError::not_found("Lead", id))
}

pub fn list_leads(conn: &Connection, filter: &LeadFilter, page: PageRequest) -> Result<Page<Lead>, EngineError> {
    Ok(repository::list_leads(conn, filter, page)?)
}

pub fn mark_contacted(conn: &Connection, id: &Uuid) -> Result<Lead, EngineError> {
    with_transaction(conn, |conn| {
        let mut lead = get_lead(conn, id)?;
        transition(&lead, LeadStatus::Contacted)?;
        lead.status = LeadStatus::Contacted;
        lead.updated_at = now();
        repository::update_lead(conn, &lead)?;
        tracing::info!(lead_id = %lead.id, "Lead contacted");
        Ok(lead)
    })
}

/// Close an open lead without converting it.
pub fn mark_lost(conn: &Connection, id: &Uuid, reason: Option<&str>) -> Result<Lead, EngineError> {
    let reason = validation::optional_text("lost_reason", reason, MAX_LOST_REASON_LEN)?;

    with_transaction(conn, |conn| {
        let mut lead = get_lead(conn, id)?;
        transition(&lead, LeadStatus::Lost)?;
        lead.status = LeadStatus::Lost;
        lead.lost_reason = reason;
        lead.updated_at = now();
        repository::update_lead(conn, &lead)?;

        release_lead_role_if_idle(conn, &lead.person_id)?;
        tracing::info!(lead_id = %lead.id, "Lead lost");
        Ok(lead)
    })
}

/// Convert a lead into a Patient, all in one transaction.
///
/// The owning Person's existing Patient is reused (its condition and date
/// fields change, and an inactive Patient becomes active again) or a new one
/// is created from the lead. Converting a
/// lead that is already terminal fails with `InvalidTransition` and writes
/// nothing.
pub fn convert_lead(conn: &Connection, id: &Uuid) -> Result<Patient, EngineError> {
    with_transaction(conn, |conn| {
        let mut lead = get_lead(conn, id)?;
        transition(&lead, LeadStatus::Converted)?;

        let ts = now();
        let patient = match repository::get_patient_by_person(conn, &lead.person_id)? {
            Some(mut existing) => {
                existing.medical_condition_id = lead.medical_condition_id;
                if lead.first_contact_date.is_some() {
                    existing.first_contact_date = lead.first_contact_date;
                }
                if lead.initial_consult_date.is_some() {
                    existing.initial_consult_date = lead.initial_consult_date;
                }
                if existing.status == PatientStatus::Inactive {
                    existing.status = PatientStatus::Active;
                    tracing::info!(patient_id = %existing.id, "Patient reactivated by conversion");
                }
                existing.updated_at = ts;
                repository::update_patient(conn, &existing)?;
                tracing::info!(lead_id = %lead.id, patient_id = %existing.id, "Lead linked to existing patient");
                existing
            }
            None => {
                let patient = Patient {
                    id: Uuid::new_v4(),
                    person_id: lead.person_id,
                    medical_condition_id: lead.medical_condition_id,
                    first_contact_date: lead.first_contact_date,
                    initial_consult_date: lead.initial_consult_date,
                    status: PatientStatus::Active,
                    created_at: ts,
                    updated_at: ts,
                };
                repository::insert_patient(conn, &patient).map_err(|e| {
                    if e.is_unique_violation() {
                        EngineError::DuplicatePatientForPerson { person_id: lead.person_id }
                    } else {
                        e.into()
                    }
                })?;
                tracing::info!(lead_id = %lead.id, patient_id = %patient.id, "Lead converted to new patient");
                patient
            }
        };

        lead.status = LeadStatus::Converted;
        lead.converted_to_patient_id = Some(patient.id);
        lead.converted_at = Some(ts);
        lead.updated_at = ts;
        repository::update_lead(conn, &lead)?;

        roles::ensure_role(conn, &lead.person_id, RoleType::Patient)?;
        release_lead_role_if_idle(conn, &lead.person_id)?;
        Ok(patient)
    })
}

fn transition(lead: &Lead, next: LeadStatus) -> Result<(), EngineError> {
    if lead.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(EngineError::transition("Lead", lead.status, next))
    }
}

/// The lead role lasts as long as the Person has an open lead.
fn release_lead_role_if_idle(conn: &Connection, person_id: &Uuid) -> Result<(), EngineError> {
    if repository::count_open_leads_for_person(conn, person_id)? == 0 {
        roles::end_role(conn, person_id, RoleType::Lead, now())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::engine::test_support::{condition, contact};
    use chrono::NaiveDate;

    fn intake(conn: &Connection, email: &str, abbreviation: &str) -> LeadIntake {
        LeadIntake {
            contact: contact(email),
            medical_condition_id: condition(conn, abbreviation),
            contact_type_id: None,
            first_contact_date: None,
            initial_consult_date: None,
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn repeated_submission_lands_on_one_lead() {
        let conn = open_memory_database().unwrap();
        let first = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        let second = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(count(&conn, "persons"), 1);
        assert_eq!(count(&conn, "leads"), 1);
        let roles = roles::active_roles(&conn, &first.person_id).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_type, RoleType::Lead);
    }

    #[test]
    fn unknown_condition_is_validation_error() {
        let conn = open_memory_database().unwrap();
        let mut request = intake(&conn, "a@x.com", "GBM");
        request.medical_condition_id = Uuid::new_v4();
        let err = intake_lead(&conn, &request).unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "medical_condition_id", .. }));
        assert_eq!(count(&conn, "persons"), 0);
    }

    #[test]
    fn unknown_contact_type_rolls_back_person() {
        let conn = open_memory_database().unwrap();
        let mut request = intake(&conn, "a@x.com", "GBM");
        request.contact_type_id = Some(Uuid::new_v4());
        let err = intake_lead(&conn, &request).unwrap_err();
        assert!(matches!(err, EngineError::Validation { field: "contact_type_id", .. }));
        assert_eq!(count(&conn, "persons"), 0);
    }

    #[test]
    fn conversion_creates_patient_and_swaps_roles() {
        let conn = open_memory_database().unwrap();
        let mut request = intake(&conn, "a@x.com", "GBM");
        request.first_contact_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let lead = intake_lead(&conn, &request).unwrap();

        let patient = convert_lead(&conn, &lead.id).unwrap();
        assert_eq!(patient.person_id, lead.person_id);
        assert_eq!(patient.medical_condition_id, lead.medical_condition_id);
        assert_eq!(patient.first_contact_date, NaiveDate::from_ymd_opt(2024, 3, 1));

        let stored = get_lead(&conn, &lead.id).unwrap();
        assert_eq!(stored.status, LeadStatus::Converted);
        assert_eq!(stored.converted_to_patient_id, Some(patient.id));
        assert!(stored.converted_at.is_some());

        let roles = roles::active_roles(&conn, &lead.person_id).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role_type, RoleType::Patient);
    }

    #[test]
    fn converting_twice_is_invalid_and_changes_nothing() {
        let conn = open_memory_database().unwrap();
        let lead = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        convert_lead(&conn, &lead.id).unwrap();
        let converted = get_lead(&conn, &lead.id).unwrap();

        let err = convert_lead(&conn, &lead.id).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { entity: "Lead", .. }));
        assert_eq!(count(&conn, "patients"), 1);
        assert_eq!(get_lead(&conn, &lead.id).unwrap().converted_at, converted.converted_at);
    }

    #[test]
    fn returning_patient_reuses_patient_record() {
        let conn = open_memory_database().unwrap();
        let first = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        let patient = convert_lead(&conn, &first.id).unwrap();

        let mut second_request = intake(&conn, "a@x.com", "IPF");
        second_request.initial_consult_date = NaiveDate::from_ymd_opt(2024, 9, 9);
        let second = intake_lead(&conn, &second_request).unwrap();
        assert_ne!(first.id, second.id);

        let again = convert_lead(&conn, &second.id).unwrap();
        assert_eq!(again.id, patient.id);
        assert_eq!(again.medical_condition_id, condition(&conn, "IPF"));
        assert_eq!(again.initial_consult_date, NaiveDate::from_ymd_opt(2024, 9, 9));
        assert_eq!(again.status, patient.status);
        assert_eq!(again.created_at, patient.created_at);
        assert_eq!(count(&conn, "patients"), 1);
    }

    #[test]
    fn lost_is_terminal() {
        let conn = open_memory_database().unwrap();
        let lead = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        let lost = mark_lost(&conn, &lead.id, Some("unreachable")).unwrap();
        assert_eq!(lost.status, LeadStatus::Lost);
        assert_eq!(lost.lost_reason.as_deref(), Some("unreachable"));
        assert!(roles::active_roles(&conn, &lead.person_id).unwrap().is_empty());

        assert!(matches!(
            convert_lead(&conn, &lead.id),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            mark_contacted(&conn, &lead.id),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn contacted_then_converted() {
        let conn = open_memory_database().unwrap();
        let lead = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        assert_eq!(mark_contacted(&conn, &lead.id).unwrap().status, LeadStatus::Contacted);
        assert!(matches!(
            mark_contacted(&conn, &lead.id),
            Err(EngineError::InvalidTransition { .. })
        ));
        convert_lead(&conn, &lead.id).unwrap();
    }

    #[test]
    fn lead_role_survives_while_another_lead_is_open() {
        let conn = open_memory_database().unwrap();
        let gbm = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        intake_lead(&conn, &intake(&conn, "a@x.com", "DMD")).unwrap();

        mark_lost(&conn, &gbm.id, None).unwrap();
        let roles = roles::active_roles(&conn, &gbm.person_id).unwrap();
        assert!(roles.iter().any(|r| r.role_type == RoleType::Lead));
    }

    #[test]
    fn missing_lead_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            convert_lead(&conn, &Uuid::new_v4()),
            Err(EngineError::NotFound { entity: "Lead", .. })
        ));
    }

    #[test]
    fn conversion_reactivates_inactive_patient() {
        let conn = open_memory_database().unwrap();
        let first = intake_lead(&conn, &intake(&conn, "a@x.com", "GBM")).unwrap();
        let patient = convert_lead(&conn, &first.id).unwrap();
        crate::engine::patients::deactivate_patient(&conn, &patient.id).unwrap();
        assert!(roles::active_roles(&conn, &patient.person_id).unwrap().is_empty());

        let second = intake_lead(&conn, &intake(&conn, "a@x.com", "IPF")).unwrap();
        let again = convert_lead(&conn, &second.id).unwrap();

        assert_eq!(again.id, patient.id);
        assert_eq!(again.status, PatientStatus::Active);
        let stored = repository::get_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(stored.status, PatientStatus::Active);
        let active = roles::active_roles(&conn, &patient.person_id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].role_type, RoleType::Patient);
    }
}
