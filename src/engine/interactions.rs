//! Append-only interaction (call) log.
//!
//! Every call is its own row. Rows are inserted, read, corrected one at a
//! time, or deleted when entered by mistake; nothing aggregates them.

use rusqlite::Connection;
use uuid::Uuid;

use super::error::{integrity_as_validation, EngineError};
use super::{patients, validation};
use crate::db::repository::{self, now};
use crate::db::with_transaction;
use crate::models::*;

const MAX_NOTES_LEN: usize = 2000;

pub fn record_interaction(conn: &Connection, new: &NewInteraction) -> Result<Interaction, EngineError> {
    let call_duration_minutes = validation::non_negative("call_duration_minutes", new.call_duration_minutes)?;
    let outcome = validation::optional_text("outcome", new.outcome.as_deref(), validation::MAX_OUTCOME_LEN)?;
    let notes = validation::optional_text("notes", new.notes.as_deref(), MAX_NOTES_LEN)?;

    with_transaction(conn, |conn| {
        patients::get_patient(conn, &new.patient_id)?;

        let interaction = Interaction {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            navigator_person_id: new.navigator_person_id,
            booking_date: new.booking_date,
            call_date: new.call_date,
            reminder_date: new.reminder_date,
            no_show: new.no_show,
            call_duration_minutes,
            outcome,
            notes,
            created_at: now(),
            corrected_at: None,
        };
        repository::insert_interaction(conn, &interaction)
            .map_err(|e| integrity_as_validation(e, "navigator_person_id", "unknown navigator"))?;

        tracing::debug!(interaction_id = %interaction.id, patient_id = %new.patient_id, "Interaction recorded");
        Ok(interaction)
    })
}

/// Fix one row's own data. Other rows for the patient are untouched.
pub fn correct_interaction(
    conn: &Connection,
    id: &Uuid,
    correction: &InteractionCorrection,
) -> Result<Interaction, EngineError> {
    with_transaction(conn, |conn| {
        let mut interaction = get_interaction(conn, id)?;

        if correction.navigator_person_id.is_some() {
            interaction.navigator_person_id = correction.navigator_person_id;
        }
        if correction.booking_date.is_some() {
            interaction.booking_date = correction.booking_date;
        }
        if correction.call_date.is_some() {
            interaction.call_date = correction.call_date;
        }
        if correction.reminder_date.is_some() {
            interaction.reminder_date = correction.reminder_date;
        }
        if let Some(no_show) = correction.no_show {
            interaction.no_show = no_show;
        }
        if correction.call_duration_minutes.is_some() {
            interaction.call_duration_minutes =
                validation::non_negative("call_duration_minutes", correction.call_duration_minutes)?;
        }
        if let Some(outcome) = &correction.outcome {
            interaction.outcome =
                validation::optional_text("outcome", Some(outcome), validation::MAX_OUTCOME_LEN)?;
        }
        if let Some(notes) = &correction.notes {
            interaction.notes = validation::optional_text("notes", Some(notes), MAX_NOTES_LEN)?;
        }
        interaction.corrected_at = Some(now());

        repository::update_interaction(conn, &interaction)
            .map_err(|e| integrity_as_validation(e, "navigator_person_id", "unknown navigator"))?;
        tracing::info!(interaction_id = %interaction.id, "Interaction corrected");
        Ok(interaction)
    })
}

pub fn get_interaction(conn: &Connection, id: &Uuid) -> Result<Interaction, EngineError> {
    repository::get_interaction(conn, id)?.ok_or_else(|| EngineError::not_found("Interaction", id))
}

/// Most recent call first, calls without a date last.
pub fn list_interactions(
    conn: &Connection,
    patient_id: &Uuid,
    page: PageRequest,
) -> Result<Page<Interaction>, EngineError> {
    patients::get_patient(conn, patient_id)?;
    Ok(repository::list_interactions_for_patient(conn, patient_id, page)?)
}

pub fn latest_interaction(conn: &Connection, patient_id: &Uuid) -> Result<Option<Interaction>, EngineError> {
    patients::get_patient(conn, patient_id)?;
    Ok(repository::get_latest_interaction(conn, patient_id)?)
}

/// Remove a single row entered by mistake.
pub fn delete_interaction(conn: &Connection, id: &Uuid) -> Result<(), EngineError> {
    if !repository::delete_interaction_row(conn, id)? {
        return Err(EngineError::not_found("Interaction", id));
    }
    tracing::info!(interaction_id = %id, "Interaction deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::engine::test_support::{patient, person};
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(10, 0, 0).unwrap()
    }

    fn call(patient_id: Uuid, call_date: NaiveDateTime) -> NewInteraction {
        NewInteraction {
            patient_id,
            call_date: Some(call_date),
            call_duration_minutes: Some(20),
            ..Default::default()
        }
    }

    #[test]
    fn each_call_is_its_own_row_and_latest_wins() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn, "p@x.com");
        for d in [1, 2, 3] {
            record_interaction(&conn, &call(p.id, day(d))).unwrap();
        }

        let page = list_interactions(&conn, &p.id, PageRequest::default()).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(latest_interaction(&conn, &p.id).unwrap().unwrap().call_date, Some(day(3)));
    }

    #[test]
    fn correction_touches_one_row() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn, "p@x.com");
        let first = record_interaction(&conn, &call(p.id, day(1))).unwrap();
        let second = record_interaction(&conn, &call(p.id, day(2))).unwrap();

        let fix = InteractionCorrection {
            no_show: Some(true),
            outcome: Some("no answer".into()),
            ..Default::default()
        };
        let corrected = correct_interaction(&conn, &first.id, &fix).unwrap();
        assert!(corrected.no_show);
        assert!(corrected.corrected_at.is_some());
        assert_eq!(corrected.call_duration_minutes, Some(20));
        assert_eq!(get_interaction(&conn, &second.id).unwrap(), second);
    }

    #[test]
    fn navigator_must_exist() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn, "p@x.com");
        let mut new = call(p.id, day(1));
        new.navigator_person_id = Some(Uuid::new_v4());
        assert!(matches!(
            record_interaction(&conn, &new),
            Err(EngineError::Validation { field: "navigator_person_id", .. })
        ));

        new.navigator_person_id = Some(person(&conn, "navigator@x.com").id);
        record_interaction(&conn, &new).unwrap();
    }

    #[test]
    fn negative_duration_and_long_outcome_are_rejected() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn, "p@x.com");
        let mut new = call(p.id, day(1));
        new.call_duration_minutes = Some(-1);
        assert!(matches!(record_interaction(&conn, &new), Err(EngineError::Validation { .. })));

        new.call_duration_minutes = None;
        new.outcome = Some("x".repeat(101));
        assert!(matches!(
            record_interaction(&conn, &new),
            Err(EngineError::Validation { field: "outcome", .. })
        ));
    }

    #[test]
    fn delete_removes_only_that_row() {
        let conn = open_memory_database().unwrap();
        let p = patient(&conn, "p@x.com");
        let a = record_interaction(&conn, &call(p.id, day(1))).unwrap();
        record_interaction(&conn, &call(p.id, day(2))).unwrap();

        delete_interaction(&conn, &a.id).unwrap();
        assert_eq!(list_interactions(&conn, &p.id, PageRequest::default()).unwrap().total, 1);
        assert!(matches!(delete_interaction(&conn, &a.id), Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn recording_for_unknown_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        assert!(matches!(
            record_interaction(&conn, &call(Uuid::new_v4(), day(1))),
            Err(EngineError::NotFound { entity: "Patient", .. })
        ));
    }
}
