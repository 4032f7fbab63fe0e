//! Clinical-trial and access-program journeys.
//!
//! A patient may have any number of journeys of either variant at once; each
//! advances through its own variant's lifecycle independently.

use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

use super::error::{integrity_as_validation, EngineError};
use super::{patients, validation};
use crate::db::repository::{self, now, today};
use crate::db::with_transaction;
use crate::models::enums::JourneyVariant;
use crate::models::*;

const MAX_NOTES_LEN: usize = 2000;

/// Always inserts a new journey in the variant's initial status.
pub fn open_journey(conn: &Connection, patient_id: &Uuid, new: &NewJourney) -> Result<Journey, EngineError> {
    let program_id =
        validation::required_text("program_id", &new.program_id, validation::MAX_PROGRAM_ID_LEN)?;
    let notes = validation::optional_text("notes", new.notes.as_deref(), MAX_NOTES_LEN)?;

    with_transaction(conn, |conn| {
        patients::get_patient(conn, patient_id)?;

        let ts = now();
        let journey = Journey {
            id: Uuid::new_v4(),
            variant: new.variant,
            patient_id: *patient_id,
            physician_id: new.physician_id,
            program_id,
            status: JourneyStatus::initial(new.variant),
            referral_date: new.referral_date.or_else(|| Some(today())),
            enrollment_date: None,
            completion_date: None,
            notes,
            created_at: ts,
            updated_at: ts,
        };
        repository::insert_journey(conn, &journey)
            .map_err(|e| integrity_as_validation(e, "physician_id", "unknown physician"))?;

        tracing::info!(
            journey_id = %journey.id,
            patient_id = %patient_id,
            variant = %journey.variant,
            "Journey opened"
        );
        Ok(journey)
    })
}

/// Move a journey to `next` if its lifecycle allows it, stamping the
/// enrollment or completion milestone (today when `milestone_date` is absent).
pub fn advance_journey(
    conn: &Connection,
    variant: JourneyVariant,
    id: &Uuid,
    next: JourneyStatus,
    milestone_date: Option<NaiveDate>,
) -> Result<Journey, EngineError> {
    with_transaction(conn, |conn| {
        let mut journey = get_journey(conn, variant, id)?;
        if !journey.status.can_transition_to(next) {
            return Err(EngineError::transition("Journey", journey.status, next));
        }

        if let Some(milestone) = next.milestone() {
            let date = milestone_date.unwrap_or_else(today);
            match milestone {
                Milestone::Enrollment => journey.enrollment_date = Some(date),
                Milestone::Completion => {
                    if journey.enrollment_date.is_some_and(|enrolled| date < enrolled) {
                        return Err(EngineError::validation(
                            "milestone_date",
                            "completion precedes enrollment",
                        ));
                    }
                    journey.completion_date = Some(date);
                }
            }
        }

        let from = journey.status;
        journey.status = next;
        journey.updated_at = now();
        repository::update_journey(conn, &journey)?;
        tracing::info!(journey_id = %journey.id, from = %from, to = %next, "Journey advanced");
        Ok(journey)
    })
}

pub fn get_journey(conn: &Connection, variant: JourneyVariant, id: &Uuid) -> Result<Journey, EngineError> {
    repository::get_journey(conn, variant, id)?.ok_or_else(|| EngineError::not_found("Journey", id))
}

pub fn list_journeys(
    conn: &Connection,
    patient_id: &Uuid,
    variant: Option<JourneyVariant>,
) -> Result<Vec<Journey>, EngineError> {
    patients::get_patient(conn, patient_id)?;
    Ok(repository::list_journeys_for_patient(conn, patient_id, variant)?)
}
