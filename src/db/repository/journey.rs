use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    format_date, format_timestamp, parse_opt_date, parse_opt_uuid, parse_timestamp, parse_uuid,
};
use crate::db::DatabaseError;
use crate::models::enums::JourneyVariant;
use crate::models::*;

const JOURNEY_COLUMNS: &str = "id, patient_id, physician_id, program_id, status, referral_date,
    enrollment_date, completion_date, notes, created_at, updated_at";

struct JourneyRow {
    id: String,
    patient_id: String,
    physician_id: Option<String>,
    program_id: String,
    status: String,
    referral_date: Option<String>,
    enrollment_date: Option<String>,
    completion_date: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JourneyRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            physician_id: row.get(2)?,
            program_id: row.get(3)?,
            status: row.get(4)?,
            referral_date: row.get(5)?,
            enrollment_date: row.get(6)?,
            completion_date: row.get(7)?,
            notes: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_journey(self, variant: JourneyVariant) -> Result<Journey, DatabaseError> {
        Ok(Journey {
            id: parse_uuid(&self.id)?,
            variant,
            patient_id: parse_uuid(&self.patient_id)?,
            physician_id: parse_opt_uuid(self.physician_id)?,
            program_id: self.program_id,
            status: JourneyStatus::parse(variant, &self.status)?,
            referral_date: parse_opt_date(self.referral_date)?,
            enrollment_date: parse_opt_date(self.enrollment_date)?,
            completion_date: parse_opt_date(self.completion_date)?,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Insert into the table that backs `journey.variant`.
pub fn insert_journey(conn: &Connection, journey: &Journey) -> Result<(), DatabaseError> {
    conn.execute(
        &format!(
            "INSERT INTO {} (id, patient_id, physician_id, program_id, status, referral_date,
             enrollment_date, completion_date, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            journey.variant.table()
        ),
        params![
            journey.id.to_string(),
            journey.patient_id.to_string(),
            journey.physician_id.map(|id| id.to_string()),
            journey.program_id,
            journey.status.as_str(),
            journey.referral_date.as_ref().map(format_date),
            journey.enrollment_date.as_ref().map(format_date),
            journey.completion_date.as_ref().map(format_date),
            journey.notes,
            format_timestamp(&journey.created_at),
            format_timestamp(&journey.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_journey(
    conn: &Connection,
    variant: JourneyVariant,
    id: &Uuid,
) -> Result<Option<Journey>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {JOURNEY_COLUMNS} FROM {} WHERE id = ?1", variant.table()),
            params![id.to_string()],
            JourneyRow::read,
        )
        .optional()?;
    row.map(|r| r.into_journey(variant)).transpose()
}

/// Journeys of one variant, or of both when `variant` is `None`, oldest first.
pub fn list_journeys_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
    variant: Option<JourneyVariant>,
) -> Result<Vec<Journey>, DatabaseError> {
    let variants = match variant {
        Some(v) => vec![v],
        None => vec![JourneyVariant::ClinicalTrial, JourneyVariant::AccessProgram],
    };

    let mut journeys = Vec::new();
    for variant in variants {
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOURNEY_COLUMNS} FROM {} WHERE patient_id = ?1 ORDER BY created_at, id",
            variant.table()
        ))?;
        let rows = stmt.query_map(params![patient_id.to_string()], JourneyRow::read)?;
        for row in rows {
            journeys.push(row?.into_journey(variant)?);
        }
    }
    journeys.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(journeys)
}

/// Write status, milestone dates and notes back to the row.
pub fn update_journey(conn: &Connection, journey: &Journey) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        &format!(
            "UPDATE {}
             SET status = ?1, physician_id = ?2, referral_date = ?3, enrollment_date = ?4,
                 completion_date = ?5, notes = ?6, updated_at = ?7
             WHERE id = ?8",
            journey.variant.table()
        ),
        params![
            journey.status.as_str(),
            journey.physician_id.map(|id| id.to_string()),
            journey.referral_date.as_ref().map(format_date),
            journey.enrollment_date.as_ref().map(format_date),
            journey.completion_date.as_ref().map(format_date),
            journey.notes,
            format_timestamp(&journey.updated_at),
            journey.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Journey".into(),
            id: journey.id.to_string(),
        });
    }
    Ok(())
}
