use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_date, format_timestamp, parse_opt_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::PatientStatus;
use crate::models::*;

const PATIENT_COLUMNS: &str = "id, person_id, medical_condition_id, first_contact_date,
    initial_consult_date, status, created_at, updated_at";

struct PatientRow {
    id: String,
    person_id: String,
    medical_condition_id: String,
    first_contact_date: Option<String>,
    initial_consult_date: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl PatientRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            person_id: row.get(1)?,
            medical_condition_id: row.get(2)?,
            first_contact_date: row.get(3)?,
            initial_consult_date: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_patient(self) -> Result<Patient, DatabaseError> {
        Ok(Patient {
            id: parse_uuid(&self.id)?,
            person_id: parse_uuid(&self.person_id)?,
            medical_condition_id: parse_uuid(&self.medical_condition_id)?,
            first_contact_date: parse_opt_date(self.first_contact_date)?,
            initial_consult_date: parse_opt_date(self.initial_consult_date)?,
            status: PatientStatus::from_str(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, person_id, medical_condition_id, first_contact_date,
         initial_consult_date, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.person_id.to_string(),
            patient.medical_condition_id.to_string(),
            patient.first_contact_date.as_ref().map(format_date),
            patient.initial_consult_date.as_ref().map(format_date),
            patient.status.as_str(),
            format_timestamp(&patient.created_at),
            format_timestamp(&patient.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            PatientRow::read,
        )
        .optional()?;
    row.map(PatientRow::into_patient).transpose()
}

pub fn get_patient_by_person(conn: &Connection, person_id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE person_id = ?1"),
            params![person_id.to_string()],
            PatientRow::read,
        )
        .optional()?;
    row.map(PatientRow::into_patient).transpose()
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
    page: PageRequest,
) -> Result<Page<Patient>, DatabaseError> {
    let status = filter.status.map(|s| s.as_str());
    let condition = filter.medical_condition_id.map(|id| id.to_string());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR medical_condition_id = ?2)",
        params![status, condition],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR medical_condition_id = ?2)
         ORDER BY created_at DESC, id
         LIMIT ?3 OFFSET ?4"
    ))?;
    let rows = stmt.query_map(
        params![status, condition, page.limit(), page.offset()],
        PatientRow::read,
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?.into_patient()?);
    }
    Ok(Page::new(items, total, page))
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients
         SET medical_condition_id = ?1, first_contact_date = ?2, initial_consult_date = ?3,
             status = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            patient.medical_condition_id.to_string(),
            patient.first_contact_date.as_ref().map(format_date),
            patient.initial_consult_date.as_ref().map(format_date),
            patient.status.as_str(),
            format_timestamp(&patient.updated_at),
            patient.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}
