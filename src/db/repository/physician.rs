use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const PHYSICIAN_COLUMNS: &str = "id, person_id, hospital_id, specialization_id, job_title,
    medical_license_number, is_active, created_at, updated_at";

struct PhysicianRow {
    id: String,
    person_id: String,
    hospital_id: Option<String>,
    specialization_id: Option<String>,
    job_title: Option<String>,
    medical_license_number: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl PhysicianRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            person_id: row.get(1)?,
            hospital_id: row.get(2)?,
            specialization_id: row.get(3)?,
            job_title: row.get(4)?,
            medical_license_number: row.get(5)?,
            is_active: row.get::<_, i32>(6)? != 0,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_physician(self) -> Result<Physician, DatabaseError> {
        Ok(Physician {
            id: parse_uuid(&self.id)?,
            person_id: parse_uuid(&self.person_id)?,
            hospital_id: parse_opt_uuid(self.hospital_id)?,
            specialization_id: parse_opt_uuid(self.specialization_id)?,
            job_title: self.job_title,
            medical_license_number: self.medical_license_number,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_physician(conn: &Connection, physician: &Physician) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO physicians (id, person_id, hospital_id, specialization_id, job_title,
         medical_license_number, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            physician.id.to_string(),
            physician.person_id.to_string(),
            physician.hospital_id.map(|id| id.to_string()),
            physician.specialization_id.map(|id| id.to_string()),
            physician.job_title,
            physician.medical_license_number,
            physician.is_active as i32,
            format_timestamp(&physician.created_at),
            format_timestamp(&physician.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_physician(conn: &Connection, id: &Uuid) -> Result<Option<Physician>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PHYSICIAN_COLUMNS} FROM physicians WHERE id = ?1"),
            params![id.to_string()],
            PhysicianRow::read,
        )
        .optional()?;
    row.map(PhysicianRow::into_physician).transpose()
}

pub fn get_physician_by_person(
    conn: &Connection,
    person_id: &Uuid,
) -> Result<Option<Physician>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PHYSICIAN_COLUMNS} FROM physicians WHERE person_id = ?1"),
            params![person_id.to_string()],
            PhysicianRow::read,
        )
        .optional()?;
    row.map(PhysicianRow::into_physician).transpose()
}
