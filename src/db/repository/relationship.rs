use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_date, format_timestamp, parse_date, parse_opt_date, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::RelationshipType;
use crate::models::*;

const RELATIONSHIP_COLUMNS: &str = "id, patient_id, physician_id, relationship_type, is_primary,
    start_date, end_date, created_at, updated_at";

type RelationshipRow = (
    String,
    String,
    String,
    String,
    bool,
    String,
    Option<String>,
    String,
    String,
);

fn read_relationship(row: &Row<'_>) -> rusqlite::Result<RelationshipRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i32>(4)? != 0,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn relationship_from_row(row: RelationshipRow) -> Result<PatientPhysicianRelationship, DatabaseError> {
    let (id, patient_id, physician_id, relationship_type, is_primary, start_date, end_date, created_at, updated_at) =
        row;
    Ok(PatientPhysicianRelationship {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        physician_id: parse_uuid(&physician_id)?,
        relationship_type: RelationshipType::from_str(&relationship_type)?,
        is_primary,
        start_date: parse_date(&start_date)?,
        end_date: parse_opt_date(end_date)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<RelationshipRow>>,
) -> Result<Vec<PatientPhysicianRelationship>, DatabaseError> {
    let mut items = Vec::new();
    for row in rows {
        items.push(relationship_from_row(row?)?);
    }
    Ok(items)
}

pub fn insert_relationship(
    conn: &Connection,
    rel: &PatientPhysicianRelationship,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_physician_relationships (id, patient_id, physician_id,
         relationship_type, is_primary, start_date, end_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rel.id.to_string(),
            rel.patient_id.to_string(),
            rel.physician_id.to_string(),
            rel.relationship_type.as_str(),
            rel.is_primary as i32,
            format_date(&rel.start_date),
            rel.end_date.as_ref().map(format_date),
            format_timestamp(&rel.created_at),
            format_timestamp(&rel.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_relationship(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<PatientPhysicianRelationship>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RELATIONSHIP_COLUMNS} FROM patient_physician_relationships WHERE id = ?1"),
            params![id.to_string()],
            read_relationship,
        )
        .optional()?;
    row.map(relationship_from_row).transpose()
}

/// The open primary edge for a patient, if any.
pub fn get_primary_relationship(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<PatientPhysicianRelationship>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {RELATIONSHIP_COLUMNS} FROM patient_physician_relationships
                 WHERE patient_id = ?1 AND is_primary = 1 AND end_date IS NULL"
            ),
            params![patient_id.to_string()],
            read_relationship,
        )
        .optional()?;
    row.map(relationship_from_row).transpose()
}

/// The open edge between a patient and a physician, if any.
pub fn get_open_relationship(
    conn: &Connection,
    patient_id: &Uuid,
    physician_id: &Uuid,
) -> Result<Option<PatientPhysicianRelationship>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {RELATIONSHIP_COLUMNS} FROM patient_physician_relationships
                 WHERE patient_id = ?1 AND physician_id = ?2 AND end_date IS NULL"
            ),
            params![patient_id.to_string(), physician_id.to_string()],
            read_relationship,
        )
        .optional()?;
    row.map(relationship_from_row).transpose()
}

/// Every edge for a patient, open and ended, oldest first.
pub fn list_relationships_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientPhysicianRelationship>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RELATIONSHIP_COLUMNS} FROM patient_physician_relationships
         WHERE patient_id = ?1
         ORDER BY start_date, created_at"
    ))?;
    let rows = stmt.query_map(params![patient_id.to_string()], read_relationship)?;
    collect(rows)
}

pub fn set_relationship_primary(
    conn: &Connection,
    id: &Uuid,
    is_primary: bool,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patient_physician_relationships SET is_primary = ?1, updated_at = ?2 WHERE id = ?3",
        params![is_primary as i32, format_timestamp(updated_at), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "PatientPhysicianRelationship".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Close an edge. Ending a primary edge also releases the primary slot.
pub fn end_relationship_row(
    conn: &Connection,
    id: &Uuid,
    end_date: &NaiveDate,
    updated_at: &NaiveDateTime,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patient_physician_relationships SET end_date = ?1, updated_at = ?2 WHERE id = ?3",
        params![format_date(end_date), format_timestamp(updated_at), id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "PatientPhysicianRelationship".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}
