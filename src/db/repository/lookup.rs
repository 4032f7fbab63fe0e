use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, now, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

// ═══════════════════════════════════════════════════════════
// Medical conditions
// ═══════════════════════════════════════════════════════════

const CONDITION_COLUMNS: &str =
    "id, name, abbreviation, description, is_active, created_at, updated_at";

type ConditionRow = (String, String, Option<String>, Option<String>, bool, String, String);

fn read_condition(row: &Row<'_>) -> rusqlite::Result<ConditionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get::<_, i32>(4)? != 0,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn condition_from_row(row: ConditionRow) -> Result<MedicalCondition, DatabaseError> {
    let (id, name, abbreviation, description, is_active, created_at, updated_at) = row;
    Ok(MedicalCondition {
        id: parse_uuid(&id)?,
        name,
        abbreviation,
        description,
        is_active,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

pub fn insert_medical_condition(
    conn: &Connection,
    condition: &MedicalCondition,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medical_conditions (id, name, abbreviation, description, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            condition.id.to_string(),
            condition.name,
            condition.abbreviation,
            condition.description,
            condition.is_active as i32,
            format_timestamp(&condition.created_at),
            format_timestamp(&condition.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_medical_condition(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<MedicalCondition>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {CONDITION_COLUMNS} FROM medical_conditions WHERE id = ?1"),
            params![id.to_string()],
            read_condition,
        )
        .optional()?;
    row.map(condition_from_row).transpose()
}

pub fn list_medical_conditions(
    conn: &Connection,
    is_active: Option<bool>,
    page: PageRequest,
) -> Result<Page<MedicalCondition>, DatabaseError> {
    let is_active = is_active.map(|b| b as i32);
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM medical_conditions WHERE (?1 IS NULL OR is_active = ?1)",
        params![is_active],
        |row| row.get(0),
    )?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONDITION_COLUMNS} FROM medical_conditions
         WHERE (?1 IS NULL OR is_active = ?1)
         ORDER BY name LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![is_active, page.limit(), page.offset()], read_condition)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(condition_from_row(row?)?);
    }
    Ok(Page::new(items, total, page))
}

pub fn get_all_medical_conditions(conn: &Connection) -> Result<Vec<MedicalCondition>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONDITION_COLUMNS} FROM medical_conditions ORDER BY name"
    ))?;
    let rows = stmt.query_map([], read_condition)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(condition_from_row(row?)?);
    }
    Ok(items)
}

pub fn update_medical_condition(
    conn: &Connection,
    condition: &MedicalCondition,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE medical_conditions
         SET name = ?1, abbreviation = ?2, description = ?3, is_active = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            condition.name,
            condition.abbreviation,
            condition.description,
            condition.is_active as i32,
            format_timestamp(&condition.updated_at),
            condition.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicalCondition".into(),
            id: condition.id.to_string(),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Condition aliases
// ═══════════════════════════════════════════════════════════

/// Map a legacy free-text label onto a condition. Re-pointing an existing
/// alias replaces its target.
pub fn upsert_condition_alias(
    conn: &Connection,
    alias: &str,
    condition_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO condition_aliases (alias, medical_condition_id, created_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(alias) DO UPDATE SET medical_condition_id = excluded.medical_condition_id",
        params![alias, condition_id.to_string(), format_timestamp(&now())],
    )?;
    Ok(())
}

/// All (alias, condition id) pairs.
pub fn get_condition_aliases(conn: &Connection) -> Result<Vec<(String, Uuid)>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT alias, medical_condition_id FROM condition_aliases ORDER BY alias")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    let mut aliases = Vec::new();
    for row in rows {
        let (alias, id) = row?;
        aliases.push((alias, parse_uuid(&id)?));
    }
    Ok(aliases)
}

// ═══════════════════════════════════════════════════════════
// Contact types, specializations, hospitals
// ═══════════════════════════════════════════════════════════

pub fn insert_contact_type(conn: &Connection, contact_type: &ContactType) -> Result<(), DatabaseError> {
    let ts = format_timestamp(&now());
    conn.execute(
        "INSERT INTO contact_types (id, name, description, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            contact_type.id.to_string(),
            contact_type.name,
            contact_type.description,
            contact_type.is_active as i32,
            ts,
        ],
    )?;
    Ok(())
}

pub fn get_contact_types(conn: &Connection) -> Result<Vec<ContactType>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, is_active FROM contact_types ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, i32>(3)? != 0,
        ))
    })?;
    let mut items = Vec::new();
    for row in rows {
        let (id, name, description, is_active) = row?;
        items.push(ContactType { id: parse_uuid(&id)?, name, description, is_active });
    }
    Ok(items)
}

pub fn insert_specialization(
    conn: &Connection,
    specialization: &Specialization,
) -> Result<(), DatabaseError> {
    let ts = format_timestamp(&now());
    conn.execute(
        "INSERT INTO specializations (id, name, description, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            specialization.id.to_string(),
            specialization.name,
            specialization.description,
            specialization.is_active as i32,
            ts,
        ],
    )?;
    Ok(())
}

pub fn get_specializations(conn: &Connection) -> Result<Vec<Specialization>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, is_active FROM specializations ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, i32>(3)? != 0,
        ))
    })?;
    let mut items = Vec::new();
    for row in rows {
        let (id, name, description, is_active) = row?;
        items.push(Specialization { id: parse_uuid(&id)?, name, description, is_active });
    }
    Ok(items)
}

pub fn insert_hospital(conn: &Connection, hospital: &Hospital) -> Result<(), DatabaseError> {
    let ts = format_timestamp(&now());
    conn.execute(
        "INSERT INTO hospitals (id, name, city, country, address, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            hospital.id.to_string(),
            hospital.name,
            hospital.city,
            hospital.country,
            hospital.address,
            hospital.is_active as i32,
            ts,
        ],
    )?;
    Ok(())
}

pub fn get_hospitals(conn: &Connection) -> Result<Vec<Hospital>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, city, country, address, is_active FROM hospitals ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, i32>(5)? != 0,
        ))
    })?;
    let mut items = Vec::new();
    for row in rows {
        let (id, name, city, country, address, is_active) = row?;
        items.push(Hospital { id: parse_uuid(&id)?, name, city, country, address, is_active });
    }
    Ok(items)
}

/// Soft-activate or deactivate a row in one of the lookup tables.
pub fn set_lookup_active(
    conn: &Connection,
    table: LookupTable,
    id: &Uuid,
    is_active: bool,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        &format!("UPDATE {} SET is_active = ?1, updated_at = ?2 WHERE id = ?3", table.as_str()),
        params![is_active as i32, format_timestamp(&now()), id.to_string()],
    )?;
    Ok(updated > 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    ContactTypes,
    MedicalConditions,
    Specializations,
    Hospitals,
}

impl LookupTable {
    fn as_str(&self) -> &'static str {
        match self {
            Self::ContactTypes => "contact_types",
            Self::MedicalConditions => "medical_conditions",
            Self::Specializations => "specializations",
            Self::Hospitals => "hospitals",
        }
    }
}
