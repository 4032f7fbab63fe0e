use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{
    format_date, format_timestamp, parse_opt_date, parse_opt_timestamp, parse_opt_uuid,
    parse_timestamp, parse_uuid,
};
use crate::db::DatabaseError;
use crate::models::enums::LeadStatus;
use crate::models::*;

const LEAD_COLUMNS: &str = "id, person_id, medical_condition_id, contact_type_id, status,
    first_contact_date, initial_consult_date, converted_to_patient_id, converted_at,
    lost_reason, created_at, updated_at";

struct LeadRow {
    id: String,
    person_id: String,
    medical_condition_id: String,
    contact_type_id: Option<String>,
    status: String,
    first_contact_date: Option<String>,
    initial_consult_date: Option<String>,
    converted_to_patient_id: Option<String>,
    converted_at: Option<String>,
    lost_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

impl LeadRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            person_id: row.get(1)?,
            medical_condition_id: row.get(2)?,
            contact_type_id: row.get(3)?,
            status: row.get(4)?,
            first_contact_date: row.get(5)?,
            initial_consult_date: row.get(6)?,
            converted_to_patient_id: row.get(7)?,
            converted_at: row.get(8)?,
            lost_reason: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_lead(self) -> Result<Lead, DatabaseError> {
        Ok(Lead {
            id: parse_uuid(&self.id)?,
            person_id: parse_uuid(&self.person_id)?,
            medical_condition_id: parse_uuid(&self.medical_condition_id)?,
            contact_type_id: parse_opt_uuid(self.contact_type_id)?,
            status: LeadStatus::from_str(&self.status)?,
            first_contact_date: parse_opt_date(self.first_contact_date)?,
            initial_consult_date: parse_opt_date(self.initial_consult_date)?,
            converted_to_patient_id: parse_opt_uuid(self.converted_to_patient_id)?,
            converted_at: parse_opt_timestamp(self.converted_at)?,
            lost_reason: self.lost_reason,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_lead(conn: &Connection, lead: &Lead) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO leads (id, person_id, medical_condition_id, contact_type_id, status,
         first_contact_date, initial_consult_date, converted_to_patient_id, converted_at,
         lost_reason, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            lead.id.to_string(),
            lead.person_id.to_string(),
            lead.medical_condition_id.to_string(),
            lead.contact_type_id.map(|id| id.to_string()),
            lead.status.as_str(),
            lead.first_contact_date.as_ref().map(format_date),
            lead.initial_consult_date.as_ref().map(format_date),
            lead.converted_to_patient_id.map(|id| id.to_string()),
            lead.converted_at.as_ref().map(format_timestamp),
            lead.lost_reason,
            format_timestamp(&lead.created_at),
            format_timestamp(&lead.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_lead(conn: &Connection, id: &Uuid) -> Result<Option<Lead>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            params![id.to_string()],
            LeadRow::read,
        )
        .optional()?;
    row.map(LeadRow::into_lead).transpose()
}

/// The open (new or contacted) lead for a person and condition, if any.
pub fn get_open_lead(
    conn: &Connection,
    person_id: &Uuid,
    medical_condition_id: &Uuid,
) -> Result<Option<Lead>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {LEAD_COLUMNS} FROM leads
                 WHERE person_id = ?1 AND medical_condition_id = ?2
                   AND status IN ('new', 'contacted')"
            ),
            params![person_id.to_string(), medical_condition_id.to_string()],
            LeadRow::read,
        )
        .optional()?;
    row.map(LeadRow::into_lead).transpose()
}

pub fn count_open_leads_for_person(conn: &Connection, person_id: &Uuid) -> Result<i64, DatabaseError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM leads WHERE person_id = ?1 AND status IN ('new', 'contacted')",
        params![person_id.to_string()],
        |row| row.get(0),
    )?)
}

pub fn list_leads(
    conn: &Connection,
    filter: &LeadFilter,
    page: PageRequest,
) -> Result<Page<Lead>, DatabaseError> {
    let status = filter.status.map(|s| s.as_str());
    let condition = filter.medical_condition_id.map(|id| id.to_string());
    let person = filter.person_id.map(|id| id.to_string());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM leads
         WHERE (?1 IS NULL OR status = ?1)
           AND (?2 IS NULL OR medical_condition_id = ?2)
           AND (?3 IS NULL OR person_id = ?3)",
        params![status, condition, person],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads
         WHERE (?1 IS NULL OR status = ?1)
           AND (?2 IS NULL OR medical_condition_id = ?2)
           AND (?3 IS NULL OR person_id = ?3)
         ORDER BY created_at DESC, id
         LIMIT ?4 OFFSET ?5"
    ))?;
    let rows = stmt.query_map(
        params![status, condition, person, page.limit(), page.offset()],
        LeadRow::read,
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?.into_lead()?);
    }
    Ok(Page::new(items, total, page))
}

/// Write status, conversion link, dates and lost reason back to the row.
pub fn update_lead(conn: &Connection, lead: &Lead) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE leads
         SET status = ?1, contact_type_id = ?2, first_contact_date = ?3,
             initial_consult_date = ?4, converted_to_patient_id = ?5, converted_at = ?6,
             lost_reason = ?7, updated_at = ?8
         WHERE id = ?9",
        params![
            lead.status.as_str(),
            lead.contact_type_id.map(|id| id.to_string()),
            lead.first_contact_date.as_ref().map(format_date),
            lead.initial_consult_date.as_ref().map(format_date),
            lead.converted_to_patient_id.map(|id| id.to_string()),
            lead.converted_at.as_ref().map(format_timestamp),
            lead.lost_reason,
            format_timestamp(&lead.updated_at),
            lead.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Lead".into(),
            id: lead.id.to_string(),
        });
    }
    Ok(())
}
