use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_opt_timestamp, parse_opt_uuid, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const INTERACTION_COLUMNS: &str = "id, patient_id, navigator_person_id, booking_date, call_date,
    reminder_date, no_show, call_duration_minutes, outcome, notes, created_at, corrected_at";

/// Most recent call first; rows that never had a call sort last.
const INTERACTION_ORDER: &str = "call_date DESC NULLS LAST, created_at DESC, id";

struct InteractionRow {
    id: String,
    patient_id: String,
    navigator_person_id: Option<String>,
    booking_date: Option<String>,
    call_date: Option<String>,
    reminder_date: Option<String>,
    no_show: bool,
    call_duration_minutes: Option<i32>,
    outcome: Option<String>,
    notes: Option<String>,
    created_at: String,
    corrected_at: Option<String>,
}

impl InteractionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            navigator_person_id: row.get(2)?,
            booking_date: row.get(3)?,
            call_date: row.get(4)?,
            reminder_date: row.get(5)?,
            no_show: row.get::<_, i32>(6)? != 0,
            call_duration_minutes: row.get(7)?,
            outcome: row.get(8)?,
            notes: row.get(9)?,
            created_at: row.get(10)?,
            corrected_at: row.get(11)?,
        })
    }

    fn into_interaction(self) -> Result<Interaction, DatabaseError> {
        Ok(Interaction {
            id: parse_uuid(&self.id)?,
            patient_id: parse_uuid(&self.patient_id)?,
            navigator_person_id: parse_opt_uuid(self.navigator_person_id)?,
            booking_date: parse_opt_timestamp(self.booking_date)?,
            call_date: parse_opt_timestamp(self.call_date)?,
            reminder_date: parse_opt_timestamp(self.reminder_date)?,
            no_show: self.no_show,
            call_duration_minutes: self.call_duration_minutes,
            outcome: self.outcome,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
            corrected_at: parse_opt_timestamp(self.corrected_at)?,
        })
    }
}

pub fn insert_interaction(conn: &Connection, interaction: &Interaction) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO call_history (id, patient_id, navigator_person_id, booking_date, call_date,
         reminder_date, no_show, call_duration_minutes, outcome, notes, created_at, corrected_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            interaction.id.to_string(),
            interaction.patient_id.to_string(),
            interaction.navigator_person_id.map(|id| id.to_string()),
            interaction.booking_date.as_ref().map(format_timestamp),
            interaction.call_date.as_ref().map(format_timestamp),
            interaction.reminder_date.as_ref().map(format_timestamp),
            interaction.no_show as i32,
            interaction.call_duration_minutes,
            interaction.outcome,
            interaction.notes,
            format_timestamp(&interaction.created_at),
            interaction.corrected_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(())
}

pub fn get_interaction(conn: &Connection, id: &Uuid) -> Result<Option<Interaction>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {INTERACTION_COLUMNS} FROM call_history WHERE id = ?1"),
            params![id.to_string()],
            InteractionRow::read,
        )
        .optional()?;
    row.map(InteractionRow::into_interaction).transpose()
}

pub fn list_interactions_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
    page: PageRequest,
) -> Result<Page<Interaction>, DatabaseError> {
    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM call_history WHERE patient_id = ?1",
        params![patient_id.to_string()],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {INTERACTION_COLUMNS} FROM call_history
         WHERE patient_id = ?1
         ORDER BY {INTERACTION_ORDER}
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(
        params![patient_id.to_string(), page.limit(), page.offset()],
        InteractionRow::read,
    )?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?.into_interaction()?);
    }
    Ok(Page::new(items, total, page))
}

pub fn get_latest_interaction(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Option<Interaction>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {INTERACTION_COLUMNS} FROM call_history
                 WHERE patient_id = ?1
                 ORDER BY {INTERACTION_ORDER}
                 LIMIT 1"
            ),
            params![patient_id.to_string()],
            InteractionRow::read,
        )
        .optional()?;
    row.map(InteractionRow::into_interaction).transpose()
}

/// Overwrite one row's own fields. The patient link and `created_at` never change.
pub fn update_interaction(conn: &Connection, interaction: &Interaction) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE call_history
         SET navigator_person_id = ?1, booking_date = ?2, call_date = ?3, reminder_date = ?4,
             no_show = ?5, call_duration_minutes = ?6, outcome = ?7, notes = ?8, corrected_at = ?9
         WHERE id = ?10",
        params![
            interaction.navigator_person_id.map(|id| id.to_string()),
            interaction.booking_date.as_ref().map(format_timestamp),
            interaction.call_date.as_ref().map(format_timestamp),
            interaction.reminder_date.as_ref().map(format_timestamp),
            interaction.no_show as i32,
            interaction.call_duration_minutes,
            interaction.outcome,
            interaction.notes,
            interaction.corrected_at.as_ref().map(format_timestamp),
            interaction.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Interaction".into(),
            id: interaction.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_interaction_row(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM call_history WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_medical_condition, insert_patient, insert_person, now};
    use crate::db::sqlite::open_memory_database;
    use crate::models::enums::PatientStatus;
    use chrono::{NaiveDate, NaiveDateTime};

    fn patient(conn: &Connection) -> Uuid {
        let ts = now();
        let person = Person {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: None,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        insert_person(conn, &person).unwrap();
        let condition = MedicalCondition {
            id: Uuid::new_v4(),
            name: "Glioblastoma".into(),
            abbreviation: None,
            description: None,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        insert_medical_condition(conn, &condition).unwrap();
        let patient = Patient {
            id: Uuid::new_v4(),
            person_id: person.id,
            medical_condition_id: condition.id,
            first_contact_date: None,
            initial_consult_date: None,
            status: PatientStatus::Active,
            created_at: ts,
            updated_at: ts,
        };
        insert_patient(conn, &patient).unwrap();
        patient.id
    }

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn call(patient_id: Uuid, call_date: Option<NaiveDateTime>) -> Interaction {
        Interaction {
            id: Uuid::new_v4(),
            patient_id,
            navigator_person_id: None,
            booking_date: None,
            call_date,
            reminder_date: None,
            no_show: false,
            call_duration_minutes: Some(15),
            outcome: None,
            notes: None,
            created_at: now(),
            corrected_at: None,
        }
    }

    #[test]
    fn list_orders_by_call_date_desc_nulls_last() {
        let conn = open_memory_database().unwrap();
        let pat = patient(&conn);
        insert_interaction(&conn, &call(pat, None)).unwrap();
        insert_interaction(&conn, &call(pat, Some(day(1)))).unwrap();
        insert_interaction(&conn, &call(pat, Some(day(3)))).unwrap();
        insert_interaction(&conn, &call(pat, Some(day(2)))).unwrap();

        let page = list_interactions_for_patient(&conn, &pat, PageRequest::default()).unwrap();
        assert_eq!(page.total, 4);
        let dates: Vec<_> = page.items.iter().map(|i| i.call_date).collect();
        assert_eq!(dates, vec![Some(day(3)), Some(day(2)), Some(day(1)), None]);

        let latest = get_latest_interaction(&conn, &pat).unwrap().unwrap();
        assert_eq!(latest.call_date, Some(day(3)));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let conn = open_memory_database().unwrap();
        let mut c = call(patient(&conn), None);
        c.call_duration_minutes = Some(-5);
        assert!(insert_interaction(&conn, &c).unwrap_err().is_integrity_violation());
    }

    #[test]
    fn update_and_delete_touch_one_row() {
        let conn = open_memory_database().unwrap();
        let pat = patient(&conn);
        let mut a = call(pat, Some(day(1)));
        let b = call(pat, Some(day(2)));
        insert_interaction(&conn, &a).unwrap();
        insert_interaction(&conn, &b).unwrap();

        a.outcome = Some("voicemail".into());
        a.corrected_at = Some(now());
        update_interaction(&conn, &a).unwrap();
        assert_eq!(get_interaction(&conn, &a.id).unwrap(), Some(a.clone()));
        assert_eq!(get_interaction(&conn, &b.id).unwrap(), Some(b.clone()));

        assert!(delete_interaction_row(&conn, &a.id).unwrap());
        assert!(!delete_interaction_row(&conn, &a.id).unwrap());
        assert!(get_interaction(&conn, &b.id).unwrap().is_some());
    }
}
