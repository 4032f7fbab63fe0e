use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_opt_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::enums::RoleType;
use crate::models::*;

const ROLE_COLUMNS: &str = "id, person_id, role_type, valid_from, valid_to, is_active";

type RoleRow = (String, String, String, String, Option<String>, bool);

fn read_role(row: &Row<'_>) -> rusqlite::Result<RoleRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get::<_, i32>(5)? != 0,
    ))
}

fn role_from_row(row: RoleRow) -> Result<RoleAssignment, DatabaseError> {
    let (id, person_id, role_type, valid_from, valid_to, is_active) = row;
    Ok(RoleAssignment {
        id: parse_uuid(&id)?,
        person_id: parse_uuid(&person_id)?,
        role_type: RoleType::from_str(&role_type)?,
        valid_from: parse_timestamp(&valid_from)?,
        valid_to: parse_opt_timestamp(valid_to)?,
        is_active,
    })
}

pub fn insert_role_assignment(conn: &Connection, role: &RoleAssignment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO role_assignments (id, person_id, role_type, valid_from, valid_to, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            role.id.to_string(),
            role.person_id.to_string(),
            role.role_type.as_str(),
            format_timestamp(&role.valid_from),
            role.valid_to.as_ref().map(format_timestamp),
            role.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_active_role(
    conn: &Connection,
    person_id: &Uuid,
    role_type: RoleType,
) -> Result<Option<RoleAssignment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {ROLE_COLUMNS} FROM role_assignments
                 WHERE person_id = ?1 AND role_type = ?2 AND is_active = 1"
            ),
            params![person_id.to_string(), role_type.as_str()],
            read_role,
        )
        .optional()?;
    row.map(role_from_row).transpose()
}

/// Close the active row for (person, role_type). Returns the number of rows
/// closed, which the partial unique index keeps at 0 or 1.
pub fn close_active_role(
    conn: &Connection,
    person_id: &Uuid,
    role_type: RoleType,
    valid_to: &NaiveDateTime,
) -> Result<usize, DatabaseError> {
    let closed = conn.execute(
        "UPDATE role_assignments SET is_active = 0, valid_to = ?1
         WHERE person_id = ?2 AND role_type = ?3 AND is_active = 1",
        params![
            format_timestamp(valid_to),
            person_id.to_string(),
            role_type.as_str()
        ],
    )?;
    Ok(closed)
}

pub fn get_active_roles(conn: &Connection, person_id: &Uuid) -> Result<Vec<RoleAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROLE_COLUMNS} FROM role_assignments
         WHERE person_id = ?1 AND is_active = 1
         ORDER BY role_type"
    ))?;
    let rows = stmt.query_map(params![person_id.to_string()], read_role)?;
    let mut roles = Vec::new();
    for row in rows {
        roles.push(role_from_row(row?)?);
    }
    Ok(roles)
}

/// Full temporal history, oldest first.
pub fn get_role_history(
    conn: &Connection,
    person_id: &Uuid,
    role_type: Option<RoleType>,
) -> Result<Vec<RoleAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROLE_COLUMNS} FROM role_assignments
         WHERE person_id = ?1 AND (?2 IS NULL OR role_type = ?2)
         ORDER BY valid_from, is_active"
    ))?;
    let rows = stmt.query_map(
        params![person_id.to_string(), role_type.map(|r| r.as_str())],
        read_role,
    )?;
    let mut roles = Vec::new();
    for row in rows {
        roles.push(role_from_row(row?)?);
    }
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{insert_person, now};
    use crate::db::sqlite::open_memory_database;

    fn seed_person(conn: &Connection) -> Uuid {
        let ts = now();
        let person = Person {
            id: Uuid::new_v4(),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            phone: None,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        insert_person(conn, &person).unwrap();
        person.id
    }

    fn active(person_id: Uuid, role_type: RoleType) -> RoleAssignment {
        RoleAssignment {
            id: Uuid::new_v4(),
            person_id,
            role_type,
            valid_from: now(),
            valid_to: None,
            is_active: true,
        }
    }

    #[test]
    fn second_active_row_hits_partial_unique_index() {
        let conn = open_memory_database().unwrap();
        let person_id = seed_person(&conn);
        insert_role_assignment(&conn, &active(person_id, RoleType::Lead)).unwrap();

        let err = insert_role_assignment(&conn, &active(person_id, RoleType::Lead)).unwrap_err();
        assert!(err.is_unique_violation());

        // A different role type is independent.
        insert_role_assignment(&conn, &active(person_id, RoleType::Patient)).unwrap();
        assert_eq!(get_active_roles(&conn, &person_id).unwrap().len(), 2);
    }

    #[test]
    fn closed_rows_do_not_count_against_the_index() {
        let conn = open_memory_database().unwrap();
        let person_id = seed_person(&conn);
        insert_role_assignment(&conn, &active(person_id, RoleType::Lead)).unwrap();
        let closed = close_active_role(&conn, &person_id, RoleType::Lead, &now()).unwrap();
        assert_eq!(closed, 1);

        insert_role_assignment(&conn, &active(person_id, RoleType::Lead)).unwrap();
        let history = get_role_history(&conn, &person_id, Some(RoleType::Lead)).unwrap();
        assert_eq!(history.len(), 2);
        assert!(!history[0].is_active);
        assert!(history[0].valid_to.is_some());
        assert!(history[1].is_active);
    }

    #[test]
    fn active_row_with_valid_to_is_rejected_by_check() {
        let conn = open_memory_database().unwrap();
        let person_id = seed_person(&conn);
        let mut role = active(person_id, RoleType::Physician);
        role.valid_to = Some(now());
        let err = insert_role_assignment(&conn, &role).unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn close_without_active_row_is_noop() {
        let conn = open_memory_database().unwrap();
        let person_id = seed_person(&conn);
        let closed = close_active_role(&conn, &person_id, RoleType::Physician, &now()).unwrap();
        assert_eq!(closed, 0);
        assert!(get_active_role(&conn, &person_id, RoleType::Physician).unwrap().is_none());
    }
}
