use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const PERSON_COLUMNS: &str =
    "id, first_name, last_name, email, phone, is_active, created_at, updated_at";

struct PersonRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl PersonRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            is_active: row.get::<_, i32>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_person(self) -> Result<Person, DatabaseError> {
        Ok(Person {
            id: parse_uuid(&self.id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            is_active: self.is_active,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_person(conn: &Connection, person: &Person) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO persons (id, first_name, last_name, email, phone, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            person.id.to_string(),
            person.first_name,
            person.last_name,
            person.email,
            person.phone,
            person.is_active as i32,
            format_timestamp(&person.created_at),
            format_timestamp(&person.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_person(conn: &Connection, id: &Uuid) -> Result<Option<Person>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE id = ?1"),
            params![id.to_string()],
            PersonRow::read,
        )
        .optional()?;
    row.map(PersonRow::into_person).transpose()
}

/// Exact, case-sensitive email match.
pub fn get_person_by_email(conn: &Connection, email: &str) -> Result<Option<Person>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE email = ?1"),
            params![email],
            PersonRow::read,
        )
        .optional()?;
    row.map(PersonRow::into_person).transpose()
}

pub fn list_persons(
    conn: &Connection,
    filter: &PersonFilter,
    page: PageRequest,
) -> Result<Page<Person>, DatabaseError> {
    let is_active = filter.is_active.map(|b| b as i32);

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM persons WHERE (?1 IS NULL OR is_active = ?1)",
        params![is_active],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {PERSON_COLUMNS} FROM persons
         WHERE (?1 IS NULL OR is_active = ?1)
         ORDER BY last_name, first_name, id
         LIMIT ?2 OFFSET ?3"
    ))?;
    let rows = stmt.query_map(params![is_active, page.limit(), page.offset()], PersonRow::read)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?.into_person()?);
    }
    Ok(Page::new(items, total, page))
}

/// Write every mutable column of `person` back to its row.
pub fn update_person(conn: &Connection, person: &Person) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE persons
         SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, is_active = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            person.first_name,
            person.last_name,
            person.email,
            person.phone,
            person.is_active as i32,
            format_timestamp(&person.updated_at),
            person.id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Person".into(),
            id: person.id.to_string(),
        });
    }
    Ok(())
}

/// Physical delete. Role assignments go with it (ON DELETE CASCADE).
pub fn delete_person_row(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute("DELETE FROM persons WHERE id = ?1", params![id.to_string()])?;
    Ok(deleted > 0)
}

/// Rows elsewhere that hang off a Person and must never be cascaded away.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersonDependents {
    pub patients: i64,
    pub physicians: i64,
    pub leads: i64,
    pub navigated_interactions: i64,
}

impl PersonDependents {
    pub fn is_empty(&self) -> bool {
        self.patients == 0 && self.physicians == 0 && self.leads == 0 && self.navigated_interactions == 0
    }
}

pub fn count_person_dependents(
    conn: &Connection,
    person_id: &Uuid,
) -> Result<PersonDependents, DatabaseError> {
    let id = person_id.to_string();
    let count = |sql: &str| -> Result<i64, DatabaseError> {
        Ok(conn.query_row(sql, params![id], |row| row.get(0))?)
    };
    Ok(PersonDependents {
        patients: count("SELECT COUNT(*) FROM patients WHERE person_id = ?1")?,
        physicians: count("SELECT COUNT(*) FROM physicians WHERE person_id = ?1")?,
        leads: count("SELECT COUNT(*) FROM leads WHERE person_id = ?1")?,
        navigated_interactions: count(
            "SELECT COUNT(*) FROM call_history WHERE navigator_person_id = ?1",
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::now;
    use crate::db::sqlite::open_memory_database;

    fn person(email: &str, last_name: &str) -> Person {
        let ts = now();
        Person {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn insert_and_fetch_by_id_and_email() {
        let conn = open_memory_database().unwrap();
        let p = person("ada@example.com", "Lovelace");
        insert_person(&conn, &p).unwrap();

        assert_eq!(get_person(&conn, &p.id).unwrap(), Some(p.clone()));
        assert_eq!(get_person_by_email(&conn, "ada@example.com").unwrap(), Some(p));
    }

    #[test]
    fn email_lookup_is_case_sensitive() {
        let conn = open_memory_database().unwrap();
        insert_person(&conn, &person("ada@example.com", "Lovelace")).unwrap();
        assert!(get_person_by_email(&conn, "ADA@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_violates_unique() {
        let conn = open_memory_database().unwrap();
        insert_person(&conn, &person("ada@example.com", "Lovelace")).unwrap();
        let err = insert_person(&conn, &person("ada@example.com", "Byron")).unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn list_filters_and_paginates() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            let mut p = person(&format!("p{i}@example.com"), &format!("Name{i}"));
            p.is_active = i % 2 == 0;
            insert_person(&conn, &p).unwrap();
        }

        let active = list_persons(
            &conn,
            &PersonFilter { is_active: Some(true) },
            PageRequest::default(),
        )
        .unwrap();
        assert_eq!(active.total, 3);

        let second_page = list_persons(
            &conn,
            &PersonFilter::default(),
            PageRequest::new(Some(2), Some(2)),
        )
        .unwrap();
        assert_eq!(second_page.total, 5);
        assert_eq!(second_page.items.len(), 2);
        assert_eq!(second_page.items[0].last_name, "Name2");
        assert_eq!(second_page.total_pages, 3);
    }

    #[test]
    fn update_missing_person_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = update_person(&conn, &person("ghost@example.com", "Ghost")).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn fresh_person_has_no_dependents() {
        let conn = open_memory_database().unwrap();
        let p = person("ada@example.com", "Lovelace");
        insert_person(&conn, &p).unwrap();
        assert!(count_person_dependents(&conn, &p.id).unwrap().is_empty());
    }
}
