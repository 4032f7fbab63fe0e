//! Role ledger: the temporal record of which roles a Person holds.
//!
//! At most one active row per (person, role type). Superseding a role closes
//! the old row at the instant the new one opens, so the history has no gaps
//! and no overlaps.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use super::error::EngineError;
use super::identity;
use crate::db::repository::{self, now};
use crate::db::with_transaction;
use crate::models::enums::RoleType;
use crate::models::RoleAssignment;

/// Open a new active `role_type` row for the person, closing any current one
/// at `effective_from`.
pub fn assign_role(
    conn: &Connection,
    person_id: &Uuid,
    role_type: RoleType,
    effective_from: NaiveDateTime,
) -> Result<RoleAssignment, EngineError> {
    with_transaction(conn, |conn| {
        identity::get_person(conn, person_id)?;

        if let Some(current) = repository::get_active_role(conn, person_id, role_type)? {
            if effective_from < current.valid_from {
                return Err(EngineError::validation(
                    "effective_from",
                    format!("precedes the current {role_type} role, active since {}", current.valid_from),
                ));
            }
            repository::close_active_role(conn, person_id, role_type, &effective_from)?;
        }

        let role = RoleAssignment {
            id: Uuid::new_v4(),
            person_id: *person_id,
            role_type,
            valid_from: effective_from,
            valid_to: None,
            is_active: true,
        };
        repository::insert_role_assignment(conn, &role).map_err(|e| {
            if e.is_unique_violation() {
                EngineError::DuplicateActiveRole { person_id: *person_id, role_type }
            } else {
                e.into()
            }
        })?;

        tracing::info!(person_id = %person_id, role = %role_type, "Role assigned");
        Ok(role)
    })
}

/// The active `role_type` row, opening one now if the person has none.
pub fn ensure_role(
    conn: &Connection,
    person_id: &Uuid,
    role_type: RoleType,
) -> Result<RoleAssignment, EngineError> {
    with_transaction(conn, |conn| {
        match repository::get_active_role(conn, person_id, role_type)? {
            Some(active) => Ok(active),
            None => assign_role(conn, person_id, role_type, now()),
        }
    })
}

/// Close the active `role_type` row at `effective_to`. Returns false when there
/// was nothing to close.
pub fn end_role(
    conn: &Connection,
    person_id: &Uuid,
    role_type: RoleType,
    effective_to: NaiveDateTime,
) -> Result<bool, EngineError> {
    with_transaction(conn, |conn| {
        let Some(current) = repository::get_active_role(conn, person_id, role_type)? else {
            return Ok(false);
        };
        if effective_to < current.valid_from {
            return Err(EngineError::validation(
                "effective_to",
                format!("precedes the start of the {role_type} role"),
            ));
        }
        repository::close_active_role(conn, person_id, role_type, &effective_to)?;
        tracing::info!(person_id = %person_id, role = %role_type, "Role ended");
        Ok(true)
    })
}

pub fn active_roles(conn: &Connection, person_id: &Uuid) -> Result<Vec<RoleAssignment>, EngineError> {
    identity::get_person(conn, person_id)?;
    Ok(repository::get_active_roles(conn, person_id)?)
}

pub fn role_history(
    conn: &Connection,
    person_id: &Uuid,
    role_type: Option<RoleType>,
) -> Result<Vec<RoleAssignment>, EngineError> {
    identity::get_person(conn, person_id)?;
    Ok(repository::get_role_history(conn, person_id, role_type)?)
}
