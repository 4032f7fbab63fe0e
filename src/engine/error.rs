//! Engine error taxonomy.
//!
//! Every variant except `Database` is an expected outcome the caller can act
//! on. None of them leaves partial writes behind: the failing operation's
//! transaction is rolled back before the error is returned.

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::RoleType;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Person {person_id} already holds an active {role_type} role")]
    DuplicateActiveRole { person_id: Uuid, role_type: RoleType },

    #[error("Patient {patient_id} already has a primary physician")]
    DuplicatePrimaryPhysician { patient_id: Uuid },

    #[error("Person {person_id} already has a patient record")]
    DuplicatePatientForPerson { person_id: Uuid },

    #[error("Person {person_id} is already registered as a physician")]
    DuplicatePhysicianForPerson { person_id: Uuid },

    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Identity conflict for {email}: {reason}")]
    IdentityConflict { email: String, reason: String },

    #[error("{entity} {id} still has dependent records")]
    HasDependents { entity: &'static str, id: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    InvalidTransition,
    NotFound,
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::DuplicateActiveRole { .. }
            | Self::DuplicatePrimaryPhysician { .. }
            | Self::DuplicatePatientForPerson { .. }
            | Self::DuplicatePhysicianForPerson { .. }
            | Self::IdentityConflict { .. }
            | Self::HasDependents { .. } => ErrorKind::Conflict,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::NotFound { .. } | Self::Database(DatabaseError::NotFound { .. }) => {
                ErrorKind::NotFound
            }
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: &Uuid) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation { field, reason: reason.into() }
    }

    pub(crate) fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// Maps a foreign-key or CHECK rejection on a write to a validation error
/// naming the offending input. Anything else passes through untouched.
pub(crate) fn integrity_as_validation(
    err: DatabaseError,
    field: &'static str,
    reason: &str,
) -> EngineError {
    if err.is_integrity_violation() {
        EngineError::validation(field, reason)
    } else {
        EngineError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_taxonomy() {
        let id = Uuid::new_v4();
        assert_eq!(EngineError::validation("email", "empty").kind(), ErrorKind::Validation);
        assert_eq!(
            EngineError::DuplicateActiveRole { person_id: id, role_type: RoleType::Lead }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::transition("Lead", "converted", "converted").kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(EngineError::not_found("Patient", &id).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::Database(DatabaseError::ConstraintViolation("x".into())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn repository_not_found_is_not_found() {
        let err = EngineError::from(DatabaseError::NotFound {
            entity_type: "Lead".into(),
            id: "abc".into(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn message_names_the_role() {
        let err = EngineError::DuplicateActiveRole {
            person_id: Uuid::nil(),
            role_type: RoleType::Physician,
        };
        assert!(err.to_string().contains("physician"));
    }
}
