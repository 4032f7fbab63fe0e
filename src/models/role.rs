use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RoleType;

/// One temporally-scoped holding of a role by a Person.
/// `valid_to` is `None` exactly while `is_active` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: Uuid,
    pub person_id: Uuid,
    pub role_type: RoleType,
    pub valid_from: NaiveDateTime,
    pub valid_to: Option<NaiveDateTime>,
    pub is_active: bool,
}
