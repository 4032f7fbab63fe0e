use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::RelationshipType;

/// Patient ↔ physician edge. Open while `end_date` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientPhysicianRelationship {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub relationship_type: RelationshipType,
    pub is_primary: bool,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
