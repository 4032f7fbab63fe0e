use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::datetime::deserialize_optional;

/// One call or contact event. Every call is its own row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub navigator_person_id: Option<Uuid>,
    pub booking_date: Option<NaiveDateTime>,
    pub call_date: Option<NaiveDateTime>,
    pub reminder_date: Option<NaiveDateTime>,
    pub no_show: bool,
    pub call_duration_minutes: Option<i32>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub corrected_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInteraction {
    pub patient_id: Uuid,
    pub navigator_person_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub booking_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub call_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub reminder_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub no_show: bool,
    pub call_duration_minutes: Option<i32>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
}

/// Fixes to a single row's own data. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionCorrection {
    pub navigator_person_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub booking_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub call_date: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub reminder_date: Option<NaiveDateTime>,
    pub no_show: Option<bool>,
    pub call_duration_minutes: Option<i32>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
}
