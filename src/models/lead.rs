use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::LeadStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub person_id: Uuid,
    pub medical_condition_id: Uuid,
    pub contact_type_id: Option<Uuid>,
    pub status: LeadStatus,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
    pub converted_to_patient_id: Option<Uuid>,
    pub converted_at: Option<NaiveDateTime>,
    pub lost_reason: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An incoming expression of interest, before identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadIntake {
    #[serde(flatten)]
    pub contact: super::person::ContactDetails,
    pub medical_condition_id: Uuid,
    pub contact_type_id: Option<Uuid>,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
}
