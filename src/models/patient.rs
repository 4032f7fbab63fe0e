use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::PatientStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub person_id: Uuid,
    pub medical_condition_id: Uuid,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
    pub status: PatientStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Partial update of a Patient. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub medical_condition_id: Option<Uuid>,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
    pub status: Option<PatientStatus>,
}

/// Direct registration of a Patient, bypassing the lead funnel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    #[serde(flatten)]
    pub contact: super::person::ContactDetails,
    pub medical_condition_id: Uuid,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: PatientStatus,
}

/// Patient registration for a Person who is already on file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatientForPerson {
    pub person_id: Uuid,
    pub medical_condition_id: Uuid,
    pub first_contact_date: Option<NaiveDate>,
    pub initial_consult_date: Option<NaiveDate>,
    #[serde(default = "default_status")]
    pub status: PatientStatus,
}

fn default_status() -> PatientStatus {
    PatientStatus::Active
}
