use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Physician {
    pub id: Uuid,
    pub person_id: Uuid,
    pub hospital_id: Option<Uuid>,
    pub specialization_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub medical_license_number: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicianRegistration {
    #[serde(flatten)]
    pub contact: super::person::ContactDetails,
    pub hospital_id: Option<Uuid>,
    pub specialization_id: Option<Uuid>,
    pub job_title: Option<String>,
    pub medical_license_number: Option<String>,
}
