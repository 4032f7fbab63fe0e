use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AccessProgramStatus, JourneyVariant, TrialJourneyStatus};
use crate::db::DatabaseError;

/// Status of a journey, carrying the variant's own lifecycle.
///
/// Serialized as the bare status string; the variant travels alongside it on
/// [`Journey`]. Parsing always goes through [`JourneyStatus::parse`] because
/// "completed" is a legal value in both lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JourneyStatus {
    ClinicalTrial(TrialJourneyStatus),
    AccessProgram(AccessProgramStatus),
}

impl JourneyStatus {
    pub fn initial(variant: JourneyVariant) -> Self {
        match variant {
            JourneyVariant::ClinicalTrial => Self::ClinicalTrial(TrialJourneyStatus::Referred),
            JourneyVariant::AccessProgram => Self::AccessProgram(AccessProgramStatus::Pending),
        }
    }

    pub fn parse(variant: JourneyVariant, s: &str) -> Result<Self, DatabaseError> {
        Ok(match variant {
            JourneyVariant::ClinicalTrial => Self::ClinicalTrial(TrialJourneyStatus::from_str(s)?),
            JourneyVariant::AccessProgram => Self::AccessProgram(AccessProgramStatus::from_str(s)?),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClinicalTrial(s) => s.as_str(),
            Self::AccessProgram(s) => s.as_str(),
        }
    }

    /// Transitions are only ever legal within one variant's lifecycle.
    pub fn can_transition_to(&self, next: JourneyStatus) -> bool {
        match (self, next) {
            (Self::ClinicalTrial(from), Self::ClinicalTrial(to)) => from.can_transition_to(to),
            (Self::AccessProgram(from), Self::AccessProgram(to)) => from.can_transition_to(to),
            _ => false,
        }
    }

    /// The milestone column a transition into this status stamps, if any.
    pub fn milestone(&self) -> Option<Milestone> {
        match self {
            Self::ClinicalTrial(TrialJourneyStatus::Enrolled)
            | Self::AccessProgram(AccessProgramStatus::Active) => Some(Milestone::Enrollment),
            Self::ClinicalTrial(TrialJourneyStatus::Completed)
            | Self::AccessProgram(AccessProgramStatus::Completed) => Some(Milestone::Completion),
            _ => None,
        }
    }
}

impl std::fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Enrollment,
    Completion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Journey {
    pub id: Uuid,
    pub variant: JourneyVariant,
    pub patient_id: Uuid,
    pub physician_id: Option<Uuid>,
    /// External trial or program identifier.
    pub program_id: String,
    pub status: JourneyStatus,
    pub referral_date: Option<NaiveDate>,
    pub enrollment_date: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJourney {
    pub variant: JourneyVariant,
    pub program_id: String,
    pub physician_id: Option<Uuid>,
    pub referral_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
