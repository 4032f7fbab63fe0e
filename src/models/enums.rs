use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(RoleType {
    Lead => "lead",
    Patient => "patient",
    Physician => "physician",
});

str_enum!(LeadStatus {
    New => "new",
    Contacted => "contacted",
    Converted => "converted",
    Lost => "lost",
});

str_enum!(PatientStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(RelationshipType {
    Treating => "treating",
    Referring => "referring",
    Consulting => "consulting",
});

str_enum!(JourneyVariant {
    ClinicalTrial => "clinical_trial",
    AccessProgram => "access_program",
});

str_enum!(TrialJourneyStatus {
    Referred => "referred",
    Screening => "screening",
    Enrolled => "enrolled",
    Completed => "completed",
    Withdrawn => "withdrawn",
});

str_enum!(AccessProgramStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Rejected => "rejected",
});

impl LeadStatus {
    /// Open leads can still be worked; converted and lost are terminal.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::New | Self::Contacted)
    }

    pub fn can_transition_to(&self, next: LeadStatus) -> bool {
        self.is_open()
            && match next {
                Self::Contacted => *self == Self::New,
                Self::Converted | Self::Lost => true,
                Self::New => false,
            }
    }
}

impl JourneyVariant {
    /// Backing table for this journey variant.
    pub fn table(&self) -> &'static str {
        match self {
            Self::ClinicalTrial => "clinical_trial_journeys",
            Self::AccessProgram => "access_program_journeys",
        }
    }
}

impl TrialJourneyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Withdrawn)
    }

    /// referred → screening → enrolled → completed, or withdrawn before completion.
    pub fn can_transition_to(&self, next: TrialJourneyStatus) -> bool {
        use TrialJourneyStatus::*;
        match (self, next) {
            (Referred, Screening) | (Screening, Enrolled) | (Enrolled, Completed) => true,
            (from, Withdrawn) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl AccessProgramStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// pending → active → completed, or rejected before completion.
    pub fn can_transition_to(&self, next: AccessProgramStatus) -> bool {
        use AccessProgramStatus::*;
        match (self, next) {
            (Pending, Active) | (Active, Completed) => true,
            (from, Rejected) => !from.is_terminal(),
            _ => false,
        }
    }
}
