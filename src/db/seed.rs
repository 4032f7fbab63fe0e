//! Reference-data bootstrap.
//!
//! Runs once at first boot (or on every boot; each insert is keyed on the
//! table's unique name, so re-running is a no-op). The engine itself never
//! calls this.

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::repository::{format_timestamp, now};
use super::DatabaseError;

const CONTACT_TYPES: &[(&str, &str)] = &[
    ("phone", "Inbound or outbound phone call"),
    ("email", "Email enquiry"),
    ("web_form", "Website contact form"),
    ("referral", "Referred by a physician or another patient"),
    ("event", "Met at a patient event or conference"),
];

const MEDICAL_CONDITIONS: &[(&str, &str, &str)] = &[
    (
        "Duchenne Muscular Dystrophy",
        "DMD",
        "A genetic disorder characterized by progressive muscle degeneration",
    ),
    ("Glioblastoma", "GBM", "An aggressive type of brain cancer"),
    (
        "Idiopathic Pulmonary Fibrosis",
        "IPF",
        "A chronic lung disease characterized by progressive scarring",
    ),
];

const SPECIALIZATIONS: &[&str] = &["Neurology", "Neuro-oncology", "Pulmonology", "Oncology"];

/// Counts of rows actually inserted by one seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub contact_types: usize,
    pub medical_conditions: usize,
    pub specializations: usize,
}

impl SeedReport {
    pub fn total(&self) -> usize {
        self.contact_types + self.medical_conditions + self.specializations
    }
}

pub fn seed_reference_data(conn: &Connection) -> Result<SeedReport, DatabaseError> {
    let ts = format_timestamp(&now());
    let mut report = SeedReport::default();

    for (name, description) in CONTACT_TYPES {
        report.contact_types += conn.execute(
            "INSERT OR IGNORE INTO contact_types (id, name, description, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![Uuid::new_v4().to_string(), name, description, ts],
        )?;
    }

    for (name, abbreviation, description) in MEDICAL_CONDITIONS {
        report.medical_conditions += conn.execute(
            "INSERT OR IGNORE INTO medical_conditions
             (id, name, abbreviation, description, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
            params![Uuid::new_v4().to_string(), name, abbreviation, description, ts],
        )?;
    }

    for name in SPECIALIZATIONS {
        report.specializations += conn.execute(
            "INSERT OR IGNORE INTO specializations (id, name, is_active, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?3)",
            params![Uuid::new_v4().to_string(), name, ts],
        )?;
    }

    if report.total() > 0 {
        tracing::info!(
            contact_types = report.contact_types,
            medical_conditions = report.medical_conditions,
            specializations = report.specializations,
            "Seeded reference data"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::{get_all_medical_conditions, get_contact_types, get_specializations};
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn seeds_three_conditions_and_contact_types() {
        let conn = open_memory_database().unwrap();
        let report = seed_reference_data(&conn).unwrap();
        assert_eq!(report.medical_conditions, 3);
        assert_eq!(report.contact_types, CONTACT_TYPES.len());

        let abbreviations: Vec<_> = get_all_medical_conditions(&conn)
            .unwrap()
            .into_iter()
            .filter_map(|c| c.abbreviation)
            .collect();
        assert_eq!(abbreviations, vec!["DMD", "GBM", "IPF"]);
        assert_eq!(get_specializations(&conn).unwrap().len(), SPECIALIZATIONS.len());
    }

    #[test]
    fn second_run_inserts_nothing() {
        let conn = open_memory_database().unwrap();
        seed_reference_data(&conn).unwrap();
        let again = seed_reference_data(&conn).unwrap();
        assert_eq!(again.total(), 0);
        assert_eq!(get_contact_types(&conn).unwrap().len(), CONTACT_TYPES.len());
    }
}
