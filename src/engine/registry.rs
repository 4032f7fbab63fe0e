//! Immutable snapshot of reference data.
//!
//! Loaded once at startup (and again after an admin edits conditions) and
//! shared behind an `Arc`. Also owns resolution of legacy free-text condition
//! labels: exact name, then abbreviation, then the `condition_aliases` table,
//! all case-insensitive.

use std::collections::HashMap;

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::*;

#[derive(Debug, Clone, Default)]
pub struct LookupRegistry {
    conditions: Vec<MedicalCondition>,
    by_name: HashMap<String, usize>,
    by_abbreviation: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    contact_types: Vec<ContactType>,
    specializations: Vec<Specialization>,
    hospitals: Vec<Hospital>,
}

fn key(text: &str) -> String {
    text.trim().to_lowercase()
}

impl LookupRegistry {
    pub fn load(conn: &Connection) -> Result<Self, DatabaseError> {
        let conditions = repository::get_all_medical_conditions(conn)?;

        let mut by_name = HashMap::new();
        let mut by_abbreviation = HashMap::new();
        for (idx, condition) in conditions.iter().enumerate() {
            by_name.insert(key(&condition.name), idx);
            if let Some(abbreviation) = &condition.abbreviation {
                by_abbreviation.entry(key(abbreviation)).or_insert(idx);
            }
        }

        let index_of: HashMap<Uuid, usize> =
            conditions.iter().enumerate().map(|(idx, c)| (c.id, idx)).collect();
        let mut by_alias = HashMap::new();
        for (alias, condition_id) in repository::get_condition_aliases(conn)? {
            if let Some(&idx) = index_of.get(&condition_id) {
                by_alias.insert(key(&alias), idx);
            }
        }

        let registry = Self {
            conditions,
            by_name,
            by_abbreviation,
            by_alias,
            contact_types: repository::get_contact_types(conn)?,
            specializations: repository::get_specializations(conn)?,
            hospitals: repository::get_hospitals(conn)?,
        };
        tracing::debug!(
            conditions = registry.conditions.len(),
            aliases = registry.by_alias.len(),
            "Lookup registry loaded"
        );
        Ok(registry)
    }

    /// Resolve a legacy free-text condition label. `None` when nothing matches;
    /// callers report that as a validation error.
    pub fn resolve_condition(&self, text: &str) -> Option<&MedicalCondition> {
        let k = key(text);
        if k.is_empty() {
            return None;
        }
        self.by_name
            .get(&k)
            .or_else(|| self.by_abbreviation.get(&k))
            .or_else(|| self.by_alias.get(&k))
            .map(|&idx| &self.conditions[idx])
    }

    pub fn condition(&self, id: &Uuid) -> Option<&MedicalCondition> {
        self.conditions.iter().find(|c| c.id == *id)
    }

    pub fn conditions(&self) -> &[MedicalCondition] {
        &self.conditions
    }

    pub fn contact_type_by_name(&self, name: &str) -> Option<&ContactType> {
        let k = key(name);
        self.contact_types.iter().find(|c| key(&c.name) == k)
    }

    pub fn contact_types(&self) -> &[ContactType] {
        &self.contact_types
    }

    pub fn specializations(&self) -> &[Specialization] {
        &self.specializations
    }

    pub fn hospitals(&self) -> &[Hospital] {
        &self.hospitals
    }
}
