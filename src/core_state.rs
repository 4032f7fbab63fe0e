//! Transport-agnostic application state.
//!
//! `CoreState` is shared by every request handler behind an `Arc`. It holds
//! no open connection: each operation opens its own through `open_db`, so
//! concurrent requests serialize only inside SQLite.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::db;
use crate::engine::LookupRegistry;

pub struct CoreState {
    db_path: PathBuf,
    /// Current reference-data snapshot. Swapped wholesale on reload, so
    /// readers holding the previous `Arc` keep a consistent view.
    registry: RwLock<Arc<LookupRegistry>>,
}

impl CoreState {
    /// Open (and migrate) the database once, then load the registry.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let db_path = db_path.into();
        let conn = db::open_database(&db_path)?;
        let registry = LookupRegistry::load(&conn)?;
        Ok(Self {
            db_path,
            registry: RwLock::new(Arc::new(registry)),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a database connection. Most common operation in handlers.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// Cheap clone of the current snapshot.
    pub fn registry(&self) -> Result<Arc<LookupRegistry>, CoreError> {
        let guard = self.registry.read().map_err(|_| CoreError::LockPoisoned)?;
        Ok(Arc::clone(&guard))
    }

    /// Rebuild the snapshot after reference data changed.
    pub fn reload_registry(&self) -> Result<Arc<LookupRegistry>, CoreError> {
        let conn = self.open_db()?;
        let fresh = Arc::new(LookupRegistry::load(&conn)?);
        let mut guard = self.registry.write().map_err(|_| CoreError::LockPoisoned)?;
        *guard = Arc::clone(&fresh);
        tracing::debug!(conditions = fresh.conditions().len(), "Lookup registry reloaded");
        Ok(fresh)
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
