//! Identity & relationship integrity engine.
//!
//! Every public operation takes a borrowed `Connection` and runs as one
//! transaction (or one savepoint when the caller already has a transaction
//! open), so a failed call never leaves partial writes behind. Cross-row
//! invariants are checked here with read-then-write inside that transaction;
//! the partial unique indexes in the schema are the backstop.

pub mod error;
pub mod identity;
pub mod interactions;
pub mod journeys;
pub mod leads;
pub mod lookups;
pub mod patients;
pub mod physicians;
pub mod registry;
pub mod relationships;
pub mod roles;
pub mod validation;

pub use error::{EngineError, ErrorKind};
pub use registry::LookupRegistry;
