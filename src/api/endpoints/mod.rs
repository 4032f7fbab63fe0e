//! API endpoint handlers.
//!
//! Each module corresponds to one resource. Handlers are thin: parse, call
//! the engine on the blocking pool, map the result.

pub mod call_history;
pub mod conditions;
pub mod health;
pub mod journeys;
pub mod leads;
pub mod lookups;
pub mod patients;
pub mod persons;
pub mod physicians;
