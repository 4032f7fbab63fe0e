//! Repository layer: entity-scoped database operations.
//!
//! Plain functions over a borrowed `Connection`, so every call composes into
//! whatever transaction the engine has open. No function here enforces a
//! cross-row invariant on its own; that belongs to `crate::engine`.

mod interaction;
mod journey;
mod lead;
mod lookup;
mod patient;
mod person;
mod physician;
mod relationship;
mod role;

use chrono::{NaiveDate, NaiveDateTime, Timelike, Utc};
use uuid::Uuid;

use super::DatabaseError;

// Re-export all public items from sub-modules
pub use interaction::*;
pub use journey::*;
pub use lead::*;
pub use lookup::*;
pub use patient::*;
pub use person::*;
pub use physician::*;
pub use relationship::*;
pub use role::*;

/// Fixed-width so lexical order in SQL equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current UTC wall-clock time, the engine's single source of "now".
/// Truncated to microseconds, the precision the store keeps, so values held
/// in memory compare equal to the rows read back.
pub fn now() -> NaiveDateTime {
    let ts = Utc::now().naive_utc();
    ts.with_nanosecond(ts.nanosecond() / 1_000 * 1_000).unwrap_or(ts)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_opt_uuid(raw: Option<String>) -> Result<Option<Uuid>, DatabaseError> {
    raw.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid timestamp {raw}: {e}")))
}

pub(crate) fn parse_opt_timestamp(
    raw: Option<String>,
) -> Result<Option<NaiveDateTime>, DatabaseError> {
    raw.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid date {raw}: {e}")))
}

pub(crate) fn parse_opt_date(raw: Option<String>) -> Result<Option<NaiveDate>, DatabaseError> {
    raw.as_deref().map(parse_date).transpose()
}
