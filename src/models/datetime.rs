//! Lenient timestamp input for request bodies.
//!
//! Clients send call times as RFC 3339 with an offset (`2024-01-25T10:30:00Z`),
//! as naive local-less timestamps, or as bare dates. Everything is stored as
//! naive UTC; a bare date means midnight.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn parse_flexible(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `deserialize_with` target for `Option<NaiveDateTime>` fields. Pair it
/// with `#[serde(default)]` so an absent field stays `None`.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| {
        parse_flexible(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp `{s}`")))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        assert_eq!(parse_flexible("2024-01-25T10:30:00Z"), Some(at(2024, 1, 25, 10, 30)));
        assert_eq!(parse_flexible("2024-01-25T12:30:00+02:00"), Some(at(2024, 1, 25, 10, 30)));
    }

    #[test]
    fn naive_and_date_only_forms() {
        assert_eq!(parse_flexible("2024-01-25T10:30:00"), Some(at(2024, 1, 25, 10, 30)));
        assert_eq!(parse_flexible("2024-01-25 10:30:00"), Some(at(2024, 1, 25, 10, 30)));
        assert_eq!(parse_flexible("2024-01-01"), Some(at(2024, 1, 1, 0, 0)));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_flexible("next tuesday"), None);
        assert_eq!(parse_flexible("2024-13-01"), None);
    }

    #[test]
    fn null_and_missing_stay_none() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "deserialize_optional")]
            at: Option<NaiveDateTime>,
        }
        let missing: Body = serde_json::from_str("{}").unwrap();
        assert!(missing.at.is_none());
        let null: Body = serde_json::from_str(r#"{"at":null}"#).unwrap();
        assert!(null.at.is_none());
        assert!(serde_json::from_str::<Body>(r#"{"at":"soon"}"#).is_err());
    }
}
