//! Serde helpers for the date formats the backend emits.
//!
//! Calendar dates go out as `YYYY-MM-DD`. Coming back they may be either a
//! bare date or a full RFC 3339 timestamp, depending on the endpoint.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serializer, de};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the date part.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.date_naive()))
}

pub mod calendar_date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_calendar_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`")))
    }
}

/// Optional calendar date; empty strings and `null` both decode to `None`.
pub mod optional_calendar_date {
    use super::*;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.collect_str(&date.format(DATE_FORMAT)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_calendar_date(raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`"))),
        }
    }
}

/// Optional timestamp that never fails decoding: anything that is not a valid
/// RFC 3339 string becomes `None`.
pub mod lenient_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<FixedOffset>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<FixedOffset>>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok()))
    }
}
