//! Timestamp encoding shared by every table.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC so that
//! `ORDER BY` on the text column follows chronological order.

use chrono::SecondsFormat;
use camlink_domain::time::Timestamp;

pub(crate) fn encode(at: Timestamp) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|at| at.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
