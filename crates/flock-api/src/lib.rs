pub mod admin;
pub mod auth;
pub mod chats;
pub mod error;
pub mod middleware;
pub mod posts;
pub mod token;
pub mod users;
pub mod validate;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Parse a uuid column. Rows are only ever written with uuid ids, so a
/// failure means a corrupt row; log and fall back rather than failing the
/// whole request.
pub(crate) fn parse_uuid(value: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}': {}", value, e);
        Uuid::default()
    })
}

/// Parse a created_at column. Rows written by the handlers carry RFC 3339;
/// rows that fell back to the SQLite column default carry
/// "YYYY-MM-DD HH:MM:SS" without a timezone.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", value, e);
            DateTime::default()
        })
}
