//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// UTC timestamp used for rule scheduling and time conditions.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Convert unix seconds into a [`Timestamp`], `None` when out of range.
#[must_use]
pub fn from_unix_seconds(seconds: i64) -> Option<Timestamp> {
    DateTime::from_timestamp(seconds, 0)
}

/// Midnight (UTC) at the start of `date`.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> Timestamp {
    date.and_time(NaiveTime::MIN).and_utc()
}
