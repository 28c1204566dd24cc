//! Slack timestamp codec and deletion cutoffs.
//!
//! Slack identifies messages by a `ts` string: whole seconds since the Unix
//! epoch, a single `.`, then six digits of microseconds
//! (`"1700000123.456789"`). Files report their creation time as plain epoch
//! seconds instead.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use slackprune::models::{Cutoff, from_remote_timestamp, to_remote_timestamp};
//!
//! let ts = "1700000123.456789";
//! let instant = from_remote_timestamp(ts).unwrap();
//! assert_eq!(to_remote_timestamp(instant), ts);
//!
//! let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let cutoff = Cutoff::from_date(date);
//! assert_eq!(cutoff.timestamp(), "1704067200.000000");
//! assert_eq!(cutoff.epoch_seconds(), 1_704_067_200);
//! ```

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Date format accepted for `before` cutoffs.
pub const CUTOFF_DATE_FORMAT: &str = "%Y%m%d";

/// Decodes a Slack `ts` string into an instant.
///
/// # Errors
///
/// Returns [`Error::MalformedTimestamp`] if the string does not contain
/// exactly one `.`, or either side is not a number, or the fractional part
/// exceeds one second.
pub fn from_remote_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    let malformed = || Error::MalformedTimestamp(ts.to_string());

    let (secs, micros) = ts.split_once('.').ok_or_else(malformed)?;
    if micros.contains('.') || micros.is_empty() || !micros.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let secs: i64 = secs.parse().map_err(|_| malformed())?;
    let micros: i64 = micros.parse().map_err(|_| malformed())?;
    if micros >= MICROS_PER_SECOND {
        return Err(malformed());
    }

    let nanos = u32::try_from(micros * 1_000).map_err(|_| malformed())?;
    DateTime::from_timestamp(secs, nanos).ok_or_else(malformed)
}

/// Encodes an instant as a Slack `ts` string.
///
/// Sub-microsecond precision is truncated.
#[must_use]
pub fn to_remote_timestamp(instant: DateTime<Utc>) -> String {
    let micros = instant.timestamp_micros();
    format!(
        "{}.{:06}",
        micros.div_euclid(MICROS_PER_SECOND),
        micros.rem_euclid(MICROS_PER_SECOND)
    )
}

/// Upper time bound for selecting messages and files.
///
/// Both forms are derived from the same calendar date, so message and file
/// selection never disagree on where the cutoff lies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cutoff {
    instant: DateTime<Utc>,
    timestamp: String,
}

impl Cutoff {
    /// Creates a cutoff at midnight UTC at the start of `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self::from_instant(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// Creates a cutoff at an exact instant.
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            timestamp: to_remote_timestamp(instant),
        }
    }

    /// Parses a `YYYYMMDD` date into a cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the date does not parse.
    pub fn parse(date: &str) -> Result<Self> {
        NaiveDate::parse_from_str(date.trim(), CUTOFF_DATE_FORMAT)
            .map(Self::from_date)
            .map_err(|e| Error::InvalidInput(format!("invalid before date {date:?}: {e}")))
    }

    /// The cutoff instant.
    #[must_use]
    pub const fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The cutoff in Slack `ts` form, used for message selection.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The cutoff in whole epoch seconds, used for file selection.
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        self.instant.timestamp()
    }

    /// Returns true if a message with this `ts` is at or before the cutoff.
    ///
    /// Plain string comparison: both sides share the fixed-width encoding.
    #[must_use]
    pub fn admits_message(&self, ts: &str) -> bool {
        ts <= self.timestamp.as_str()
    }

    /// Returns true if a file created at `created_at` is strictly before the
    /// cutoff.
    #[must_use]
    pub fn admits_file(&self, created_at: DateTime<Utc>) -> bool {
        created_at.timestamp() < self.epoch_seconds()
    }
}
