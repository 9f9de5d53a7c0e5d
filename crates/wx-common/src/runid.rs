//! Run identifier: `YYYYMMDD_HHz`, parseable to a UTC cycle instant.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunIdError {
    #[error("invalid run id format: {0}")]
    InvalidFormat(String),
}

/// A validated `YYYYMMDD_HHz` run identifier.
///
/// Runs are ordered lexicographically equal to chronologically, so `RunId`
/// derives `Ord` straight off the backing string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn parse(s: &str) -> Result<Self, RunIdError> {
        if !is_well_formed(s) {
            return Err(RunIdError::InvalidFormat(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn from_cycle(cycle_utc: DateTime<Utc>) -> Self {
        Self(format!(
            "{}_{:02}z",
            cycle_utc.format("%Y%m%d"),
            cycle_utc.format("%H")
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn cycle_utc(&self) -> DateTime<Utc> {
        let date = &self.0[0..8];
        let hour: u32 = self.0[9..11].parse().expect("validated by parse");
        let naive_date = NaiveDate::parse_from_str(date, "%Y%m%d").expect("validated by parse");
        Utc.from_utc_datetime(&naive_date.and_hms_opt(hour, 0, 0).expect("validated by parse"))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checks the `^\d{8}_\d{2}z$` shape a run identifier must have.
pub fn is_well_formed(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 12 {
        return false;
    }
    let digits_ok = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    digits_ok(0..8) && bytes[8] == b'_' && digits_ok(9..11) && bytes[11] == b'z'
}
