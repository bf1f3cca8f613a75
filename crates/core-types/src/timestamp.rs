use core::fmt;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A UTC timestamp with nanosecond precision.
///
/// The canonical textual form is RFC 3339 with a `Z` offset, as produced by
/// [`Timestamp::to_rfc3339`]. Sign-bytes embed that exact string; any other
/// rendering (local zones, truncated fractions) invalidates signatures.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(OffsetDateTime);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("timestamp is not valid RFC 3339: {0}")]
    InvalidFormat(String),

    #[error("timestamp out of representable range")]
    OutOfRange,
}

impl Timestamp {
    /// The Unix epoch, used where a timestamp is structurally required but
    /// carries no information (e.g. absent commit signatures).
    pub const UNIX_EPOCH: Timestamp = Timestamp(OffsetDateTime::UNIX_EPOCH);

    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn from_unix_parts(seconds: i64, nanos: u32) -> Result<Self, TimestampError> {
        let base =
            OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| TimestampError::OutOfRange)?;

        Ok(Self(base + time::Duration::nanoseconds(i64::from(nanos))))
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.unix_timestamp()
    }

    pub fn subsec_nanos(&self) -> u32 {
        self.0.nanosecond()
    }

    /// The canonical RFC 3339 rendering in UTC.
    pub fn to_rfc3339(&self) -> Result<String, TimestampError> {
        self.0
            .format(&Rfc3339)
            .map_err(|_| TimestampError::OutOfRange)
    }

    pub fn parse_rfc3339(s: &str) -> Result<Self, TimestampError> {
        let parsed = OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|e| TimestampError::InvalidFormat(e.to_string()))?;

        Ok(Self(parsed.to_offset(time::UtcOffset::UTC)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str("<invalid timestamp>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_round_trip() {
        let ts = Timestamp::from_unix_parts(1_700_000_000, 123_456_789).unwrap();
        let text = ts.to_rfc3339().unwrap();
        assert!(text.ends_with('Z'));
        assert_eq!(Timestamp::parse_rfc3339(&text), Ok(ts));
    }

    #[test]
    fn canonical_form_is_stable() {
        let a = Timestamp::from_unix_parts(42, 5).unwrap();
        let b = Timestamp::from_unix_parts(42, 5).unwrap();
        assert_eq!(a.to_rfc3339().unwrap(), b.to_rfc3339().unwrap());
    }
}
