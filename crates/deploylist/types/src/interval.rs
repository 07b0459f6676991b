//! Polling interval expressed as a duration string
//!
//! Accepts the grammar `^([0-9]+(\.[0-9]+)?(ms|s|m|h))+$`, e.g. `5m`,
//! `1h30m`, `1.5s`, `250ms`. Serialized back in the same grammar.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

/// Errors produced while parsing an interval string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalParseError {
    #[error("interval is empty")]
    Empty,

    #[error("invalid interval {input:?}: expected a number at offset {offset}")]
    ExpectedNumber { input: String, offset: usize },

    #[error("invalid interval {input:?}: expected a unit (ms, s, m, h) at offset {offset}")]
    ExpectedUnit { input: String, offset: usize },

    #[error("interval {0:?} is too large")]
    Overflow(String),
}

/// Polling interval of a declared object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval(Duration);

impl Interval {
    /// Default polling interval (5 minutes)
    pub const DEFAULT: Interval = Interval(Duration::from_secs(5 * 60));

    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Duration> for Interval {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<Interval> for Duration {
    fn from(interval: Interval) -> Self {
        interval.0
    }
}

impl FromStr for Interval {
    type Err = IntervalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_interval(s).map(Self)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.as_nanos();
        if total == 0 {
            return write!(f, "0s");
        }

        let hours = total / NANOS_PER_HOUR;
        let minutes = (total % NANOS_PER_HOUR) / NANOS_PER_MIN;
        let seconds = (total % NANOS_PER_MIN) / NANOS_PER_SEC;
        let nanos = total % NANOS_PER_SEC;

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if nanos > 0 {
            let fraction = format!("{:09}", nanos);
            write!(f, "{}.{}s", seconds, fraction.trim_end_matches('0'))?;
        } else if seconds > 0 {
            write!(f, "{}s", seconds)?;
        }
        Ok(())
    }
}

impl Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a duration string of the form `([0-9]+(\.[0-9]+)?(ms|s|m|h))+`
pub fn parse_interval(input: &str) -> Result<Duration, IntervalParseError> {
    if input.is_empty() {
        return Err(IntervalParseError::Empty);
    }

    let bytes = input.as_bytes();
    let overflow = || IntervalParseError::Overflow(input.to_string());
    let mut pos = 0;
    let mut total: u128 = 0;

    while pos < bytes.len() {
        let int_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == int_start {
            return Err(IntervalParseError::ExpectedNumber {
                input: input.to_string(),
                offset: pos,
            });
        }
        let whole: u128 = input[int_start..pos].parse().map_err(|_| overflow())?;

        let mut fraction = "";
        if pos < bytes.len() && bytes[pos] == b'.' {
            pos += 1;
            let frac_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == frac_start {
                return Err(IntervalParseError::ExpectedNumber {
                    input: input.to_string(),
                    offset: pos,
                });
            }
            fraction = &input[frac_start..pos];
        }

        let rest = &input[pos..];
        let (unit, width) = if rest.starts_with("ms") {
            (NANOS_PER_MILLI, 2)
        } else if rest.starts_with('s') {
            (NANOS_PER_SEC, 1)
        } else if rest.starts_with('m') {
            (NANOS_PER_MIN, 1)
        } else if rest.starts_with('h') {
            (NANOS_PER_HOUR, 1)
        } else {
            return Err(IntervalParseError::ExpectedUnit {
                input: input.to_string(),
                offset: pos,
            });
        };
        pos += width;

        let mut component = whole.checked_mul(unit).ok_or_else(overflow)?;
        if !fraction.is_empty() {
            // Digits beyond nanosecond precision carry no value.
            let digits = &fraction[..fraction.len().min(18)];
            let numerator: u128 = digits.parse().map_err(|_| overflow())?;
            let scale = 10u128.pow(digits.len() as u32);
            component = component
                .checked_add(numerator * unit / scale)
                .ok_or_else(overflow)?;
        }
        total = total.checked_add(component).ok_or_else(overflow)?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| overflow())?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_interval("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_interval("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_interval("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_interval("1m0.25s").unwrap(), Duration::from_millis(60_250));
        assert_eq!(parse_interval("0.5ms").unwrap(), Duration::from_micros(500));
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(parse_interval(""), Err(IntervalParseError::Empty));
        assert!(matches!(
            parse_interval("5"),
            Err(IntervalParseError::ExpectedUnit { offset: 1, .. })
        ));
        assert!(matches!(
            parse_interval("m"),
            Err(IntervalParseError::ExpectedNumber { offset: 0, .. })
        ));
        assert!(parse_interval("1.s").is_err());
        assert!(parse_interval("5 m").is_err());
        assert!(parse_interval("-5m").is_err());
        assert!(parse_interval("5d").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Interval::DEFAULT.to_string(), "5m");
        assert_eq!(Interval::new(Duration::from_secs(5400)).to_string(), "1h30m");
        assert_eq!(Interval::new(Duration::from_millis(1500)).to_string(), "1.5s");
        assert_eq!(Interval::new(Duration::ZERO).to_string(), "0s");
        assert_eq!(Interval::new(Duration::from_secs(3601)).to_string(), "1h1s");
    }

    #[test]
    fn test_serde_as_string() {
        let interval: Interval = serde_json::from_str("\"10m\"").unwrap();
        assert_eq!(interval.as_duration(), Duration::from_secs(600));
        assert_eq!(serde_json::to_string(&interval).unwrap(), "\"10m\"");
        assert!(serde_json::from_str::<Interval>("\"ten minutes\"").is_err());
    }

    proptest! {
        #[test]
        fn display_output_parses_back(secs in 0u64..1_000_000, nanos in 0u32..1_000_000_000) {
            let interval = Interval::new(Duration::new(secs, nanos));
            let reparsed: Interval = interval.to_string().parse().unwrap();
            prop_assert_eq!(reparsed, interval);
        }
    }
}
