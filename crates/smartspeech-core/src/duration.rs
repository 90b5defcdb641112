//! Textual durations in the protobuf JSON form (`"7s"`, `"0.250s"`, `"-1.5s"`).

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

const MAX_SECONDS: i64 = 315_576_000_000;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-)?(\d+)(?:\.(\d{1,9}))?s$").unwrap());

/// A signed duration with nanosecond precision, as carried on the wire.
///
/// `seconds` and `nanos` always have the same sign (or are zero), matching
/// `google.protobuf.Duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeechDuration {
    seconds: i64,
    nanos: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDurationError(pub String);

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed duration: {:?}", self.0)
    }
}

impl std::error::Error for ParseDurationError {}

impl SpeechDuration {
    pub fn from_secs(seconds: i64) -> Self {
        Self { seconds, nanos: 0 }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> i32 {
        self.nanos
    }
}

impl FromStr for SpeechDuration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDurationError(s.to_string());
        let caps = DURATION_RE.captures(s.trim()).ok_or_else(err)?;

        let negative = caps.get(1).is_some();
        let seconds: i64 = caps[2].parse().map_err(|_| err())?;
        if seconds > MAX_SECONDS {
            return Err(err());
        }

        let nanos = match caps.get(3) {
            Some(frac) => {
                let digits = frac.as_str();
                let value: i32 = digits.parse().map_err(|_| err())?;
                value * 10_i32.pow(9 - digits.len() as u32)
            }
            None => 0,
        };

        Ok(if negative {
            Self {
                seconds: -seconds,
                nanos: -nanos,
            }
        } else {
            Self { seconds, nanos }
        })
    }
}

impl fmt::Display for SpeechDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds < 0 || self.nanos < 0 {
            f.write_str("-")?;
        }
        let seconds = self.seconds.unsigned_abs();
        let nanos = self.nanos.unsigned_abs();

        if nanos == 0 {
            write!(f, "{seconds}s")
        } else if nanos % 1_000_000 == 0 {
            write!(f, "{seconds}.{:03}s", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            write!(f, "{seconds}.{:06}s", nanos / 1_000)
        } else {
            write!(f, "{seconds}.{nanos:09}s")
        }
    }
}
