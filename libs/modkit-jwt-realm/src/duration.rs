//! Signed human-readable durations for realm settings.
//!
//! Settings such as `allowed_clock_skew` and the HTTP timeouts accept a
//! negative value as a switch (`-1` disables clock checks, `-1` or `0`
//! disables a timeout). `humantime` only understands non-negative durations,
//! so the sign is peeled off first.
//!
//! Accepted forms: `"30s"`, `"5m 10s"`, `"-1"`, `"-1s"`, `"0"`, and bare
//! integers (seconds) as produced by YAML or environment providers.

use std::fmt;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A duration that may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedDuration {
    NonNegative(Duration),
    Negative(Duration),
}

impl SignedDuration {
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Self::Negative(Duration::from_secs(secs.unsigned_abs()))
        } else {
            Self::NonNegative(Duration::from_secs(secs.unsigned_abs()))
        }
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::Negative(_))
    }

    #[must_use]
    pub const fn magnitude(self) -> Duration {
        match self {
            Self::NonNegative(d) | Self::Negative(d) => d,
        }
    }

    /// Interpret the value as a timeout: negative or zero means "none".
    #[must_use]
    pub fn as_timeout(self) -> Option<Duration> {
        match self {
            Self::NonNegative(d) if !d.is_zero() => Some(d),
            _ => None,
        }
    }

    /// Parse a signed duration string.
    ///
    /// # Errors
    /// Returns a message describing why the input is not a duration.
    pub fn parse(input: &str) -> Result<Self, String> {
        let trimmed = input.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(format!("'{input}' is not a duration"));
        }

        let magnitude = if body.bytes().all(|b| b.is_ascii_digit()) {
            let secs: u64 = body
                .parse()
                .map_err(|_| format!("'{input}' is out of range"))?;
            Duration::from_secs(secs)
        } else {
            humantime::parse_duration(body).map_err(|e| format!("'{input}': {e}"))?
        };

        Ok(if negative && !magnitude.is_zero() {
            Self::Negative(magnitude)
        } else {
            Self::NonNegative(magnitude)
        })
    }
}

impl fmt::Display for SignedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonNegative(d) => write!(f, "{}", humantime::format_duration(*d)),
            Self::Negative(d) => write!(f, "-{}", humantime::format_duration(*d)),
        }
    }
}

impl Serialize for SignedDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SignedDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct V;

        impl de::Visitor<'_> for V {
            type Value = SignedDuration;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a duration such as \"30s\", \"-1\" or an integer number of seconds")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SignedDuration, E> {
                Ok(SignedDuration::from_secs(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SignedDuration, E> {
                Ok(SignedDuration::NonNegative(Duration::from_secs(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SignedDuration, E> {
                SignedDuration::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Serde helper for plain non-negative `humantime` durations.
pub(crate) mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::SignedDuration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match SignedDuration::deserialize(d)? {
            SignedDuration::NonNegative(v) => Ok(v),
            SignedDuration::Negative(_) => Err(serde::de::Error::custom(
                "negative durations are not allowed here",
            )),
        }
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(
            SignedDuration::parse("30s"),
            Ok(SignedDuration::NonNegative(Duration::from_secs(30)))
        );
        assert_eq!(
            SignedDuration::parse("5m 10s"),
            Ok(SignedDuration::NonNegative(Duration::from_secs(310)))
        );
        assert_eq!(
            SignedDuration::parse("-1"),
            Ok(SignedDuration::Negative(Duration::from_secs(1)))
        );
        assert_eq!(
            SignedDuration::parse("-1s"),
            Ok(SignedDuration::Negative(Duration::from_secs(1)))
        );
        assert_eq!(
            SignedDuration::parse("0"),
            Ok(SignedDuration::NonNegative(Duration::ZERO))
        );
    }

    #[test]
    fn test_negative_zero_is_zero() {
        for input in ["-0", "-0s", "-0ms", "- 0s"] {
            assert_eq!(
                SignedDuration::parse(input),
                Ok(SignedDuration::NonNegative(Duration::ZERO)),
                "{input}"
            );
        }
        let v: SignedDuration = serde_json::from_str("\"-0s\"").unwrap();
        assert!(!v.is_negative());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(SignedDuration::parse("").is_err());
        assert!(SignedDuration::parse("-").is_err());
        assert!(SignedDuration::parse("soon").is_err());
    }

    #[test]
    fn test_as_timeout() {
        assert_eq!(SignedDuration::from_secs(-1).as_timeout(), None);
        assert_eq!(SignedDuration::from_secs(0).as_timeout(), None);
        assert_eq!(
            SignedDuration::from_secs(5).as_timeout(),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_deserialize_integer_and_string() {
        let v: SignedDuration = serde_json::from_str("-1").unwrap();
        assert!(v.is_negative());
        let v: SignedDuration = serde_json::from_str("60").unwrap();
        assert_eq!(v.magnitude(), Duration::from_secs(60));
        let v: SignedDuration = serde_json::from_str("\"2m\"").unwrap();
        assert_eq!(v.magnitude(), Duration::from_secs(120));
    }

    #[test]
    fn test_display() {
        assert_eq!(SignedDuration::from_secs(-1).to_string(), "-1s");
        assert_eq!(SignedDuration::from_secs(90).to_string(), "1m 30s");
    }
}
