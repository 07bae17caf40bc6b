use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// An ISO-8601 duration such as `PT30M` or `P3D`, used for settlement time bounds.
///
/// Only exact components are accepted (weeks, days, hours, minutes, seconds); years and
/// months have no fixed length and are rejected. The original text is kept for
/// serialization.
///
/// ```
/// use std::time::Duration;
/// use fiatconnect_core::types::Iso8601Duration;
///
/// let d: Iso8601Duration = "P1DT2H30M".parse().unwrap();
/// assert_eq!(d.duration(), Duration::from_secs(86_400 + 2 * 3_600 + 30 * 60));
/// assert!("P1M".parse::<Iso8601Duration>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iso8601Duration {
    raw: String,
    duration: Duration,
}

impl Iso8601Duration {
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl PartialOrd for Iso8601Duration {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Iso8601Duration {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.duration
            .cmp(&other.duration)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl From<Duration> for Iso8601Duration {
    fn from(duration: Duration) -> Self {
        let total = duration.as_secs();
        let (days, rem) = (total / 86_400, total % 86_400);
        let (hours, rem) = (rem / 3_600, rem % 3_600);
        let (minutes, seconds) = (rem / 60, rem % 60);

        let mut raw = String::from("P");
        if days > 0 {
            raw.push_str(&format!("{days}D"));
        }
        if hours > 0 || minutes > 0 || seconds > 0 || days == 0 {
            raw.push('T');
            if hours > 0 {
                raw.push_str(&format!("{hours}H"));
            }
            if minutes > 0 {
                raw.push_str(&format!("{minutes}M"));
            }
            if seconds > 0 || (hours == 0 && minutes == 0) {
                raw.push_str(&format!("{seconds}S"));
            }
        }

        Iso8601Duration {
            raw,
            duration: Duration::from_secs(total),
        }
    }
}

impl FromStr for Iso8601Duration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidDuration(format!("{s}: {reason}"));

        let body = s.strip_prefix('P').ok_or_else(|| invalid("missing 'P'"))?;
        if body.is_empty() {
            return Err(invalid("no components"));
        }

        let mut seconds = 0f64;
        let mut in_time = false;
        let mut number = String::new();
        let mut components = 0;
        let mut time_components = 0;

        for c in body.chars() {
            match c {
                'T' if !in_time && number.is_empty() => in_time = true,
                '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
                designator => {
                    if number.is_empty() {
                        return Err(invalid("designator without value"));
                    }
                    let value: f64 = number.parse().map_err(|_| invalid("bad number"))?;
                    if value.fract() != 0.0 && !(in_time && designator == 'S') {
                        return Err(invalid("fractions only allowed for seconds"));
                    }
                    let unit = match (in_time, designator) {
                        (false, 'W') => 604_800.0,
                        (false, 'D') => 86_400.0,
                        (false, 'Y') | (false, 'M') => {
                            return Err(invalid("years and months are not exact"));
                        }
                        (true, 'H') => 3_600.0,
                        (true, 'M') => 60.0,
                        (true, 'S') => 1.0,
                        _ => return Err(invalid("unknown designator")),
                    };
                    seconds += value * unit;
                    components += 1;
                    if in_time {
                        time_components += 1;
                    }
                    number.clear();
                }
            }
        }

        if !number.is_empty() {
            return Err(invalid("trailing value without designator"));
        }
        if components == 0 {
            return Err(invalid("no components"));
        }
        if in_time && time_components == 0 {
            return Err(invalid("'T' without time components"));
        }

        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| invalid("out of range"))?;
        Ok(Iso8601Duration {
            raw: s.to_string(),
            duration,
        })
    }
}

impl Display for Iso8601Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for Iso8601Duration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Iso8601Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Iso8601Duration::from_str(&s).map_err(serde::de::Error::custom)
    }
}
