//! Custom serde module for duration strings like "500ms", "5s", "1m".

use serde::{self, Deserialize, Deserializer};
use std::time::Duration;

/// Deserializes an optional duration string. A missing value becomes `Duration::ZERO`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_duration(&s).map_err(serde::de::Error::custom),
        None => Ok(Duration::ZERO),
    }
}

/// Parses "<number><unit>" where unit is one of ms, s, m, h. A bare number means seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }

    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let (value, unit) = s.split_at(split);

    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid duration number: {}", value))?;

    let seconds = match unit.trim() {
        "ms" => value / 1000.0,
        "s" | "" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => return Err(format!("unknown duration unit: {}", other)),
    };

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration {}: {}", s, e))
}
