//! Serde helpers for the timing fields in the playlist configuration
//!
//! Durations are written as humantime strings (`"30s"`, `"6h"`) and read from
//! either such a string or a plain number of seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Words that switch an optional interval off
const DISABLED_WORDS: &[&str] = &["off", "never", "disabled"];

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(i64),
    Text(String),
}

impl RawDuration {
    fn into_duration<E: serde::de::Error>(self) -> Result<Duration, E> {
        match self {
            Self::Seconds(seconds) => u64::try_from(seconds)
                .map(Duration::from_secs)
                .map_err(|_| E::custom(format!("Negative duration: {seconds}"))),
            Self::Text(text) => humantime::parse_duration(text.trim())
                .map_err(|e| E::custom(format!("Invalid duration '{text}': {e}"))),
        }
    }

    fn is_disabled(&self) -> bool {
        match self {
            Self::Seconds(seconds) => *seconds == 0,
            Self::Text(text) => {
                let text = text.trim();
                text == "0" || DISABLED_WORDS.iter().any(|w| text.eq_ignore_ascii_case(w))
            }
        }
    }
}

/// A required duration such as the fetch timeout
pub mod duration {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        RawDuration::deserialize(deserializer)?.into_duration()
    }
}

/// An interval that may be absent or switched off
///
/// `0`, `"off"`, `"never"` and `"disabled"` all read as `None`.
pub mod option_duration {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(period) => serializer.collect_str(&humantime::format_duration(*period)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<RawDuration>::deserialize(deserializer)? {
            Some(raw) if raw.is_disabled() => Ok(None),
            Some(raw) => raw.into_duration().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize)]
    struct Timings {
        #[serde(with = "super::duration")]
        timeout: Duration,
        #[serde(default, with = "super::option_duration")]
        refresh: Option<Duration>,
    }

    #[test]
    fn test_parses_human_readable_and_seconds() {
        let timings: Timings = toml::from_str("timeout = \"1m30s\"\nrefresh = \"2h\"").unwrap();
        assert_eq!(timings.timeout, Duration::from_secs(90));
        assert_eq!(timings.refresh, Some(Duration::from_secs(7200)));

        let timings: Timings = toml::from_str("timeout = 15").unwrap();
        assert_eq!(timings.timeout, Duration::from_secs(15));
        assert_eq!(timings.refresh, None);
    }

    #[test]
    fn test_refresh_can_be_switched_off() {
        for value in ["0", "\"off\"", "\"Never\"", "\"0\""] {
            let timings: Timings =
                toml::from_str(&format!("timeout = 5\nrefresh = {value}")).unwrap();
            assert_eq!(timings.refresh, None, "refresh = {value}");
        }
    }

    #[test]
    fn test_serializes_as_humantime() {
        let timings = Timings {
            timeout: Duration::from_secs(90),
            refresh: None,
        };
        let text = toml::to_string(&timings).unwrap();
        assert!(text.contains("timeout = \"1m 30s\""));
        assert!(!text.contains("refresh"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(toml::from_str::<Timings>("timeout = \"soon\"").is_err());
        assert!(toml::from_str::<Timings>("timeout = -4").is_err());
    }
}
