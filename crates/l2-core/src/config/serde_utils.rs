//! Serde helpers for the settings file and tunnel records
//!
//! Durations are written as plain integers, which reads better in TOML
//! than serde's default `{ secs, nanos }` table.

/// Whole seconds (`command_timeout = 30`)
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Milliseconds (`settle_delay = 500`)
pub mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `Option<Ipv4Addr>` that survives TOML, which has no null
///
/// `None` is written as an empty string so an explicitly cleared address
/// stays cleared; a missing key is left to the field's `default`.
pub mod optional_addr {
    use serde::{self, de::Error as _, Deserialize, Deserializer, Serializer};
    use std::net::Ipv4Addr;

    pub fn serialize<S>(addr: &Option<Ipv4Addr>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match addr {
            Some(addr) => serializer.collect_str(addr),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Ipv4Addr>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestSettings {
        #[serde(with = "duration_secs")]
        timeout: Duration,
        #[serde(with = "duration_millis")]
        delay: Duration,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestTarget {
        #[serde(with = "optional_addr")]
        target: Option<Ipv4Addr>,
    }

    #[test]
    fn test_durations_serialize_as_integers() {
        let settings = TestSettings {
            timeout: Duration::from_secs(30),
            delay: Duration::from_millis(500),
        };
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("timeout = 30"));
        assert!(text.contains("delay = 500"));
    }

    #[test]
    fn test_durations_deserialize() {
        let settings: TestSettings = toml::from_str("timeout = 5\ndelay = 0\n").unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.delay, Duration::ZERO);
    }

    #[test]
    fn test_optional_addr() {
        let cleared = TestTarget { target: None };
        let text = toml::to_string(&cleared).unwrap();
        assert_eq!(text.trim(), "target = \"\"");
        assert_eq!(toml::from_str::<TestTarget>(&text).unwrap(), cleared);

        let set: TestTarget = toml::from_str("target = \"10.30.30.6\"").unwrap();
        assert_eq!(set.target, Some(Ipv4Addr::new(10, 30, 30, 6)));

        assert!(toml::from_str::<TestTarget>("target = \"10.30\"").is_err());
    }
}
