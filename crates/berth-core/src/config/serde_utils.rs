//! Serde helpers shared by configuration types

/// `Duration` stored as whole seconds, e.g. `connect_timeout = 5`
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DaemonTimeouts {
        #[serde(with = "duration_secs")]
        connect_timeout: Duration,
    }

    #[test]
    fn test_duration_secs_in_toml() {
        let parsed: DaemonTimeouts = toml::from_str("connect_timeout = 7").unwrap();
        assert_eq!(parsed.connect_timeout, Duration::from_secs(7));

        let rendered = toml::to_string(&parsed).unwrap();
        assert_eq!(rendered.trim(), "connect_timeout = 7");
    }

    #[test]
    fn test_duration_secs_truncates_subsecond() {
        let value = DaemonTimeouts {
            connect_timeout: Duration::from_millis(2500),
        };
        assert_eq!(
            toml::to_string(&value).unwrap().trim(),
            "connect_timeout = 2"
        );
    }
}
