use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};

/// Default duration of continuous threshold passes needed to open the gate.
pub const DEFAULT_GATE_OPEN_TIME: Duration = Duration::from_millis(500);

/// Default duration of continuous threshold failures needed to close the gate.
pub const DEFAULT_GATE_CLOSE_TIME: Duration = Duration::from_millis(500);

/// Environment variable read by [`GateTiming::from_env_var`].
pub const TIMING_ENV_VAR: &str = "STREAMGATE_TIMING";

/// Hysteresis delays of a gate.
///
/// Serialized as whole milliseconds. Missing fields take the defaults.
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GateTiming {
    #[serde(rename = "open_ms", with = "millis")]
    pub time_before_open: Duration,
    #[serde(rename = "close_ms", with = "millis")]
    pub time_before_close: Duration,
}

impl Default for GateTiming {
    fn default() -> Self {
        Self {
            time_before_open: DEFAULT_GATE_OPEN_TIME,
            time_before_close: DEFAULT_GATE_CLOSE_TIME,
        }
    }
}

impl GateTiming {
    pub fn new(time_before_open: Duration, time_before_close: Duration) -> Self {
        Self {
            time_before_open,
            time_before_close,
        }
    }

    pub fn from_millis(open_ms: u64, close_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(open_ms),
            Duration::from_millis(close_ms),
        )
    }

    /// Reads `STREAMGATE_TIMING` (`<open_ms>:<close_ms>`), `None` if unset.
    pub fn from_env_var() -> anyhow::Result<Option<Self>> {
        Self::from_env(TIMING_ENV_VAR)
    }

    pub fn from_env(key: &str) -> anyhow::Result<Option<Self>> {
        match std::env::var(key) {
            Ok(s) => s
                .parse()
                .map(Some)
                .with_context(|| format!("Invalid {key}")),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Cannot read {key}")),
        }
    }
}

impl FromStr for GateTiming {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut iter = s.trim().split_terminator(':');
        let open_ms = parse_millis(iter.next(), "open")?;
        let close_ms = parse_millis(iter.next(), "close")?;

        if iter.next().is_some() {
            return Err(anyhow!("Expected <open_ms>:<close_ms>, got {s:?}"));
        }

        Ok(GateTiming::from_millis(open_ms, close_ms))
    }
}

fn parse_millis(field: Option<&str>, name: &str) -> anyhow::Result<u64> {
    let field = field.ok_or_else(|| anyhow!("Missing {name} time"))?;
    field
        .trim()
        .parse()
        .with_context(|| format!("Invalid {name} time {field:?}"))
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
