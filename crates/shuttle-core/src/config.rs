//! Dispatcher settings.
//!
//! | Variable                 | Default | Description                                   |
//! |--------------------------|---------|-----------------------------------------------|
//! | `SHUTTLE_RETRY_DELAY_MS` | `1000`  | Wait before a failed job goes back to its queue |
//! | `SHUTTLE_BUS_CAPACITY`   | `1024`  | Buffer size of each notification channel      |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const RETRY_DELAY_ENV: &str = "SHUTTLE_RETRY_DELAY_MS";
pub const BUS_CAPACITY_ENV: &str = "SHUTTLE_BUS_CAPACITY";

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Fixed backoff after an executor failure. There is no attempt cap.
    #[serde(rename = "retry_delay_ms", with = "duration_ms")]
    pub retry_delay: Duration,

    pub bus_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl DispatcherConfig {
    /// Read overrides from the process environment; unset keys keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(RETRY_DELAY_ENV) {
            let ms: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: RETRY_DELAY_ENV,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            config.retry_delay = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(BUS_CAPACITY_ENV) {
            let capacity: usize = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: BUS_CAPACITY_ENV,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            // broadcast::channel panics on zero
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    key: BUS_CAPACITY_ENV,
                    value: raw,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.bus_capacity = capacity;
        }

        Ok(config)
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
