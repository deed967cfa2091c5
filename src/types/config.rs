//! Configuration structures.
//!
//! Configuration is loaded from environment variables and config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global broadcaster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Queue used when a subscriber declares no placement of its own.
    pub default_queue: String,

    /// How long a debounce marker survives in the shared store if it is
    /// never overwritten. Subscribers can override this per debounce block.
    #[serde(with = "humantime_serde")]
    pub marker_ttl: Duration,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_queue: "default".to_string(),
            marker_ttl: Duration::from_secs(7200),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_marker_ttl_is_two_hours() {
        let config = Config::default();
        assert_eq!(config.marker_ttl, Duration::from_secs(7200));
        assert_eq!(config.default_queue, "default");
    }

    #[test]
    fn marker_ttl_round_trips_as_humantime() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"2h\""));
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.marker_ttl, config.marker_ttl);
    }
}
