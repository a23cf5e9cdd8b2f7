//! Telemetry initialization
//!
//! Opt-in `tracing` subscriber setup for binaries and examples. Library
//! crates only emit `tracing` events; owning the process's logging bootstrap
//! stays with the embedding application, which may call this or install its
//! own subscriber.

use crate::error::Result;
use tracing_subscriber::EnvFilter;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name reported in events
    pub service_name: String,
    /// Log level filter (tracing `EnvFilter` syntax)
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "selkie".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration with the given service name
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the log level filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Create from environment variables
    ///
    /// Reads `SELKIE_SERVICE_NAME` (default: "selkie") and `RUST_LOG`
    /// (default: "info").
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("SELKIE_SERVICE_NAME").unwrap_or_else(|_| "selkie".to_string());
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            service_name,
            log_level,
        }
    }
}

/// Guard keeping telemetry alive for the process lifetime
///
/// Hold onto this for as long as events should be emitted.
#[derive(Debug)]
pub struct TelemetryGuard {
    _private: (),
}

/// Install a formatting `tracing` subscriber
///
/// Idempotent: a subscriber installed earlier in the process wins and this
/// call becomes a no-op.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();

    tracing::debug!(service = %config.service_name, "telemetry initialized");
    Ok(TelemetryGuard { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "selkie");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        let config = TelemetryConfig::new("selkie-test").with_log_level("debug");
        let _first = init_telemetry(&config).unwrap();
        let _second = init_telemetry(&config).unwrap();
    }
}
