//! Configuration for Selkie actor types
//!
//! TigerStyle: Explicit defaults, validation, reasonable limits.

use crate::constants::*;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Per-actor-type runtime configuration
///
/// Defaults mirror the sidecar's actor runtime defaults: 1 hour idle
/// timeout, 30 second scan interval, 1 minute drain timeout, draining
/// enabled, lazy activation allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorTypeConfig {
    /// Idle time before an instance becomes eligible for deactivation (milliseconds)
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Interval between idle scans (milliseconds)
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    /// Bound on how long deactivation waits for an in-flight turn (milliseconds)
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_ongoing_call_timeout_ms: u64,

    /// Whether bulk deactivation (rebalance/shutdown) waits for in-flight turns
    #[serde(default = "default_drain_rebalanced")]
    pub drain_rebalanced_actors: bool,

    /// Require an explicit activate call before the first invocation
    ///
    /// When false (the default), invoking a not-yet-active actor activates
    /// it lazily, matching the sidecar's call discipline.
    #[serde(default)]
    pub require_explicit_activation: bool,
}

fn default_idle_timeout_ms() -> u64 {
    ACTOR_IDLE_TIMEOUT_MS_DEFAULT
}

fn default_scan_interval_ms() -> u64 {
    ACTOR_SCAN_INTERVAL_MS_DEFAULT
}

fn default_drain_timeout_ms() -> u64 {
    DRAIN_CALL_TIMEOUT_MS_DEFAULT
}

fn default_drain_rebalanced() -> bool {
    true
}

impl Default for ActorTypeConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            scan_interval_ms: default_scan_interval_ms(),
            drain_ongoing_call_timeout_ms: default_drain_timeout_ms(),
            drain_rebalanced_actors: default_drain_rebalanced(),
            require_explicit_activation: false,
        }
    }
}

impl ActorTypeConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.idle_timeout_ms == 0 || self.idle_timeout_ms > ACTOR_IDLE_TIMEOUT_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "idle_timeout_ms".into(),
                reason: format!(
                    "{} outside (0, {}]",
                    self.idle_timeout_ms, ACTOR_IDLE_TIMEOUT_MS_MAX
                ),
            });
        }

        if self.scan_interval_ms == 0 {
            return Err(Error::InvalidConfiguration {
                field: "scan_interval_ms".into(),
                reason: "must be positive".into(),
            });
        }

        if self.drain_ongoing_call_timeout_ms > DRAIN_CALL_TIMEOUT_MS_MAX {
            return Err(Error::InvalidConfiguration {
                field: "drain_ongoing_call_timeout_ms".into(),
                reason: format!(
                    "{} exceeds limit {}",
                    self.drain_ongoing_call_timeout_ms, DRAIN_CALL_TIMEOUT_MS_MAX
                ),
            });
        }

        Ok(())
    }
}
