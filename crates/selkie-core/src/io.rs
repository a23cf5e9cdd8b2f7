//! Clock abstraction
//!
//! TigerStyle: All time reads go through a trait so idle tracking and drain
//! behavior can be driven deterministically in tests.
//!
//! Code that needs the current time MUST use `TimeProvider`; never call
//! `std::time::SystemTime::now()` directly outside `WallClockTime`.

use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider abstraction
///
/// # Implementations
///
/// - `WallClockTime`: production, uses the system clock
/// - test clocks: deterministic, manually advanced
#[async_trait]
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in milliseconds since epoch
    fn now_ms(&self) -> u64;

    /// Sleep for the specified duration
    async fn sleep_ms(&self, ms: u64);

    /// Get monotonic timestamp (for measuring durations)
    fn monotonic_ms(&self) -> u64 {
        self.now_ms()
    }
}

/// Production time provider using wall clock
#[derive(Debug, Clone, Default)]
pub struct WallClockTime;

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TimeProvider for WallClockTime {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }
}
