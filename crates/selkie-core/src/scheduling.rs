//! Timer and reminder definitions
//!
//! Timers are transient: they live in the owning instance and vanish on
//! deactivation. Reminders are durable: their definitions are persisted by
//! the external store and keep firing after reactivation.

use crate::constants::{SCHEDULE_NAME_LENGTH_BYTES_MAX, SCHEDULE_PAYLOAD_SIZE_BYTES_MAX};
use crate::error::{Error, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Transient scheduled invocation bound to one activated instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerDefinition {
    /// Name, unique per actor instance (re-registering replaces)
    pub name: String,
    /// Delay before the first fire (milliseconds)
    pub due_time_ms: u64,
    /// Repeat interval; absent means one-shot
    pub period_ms: Option<u64>,
    /// Behavior method invoked on fire
    pub callback: String,
    /// Payload delivered to the callback
    pub payload: Bytes,
}

/// Durable scheduled invocation persisted by the external store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderDefinition {
    /// Name, unique per actor instance (re-registering replaces)
    pub name: String,
    /// Delay before the first fire (milliseconds)
    pub due_time_ms: u64,
    /// Repeat interval; absent means one-shot
    pub period_ms: Option<u64>,
    /// Behavior method invoked on fire
    pub callback: String,
    /// Payload persisted alongside the definition
    pub payload: Bytes,
}

fn validate_schedule(name: &str, callback: &str, payload_len: usize) -> Result<()> {
    if name.is_empty() || name.len() > SCHEDULE_NAME_LENGTH_BYTES_MAX {
        return Err(Error::InvalidConfiguration {
            field: "name".into(),
            reason: format!(
                "length {} outside (0, {}]",
                name.len(),
                SCHEDULE_NAME_LENGTH_BYTES_MAX
            ),
        });
    }
    if callback.is_empty() {
        return Err(Error::InvalidConfiguration {
            field: "callback".into(),
            reason: "must not be empty".into(),
        });
    }
    if payload_len > SCHEDULE_PAYLOAD_SIZE_BYTES_MAX {
        return Err(Error::InvalidConfiguration {
            field: "payload".into(),
            reason: format!(
                "{} bytes exceeds limit {}",
                payload_len, SCHEDULE_PAYLOAD_SIZE_BYTES_MAX
            ),
        });
    }
    Ok(())
}

impl TimerDefinition {
    /// Validate name, callback, and payload bounds
    pub fn validate(&self) -> Result<()> {
        validate_schedule(&self.name, &self.callback, self.payload.len())
    }
}

impl ReminderDefinition {
    /// Validate name, callback, and payload bounds
    pub fn validate(&self) -> Result<()> {
        validate_schedule(&self.name, &self.callback, self.payload.len())
    }
}

/// Timer mutation recorded during a turn, applied by the manager after the
/// turn completes (timer tables belong to the instance, not the context)
#[derive(Debug, Clone)]
pub enum TimerRequest {
    Register(TimerDefinition),
    Unregister(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(name: &str, callback: &str) -> TimerDefinition {
        TimerDefinition {
            name: name.into(),
            due_time_ms: 1000,
            period_ms: Some(10_000),
            callback: callback.into(),
            payload: Bytes::new(),
        }
    }

    #[test]
    fn test_valid_timer() {
        assert!(timer("tick", "on_tick").validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(timer("", "on_tick").validate().is_err());
    }

    #[test]
    fn test_empty_callback_rejected() {
        assert!(timer("tick", "").validate().is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut def = timer("tick", "on_tick");
        def.payload = Bytes::from(vec![0u8; SCHEDULE_PAYLOAD_SIZE_BYTES_MAX + 1]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_reminder_round_trips_through_json() {
        let def = ReminderDefinition {
            name: "r1".into(),
            due_time_ms: 0,
            period_ms: Some(10_000),
            callback: "on_remind".into(),
            payload: Bytes::from("payload"),
        };
        let json = serde_json::to_string(&def).unwrap();
        let back: ReminderDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "r1");
        assert_eq!(back.period_ms, Some(10_000));
        assert_eq!(back.payload, Bytes::from("payload"));
    }
}
