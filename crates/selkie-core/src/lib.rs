//! Selkie Core
//!
//! Core types, errors, and collaborator traits for the Selkie actor
//! framework.
//!
//! # Overview
//!
//! Selkie is a client-side virtual actor framework: application code defines
//! single-threaded, stateful, addressable actors, and the local runtime
//! coordinates their activation, turn-based dispatch, state persistence, and
//! scheduled invocations while delegating durable storage and cluster
//! placement to an external sidecar.
//!
//! This crate holds everything the other crates share: actor identities and
//! the behavior trait, the per-turn state change tracker, timer/reminder
//! definitions, the state store client trait, configuration, and errors.
//!
//! # TigerStyle
//!
//! - Explicit limits with big-endian naming (e.g., `ACTOR_ID_LENGTH_BYTES_MAX`)
//! - Assertions on invariants
//! - Bounded queues and batches, no silent drops

pub mod actor;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod scheduling;
pub mod state;
pub mod store;
pub mod telemetry;

pub use actor::{
    ActorBehavior, ActorContext, ActorFactory, ActorId, ActorTypeInfo, TurnEffects,
};
pub use config::ActorTypeConfig;
pub use constants::*;
pub use error::{Error, ErrorCategory, Result};
pub use io::{TimeProvider, WallClockTime};
pub use scheduling::{ReminderDefinition, TimerDefinition, TimerRequest};
pub use state::{StateChangeRecord, StateChangeTracker, StateOperation, TrackedRead};
pub use store::ActorStateStore;
pub use telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
