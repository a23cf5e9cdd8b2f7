//! Selkie Runtime
//!
//! Actor runtime, per-type managers, and turn-based dispatch for Selkie
//! virtual actors.
//!
//! # Overview
//!
//! The runtime provides:
//! - Single-threaded, FIFO-fair turn execution per actor id
//! - On-demand (lazy) actor activation
//! - All-or-nothing state commit per turn
//! - Transient timers and durable reminders as uniform turn units
//! - Graceful drain on deactivation and shutdown
//!
//! # TigerStyle
//! - One instance per (type, id), one turn at a time
//! - Explicit lifecycle states
//! - Bounded turn queues (no silent drops)

pub mod instance;
pub mod manager;
pub mod runtime;
pub mod turn;

pub use instance::{ActorInstance, LifecycleState};
pub use manager::ActorManager;
pub use runtime::ActorRuntime;
pub use turn::{TurnPermit, TurnScheduler};
