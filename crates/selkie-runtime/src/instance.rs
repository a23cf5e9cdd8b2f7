//! Activated actor instances
//!
//! TigerStyle: Explicit lifecycle states, one instance per (type, id).
//!
//! An `ActorInstance` exists from activation to removal. The mutable parts a
//! turn touches (the behavior object) sit behind an async mutex that is only
//! ever locked while holding the id's turn permit, so it is uncontended in
//! practice; the timer table and bookkeeping fields use short locks and
//! atomics so registration and idle scans never wait behind a running turn.

use selkie_core::{ActorBehavior, ActorId, TimerDefinition, TimerRequest};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

/// Lifecycle state of an activated instance
///
/// `Unactivated` is represented by absence from the manager's table. While a
/// turn is in flight the instance cannot skip `Deactivating`: deactivation
/// first drains the turn, then transitions.
///
/// ```text
/// (absent) --activate--> Active --deactivate--> Deactivating --> Removed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Accepting turns
    Active = 0,
    /// Draining; the deactivation hook may be running
    Deactivating = 1,
    /// Gone; the table entry is stale and about to disappear
    Removed = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Active,
            1 => Self::Deactivating,
            _ => Self::Removed,
        }
    }

    /// Check if a transition is valid
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Deactivating)
                | (Self::Deactivating, Self::Removed)
                | (Self::Active, Self::Active)
                | (Self::Deactivating, Self::Deactivating)
                | (Self::Removed, Self::Removed)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Deactivating => write!(f, "deactivating"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// Turn-guarded mutable part of an instance
pub(crate) struct InstanceInner {
    /// The user behavior object
    pub behavior: Box<dyn ActorBehavior>,
    /// Whether the activation hook has run
    pub activated: bool,
}

/// One activated actor: identity, behavior, timers, bookkeeping
pub struct ActorInstance {
    type_name: String,
    id: ActorId,
    lifecycle: AtomicU8,
    /// Wall-clock ms of the last completed turn (or activation)
    last_active_ms: AtomicU64,
    /// Transient timers; lost when the instance is removed
    timers: Mutex<HashMap<String, TimerDefinition>>,
    pub(crate) inner: tokio::sync::Mutex<InstanceInner>,
}

impl ActorInstance {
    /// Create an instance in the `Active` state with a pending activation hook
    pub(crate) fn new(
        type_name: impl Into<String>,
        id: ActorId,
        behavior: Box<dyn ActorBehavior>,
        now_ms: u64,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            lifecycle: AtomicU8::new(LifecycleState::Active as u8),
            last_active_ms: AtomicU64::new(now_ms),
            timers: Mutex::new(HashMap::new()),
            inner: tokio::sync::Mutex::new(InstanceInner {
                behavior,
                activated: false,
            }),
        }
    }

    /// The actor's type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The actor's id
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> LifecycleState {
        LifecycleState::from_u8(self.lifecycle.load(Ordering::SeqCst))
    }

    /// Transition to the next state; false when the transition is invalid
    pub(crate) fn transition(&self, next: LifecycleState) -> bool {
        let current = self.lifecycle();
        if !current.can_transition_to(next) {
            return false;
        }
        self.lifecycle.store(next as u8, Ordering::SeqCst);
        true
    }

    /// Whether the instance has been removed (table entry is stale)
    pub fn is_removed(&self) -> bool {
        self.lifecycle() == LifecycleState::Removed
    }

    /// Mark a never-activated instance removed after a failed activation
    /// hook, so queued callers re-resolve instead of running turns on it
    pub(crate) fn discard(&self) {
        self.lifecycle
            .store(LifecycleState::Removed as u8, Ordering::SeqCst);
    }

    /// Record activity (called after every turn)
    pub(crate) fn touch(&self, now_ms: u64) {
        self.last_active_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Wall-clock ms of the last activity
    pub fn last_active_ms(&self) -> u64 {
        self.last_active_ms.load(Ordering::SeqCst)
    }

    /// Idle time relative to `now_ms`
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_active_ms())
    }

    /// Register or replace a transient timer
    pub(crate) fn set_timer(&self, timer: TimerDefinition) {
        debug_assert!(!timer.name.is_empty());
        self.timers.lock().unwrap().insert(timer.name.clone(), timer);
    }

    /// Remove a transient timer; false when the name was unknown
    pub(crate) fn remove_timer(&self, name: &str) -> bool {
        self.timers.lock().unwrap().remove(name).is_some()
    }

    /// Look up a transient timer by name
    pub(crate) fn timer(&self, name: &str) -> Option<TimerDefinition> {
        self.timers.lock().unwrap().get(name).cloned()
    }

    /// Number of registered transient timers
    pub fn timer_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }

    /// Apply timer mutations a turn buffered in its context
    pub(crate) fn apply_timer_requests(&self, requests: Vec<TimerRequest>) {
        if requests.is_empty() {
            return;
        }
        let mut timers = self.timers.lock().unwrap();
        for request in requests {
            match request {
                TimerRequest::Register(timer) => {
                    timers.insert(timer.name.clone(), timer);
                }
                TimerRequest::Unregister(name) => {
                    timers.remove(&name);
                }
            }
        }
    }
}

impl fmt::Debug for ActorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInstance")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .field("last_active_ms", &self.last_active_ms())
            .finish_non_exhaustive()
    }
}
