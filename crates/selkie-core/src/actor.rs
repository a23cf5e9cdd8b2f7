//! Actor abstractions for Selkie
//!
//! TigerStyle: Explicit types, assertions, bounded operations.

use crate::constants::*;
use crate::error::{Error, Result};
use crate::scheduling::{ReminderDefinition, TimerDefinition, TimerRequest};
use crate::state::{StateChangeRecord, StateChangeTracker, TrackedRead};
use crate::store::ActorStateStore;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// =============================================================================
// ActorId
// =============================================================================

/// Unique identifier for an actor within its type
///
/// The id is opaque to the runtime: any non-empty string up to
/// `ACTOR_ID_LENGTH_BYTES_MAX` bytes. Cross-type uniqueness is not required;
/// addressing is always by (type, id).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Create a new ActorId with validation
    ///
    /// # Errors
    /// Returns an error if the id is empty or exceeds the length limit.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::InvalidActorId {
                id,
                reason: "must not be empty".into(),
            });
        }

        if id.len() > ACTOR_ID_LENGTH_BYTES_MAX {
            let length = id.len();
            return Err(Error::InvalidActorId {
                id: id.chars().take(32).collect(),
                reason: format!(
                    "length {} exceeds limit {}",
                    length, ACTOR_ID_LENGTH_BYTES_MAX
                ),
            });
        }

        Ok(Self(id))
    }

    /// Create an ActorId without validation (for internal use only)
    #[doc(hidden)]
    pub fn new_unchecked(id: String) -> Self {
        debug_assert!(!id.is_empty());
        debug_assert!(id.len() <= ACTOR_ID_LENGTH_BYTES_MAX);
        Self(id)
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ActorBehavior
// =============================================================================

/// Behavior of one actor type — implement to create actors
///
/// Execution is guaranteed to be single-threaded per (type, id): the runtime
/// never runs two turns for the same actor concurrently, so implementations
/// need no locking of their own.
#[async_trait]
pub trait ActorBehavior: Send + 'static {
    /// Dispatch a method by name
    ///
    /// This is the actor's method table: match on `method` and return
    /// [`Error::MethodNotFound`] for names the actor does not expose. Timer
    /// and reminder callbacks arrive through the same table.
    async fn dispatch(
        &mut self,
        ctx: &mut ActorContext,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes>;

    /// Called once when the actor is activated, before its first turn
    ///
    /// An error aborts the activation; the instance is discarded.
    async fn on_activate(&mut self, _ctx: &mut ActorContext) -> Result<()> {
        Ok(())
    }

    /// Called when the actor is deactivated
    ///
    /// Best-effort: an error is logged and deactivation still completes.
    async fn on_deactivate(&mut self, _ctx: &mut ActorContext) -> Result<()> {
        Ok(())
    }
}

/// Factory constructing a behavior object for each activation
pub trait ActorFactory: Send + Sync + 'static {
    /// Create a fresh behavior object for the given id
    fn create(&self, id: &ActorId) -> Box<dyn ActorBehavior>;
}

impl<F> ActorFactory for F
where
    F: Fn(&ActorId) -> Box<dyn ActorBehavior> + Send + Sync + 'static,
{
    fn create(&self, id: &ActorId) -> Box<dyn ActorBehavior> {
        self(id)
    }
}

// =============================================================================
// ActorTypeInfo
// =============================================================================

/// Registration record for one actor type
///
/// Immutable after registration; registering the same type name twice fails.
pub struct ActorTypeInfo {
    type_name: String,
    factory: Arc<dyn ActorFactory>,
    config: Option<crate::config::ActorTypeConfig>,
}

impl ActorTypeInfo {
    /// Create a registration record with the runtime's default configuration
    pub fn new(type_name: impl Into<String>, factory: Arc<dyn ActorFactory>) -> Result<Self> {
        let type_name = type_name.into();

        if type_name.is_empty() || type_name.len() > ACTOR_TYPE_NAME_LENGTH_BYTES_MAX {
            return Err(Error::InvalidConfiguration {
                field: "type_name".into(),
                reason: format!(
                    "length {} outside (0, {}]",
                    type_name.len(),
                    ACTOR_TYPE_NAME_LENGTH_BYTES_MAX
                ),
            });
        }

        Ok(Self {
            type_name,
            factory,
            config: None,
        })
    }

    /// Override the per-type configuration
    pub fn with_config(mut self, config: crate::config::ActorTypeConfig) -> Result<Self> {
        config.validate()?;
        self.config = Some(config);
        Ok(self)
    }

    /// Get the type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Get the behavior factory
    pub fn factory(&self) -> Arc<dyn ActorFactory> {
        self.factory.clone()
    }

    /// Get the per-type configuration override, if any
    pub fn config(&self) -> Option<&crate::config::ActorTypeConfig> {
        self.config.as_ref()
    }
}

impl fmt::Debug for ActorTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorTypeInfo")
            .field("type_name", &self.type_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ActorContext
// =============================================================================

/// Context handed to a behavior for the duration of one turn
///
/// State reads are read-your-writes within the turn; writes and removals are
/// buffered in the [`StateChangeTracker`] and committed as one batch only
/// when the turn returns successfully. Timer mutations are buffered the same
/// way; reminder mutations go straight to the durable store.
pub struct ActorContext {
    actor_type: String,
    id: ActorId,
    store: Arc<dyn ActorStateStore>,
    tracker: StateChangeTracker,
    timer_requests: Vec<TimerRequest>,
}

/// Everything a turn produced besides its response payload
#[derive(Debug, Default)]
pub struct TurnEffects {
    /// State commit batch (empty when the turn touched no state)
    pub changes: Vec<StateChangeRecord>,
    /// Timer registrations/unregistrations to apply to the instance
    pub timer_requests: Vec<TimerRequest>,
}

impl ActorContext {
    /// Create a context for one turn
    pub fn new(actor_type: impl Into<String>, id: ActorId, store: Arc<dyn ActorStateStore>) -> Self {
        Self {
            actor_type: actor_type.into(),
            id,
            store,
            tracker: StateChangeTracker::new(),
            timer_requests: Vec::new(),
        }
    }

    /// The actor's type name
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// The actor's id
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Read a state value
    ///
    /// Sees this turn's own uncommitted writes first, then the store.
    pub async fn get_state(&mut self, key: &str) -> Result<Option<Bytes>> {
        debug_assert!(!key.is_empty(), "state key must not be empty");

        match self.tracker.read(key) {
            TrackedRead::Value(value) => Ok(Some(value)),
            TrackedRead::Removed => Ok(None),
            TrackedRead::Untracked => {
                let loaded = self.store.get_state(&self.actor_type, &self.id, key).await?;
                if let Some(value) = &loaded {
                    self.tracker.note_loaded(key, value.clone());
                }
                Ok(loaded)
            }
        }
    }

    /// Check whether a state key exists from this turn's perspective
    pub async fn contains_state(&mut self, key: &str) -> Result<bool> {
        match self.tracker.read(key) {
            TrackedRead::Value(_) => Ok(true),
            TrackedRead::Removed => Ok(false),
            TrackedRead::Untracked => {
                self.store
                    .contains_state(&self.actor_type, &self.id, key)
                    .await
            }
        }
    }

    /// Buffer a state write; committed only if the turn succeeds
    pub fn set_state(&mut self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.tracker.set(key, value.into());
    }

    /// Buffer a state removal
    ///
    /// Returns whether a removal was recorded (false when the key exists
    /// neither in this turn nor in the store).
    pub async fn remove_state(&mut self, key: &str) -> Result<bool> {
        if self.tracker.remove(key) {
            return Ok(true);
        }
        if self
            .store
            .contains_state(&self.actor_type, &self.id, key)
            .await?
        {
            self.tracker.mark_removed(key);
            return Ok(true);
        }
        Ok(false)
    }

    /// Register a transient timer on this instance (replaces by name)
    ///
    /// Applied by the manager when the turn completes, success or failure.
    pub fn register_timer(&mut self, timer: TimerDefinition) -> Result<()> {
        timer.validate()?;
        self.timer_requests.push(TimerRequest::Register(timer));
        Ok(())
    }

    /// Unregister a transient timer by name
    pub fn unregister_timer(&mut self, name: impl Into<String>) {
        self.timer_requests.push(TimerRequest::Unregister(name.into()));
    }

    /// Persist a durable reminder (replaces by name)
    ///
    /// Goes straight to the store; unlike state, reminder registration is
    /// not rolled back when the turn fails.
    pub async fn register_reminder(&mut self, reminder: ReminderDefinition) -> Result<()> {
        reminder.validate()?;
        self.store
            .register_reminder(&self.actor_type, &self.id, reminder)
            .await
    }

    /// Delete a durable reminder by name
    pub async fn unregister_reminder(&mut self, name: &str) -> Result<()> {
        self.store
            .unregister_reminder(&self.actor_type, &self.id, name)
            .await
    }

    /// Consume the context, yielding the turn's buffered effects
    pub fn finish(mut self) -> TurnEffects {
        TurnEffects {
            changes: self.tracker.take_changes(),
            timer_requests: self.timer_requests,
        }
    }
}
