//! Actor manager
//!
//! TigerStyle: One manager per actor type, short table locks, long turn
//! slots, no silent partial state.
//!
//! The manager owns every activated instance of one actor type: activation,
//! deactivation, method invocation, timer and reminder plumbing, state
//! commit, and the idle sweep. Table membership is guarded by a short
//! `std::sync::Mutex`, separate from the per-id turn slot, so instance
//! creation and removal never block unrelated turns.

use crate::instance::{ActorInstance, LifecycleState};
use crate::turn::{TurnPermit, TurnScheduler};
use bytes::Bytes;
use selkie_core::constants::{ACTOR_CONCURRENT_COUNT_MAX, TURN_LOOKUP_RETRY_COUNT_MAX};
use selkie_core::{
    ActorContext, ActorFactory, ActorId, ActorStateStore, ActorTypeConfig, Error,
    ReminderDefinition, Result, TimeProvider, TimerDefinition, WallClockTime,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle and invocation for all instances of one actor type
pub struct ActorManager {
    type_name: String,
    factory: Arc<dyn ActorFactory>,
    config: ActorTypeConfig,
    store: Arc<dyn ActorStateStore>,
    /// Activated instances; membership changes hold this lock only briefly
    instances: Mutex<HashMap<String, Arc<ActorInstance>>>,
    turns: TurnScheduler,
    time: Arc<dyn TimeProvider>,
}

impl ActorManager {
    /// Create a manager using the wall clock
    pub fn new(
        type_name: impl Into<String>,
        factory: Arc<dyn ActorFactory>,
        config: ActorTypeConfig,
        store: Arc<dyn ActorStateStore>,
    ) -> Self {
        Self::with_time(type_name, factory, config, store, Arc::new(WallClockTime::new()))
    }

    /// Create a manager with a custom time provider (for deterministic tests)
    pub fn with_time(
        type_name: impl Into<String>,
        factory: Arc<dyn ActorFactory>,
        config: ActorTypeConfig,
        store: Arc<dyn ActorStateStore>,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        let type_name = type_name.into();
        debug_assert!(!type_name.is_empty());
        debug_assert!(config.validate().is_ok(), "config validated at registration");

        Self {
            type_name,
            factory,
            config,
            store,
            instances: Mutex::new(HashMap::new()),
            turns: TurnScheduler::new(),
            time,
        }
    }

    /// The actor type this manager serves
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The manager's effective configuration
    pub fn config(&self) -> &ActorTypeConfig {
        &self.config
    }

    /// Number of activated instances
    pub fn active_count(&self) -> usize {
        self.instances.lock().unwrap().len()
    }

    /// Whether the given id is currently activated
    pub fn is_active(&self, id: &ActorId) -> bool {
        self.instances.lock().unwrap().contains_key(id.as_str())
    }

    fn lookup(&self, id: &ActorId) -> Option<Arc<ActorInstance>> {
        self.instances.lock().unwrap().get(id.as_str()).cloned()
    }

    /// Insert a fresh instance; fails when the id is already present
    fn insert_new(&self, id: &ActorId) -> Result<Arc<ActorInstance>> {
        let behavior = self.factory.create(id);
        let cell = Arc::new(ActorInstance::new(
            self.type_name.as_str(),
            id.clone(),
            behavior,
            self.time.now_ms(),
        ));

        let mut instances = self.instances.lock().unwrap();
        if instances.len() >= ACTOR_CONCURRENT_COUNT_MAX {
            return Err(Error::internal(format!(
                "instance limit reached for type {}: {}",
                self.type_name, ACTOR_CONCURRENT_COUNT_MAX
            )));
        }
        if instances.contains_key(id.as_str()) {
            return Err(Error::ActorAlreadyActive {
                type_name: self.type_name.clone(),
                id: id.to_string(),
            });
        }
        instances.insert(id.as_str().to_string(), cell.clone());
        Ok(cell)
    }

    /// Remove the table entry iff it still points at this cell
    fn remove_if_same(&self, id: &ActorId, cell: &Arc<ActorInstance>) {
        let mut instances = self.instances.lock().unwrap();
        if let Some(current) = instances.get(id.as_str()) {
            if Arc::ptr_eq(current, cell) {
                instances.remove(id.as_str());
            }
        }
    }

    /// Explicitly activate an actor
    ///
    /// Fails with `ActorAlreadyActive` when an instance exists — the sidecar
    /// never double-activates, so idempotent re-activation is not supported.
    /// An error from the `on_activate` hook discards the instance.
    #[instrument(skip(self), fields(actor_type = %self.type_name, actor_id = %id), level = "info")]
    pub async fn activate(&self, id: &ActorId) -> Result<()> {
        let cell = self.insert_new(id)?;
        let permit = self.turns.acquire(id).await?;

        if cell.is_removed() {
            return Err(Error::actor_not_active(&self.type_name, id.as_str()));
        }

        let result = self.ensure_activated(&cell).await;
        if let Err(e) = result {
            // Discard before releasing the turn so queued callers re-resolve.
            cell.discard();
            self.remove_if_same(id, &cell);
            drop(permit);
            return Err(e);
        }
        drop(permit);
        Ok(())
    }

    /// Run the activation hook once per instance; caller holds the turn permit
    async fn ensure_activated(&self, cell: &Arc<ActorInstance>) -> Result<()> {
        let mut inner = cell.inner.lock().await;
        if inner.activated {
            return Ok(());
        }

        let mut ctx = ActorContext::new(
            self.type_name.as_str(),
            cell.id().clone(),
            self.store.clone(),
        );
        let hook = inner.behavior.on_activate(&mut ctx).await;
        let effects = ctx.finish();

        match hook {
            Ok(()) => {
                if !effects.changes.is_empty() {
                    self.store
                        .save_state(&self.type_name, cell.id(), &effects.changes)
                        .await?;
                }
                cell.apply_timer_requests(effects.timer_requests);
                inner.activated = true;
                cell.touch(self.time.now_ms());
                info!(actor_id = %cell.id(), "actor activated");
                Ok(())
            }
            Err(e) => {
                error!(actor_id = %cell.id(), error = %e, "on_activate failed, activation aborted");
                Err(e)
            }
        }
    }

    /// Invoke a method on an actor
    ///
    /// Activates the instance lazily on first call unless
    /// `require_explicit_activation` is set. The turn slot is released on
    /// every path, success or error; state changes are committed only on
    /// success.
    #[instrument(skip(self, payload), fields(actor_type = %self.type_name, actor_id = %id, method), level = "debug")]
    pub async fn invoke_method(&self, id: &ActorId, method: &str, payload: Bytes) -> Result<Bytes> {
        debug_assert!(!method.is_empty(), "method name must not be empty");
        self.execute_turn(id, method, payload).await
    }

    /// Acquire the id's turn and run one unit of work (method, reminder)
    async fn execute_turn(&self, id: &ActorId, method: &str, payload: Bytes) -> Result<Bytes> {
        // Bounded retry: an instance can be removed between table lookup and
        // turn acquisition (concurrent deactivation); re-resolve and go again.
        for _attempt in 0..TURN_LOOKUP_RETRY_COUNT_MAX {
            let cell = match self.lookup(id) {
                Some(cell) => cell,
                None => {
                    if self.config.require_explicit_activation {
                        return Err(Error::actor_not_active(&self.type_name, id.as_str()));
                    }
                    match self.insert_new(id) {
                        Ok(cell) => cell,
                        // Another caller inserted first; pick theirs up.
                        Err(Error::ActorAlreadyActive { .. }) => continue,
                        Err(e) => return Err(e),
                    }
                }
            };

            let permit = self.turns.acquire(id).await?;
            if cell.is_removed() {
                drop(permit);
                continue;
            }

            if let Err(e) = self.ensure_activated(&cell).await {
                cell.discard();
                self.remove_if_same(id, &cell);
                drop(permit);
                return Err(e);
            }

            return self.run_turn(&cell, method, payload, permit).await;
        }

        Err(Error::internal(format!(
            "actor {}/{} kept disappearing during turn acquisition",
            self.type_name, id
        )))
    }

    /// Run one turn; the permit is held for the duration and released on exit
    async fn run_turn(
        &self,
        cell: &Arc<ActorInstance>,
        method: &str,
        payload: Bytes,
        permit: TurnPermit,
    ) -> Result<Bytes> {
        let mut inner = cell.inner.lock().await;
        debug_assert!(inner.activated, "turn before activation hook");
        debug_assert_eq!(cell.lifecycle(), LifecycleState::Active);

        let started_ms = self.time.monotonic_ms();
        let mut ctx = ActorContext::new(
            self.type_name.as_str(),
            cell.id().clone(),
            self.store.clone(),
        );
        let result = inner.behavior.dispatch(&mut ctx, method, payload).await;
        let effects = ctx.finish();

        // Timer mutations apply regardless of turn outcome; they are not
        // part of the state commit batch.
        cell.apply_timer_requests(effects.timer_requests);
        cell.touch(self.time.now_ms());

        let duration_ms = self.time.monotonic_ms().saturating_sub(started_ms);
        let outcome = match result {
            Ok(response) => {
                if !effects.changes.is_empty() {
                    self.store
                        .save_state(&self.type_name, cell.id(), &effects.changes)
                        .await?;
                }
                debug!(actor_id = %cell.id(), method, duration_ms, "turn completed");
                Ok(response)
            }
            Err(e) => {
                debug!(
                    actor_id = %cell.id(),
                    method,
                    duration_ms,
                    discarded_changes = effects.changes.len(),
                    error = %e,
                    "turn failed, state changes discarded"
                );
                Err(e)
            }
        };

        drop(permit);
        outcome
    }

    /// Register or replace a transient timer on an activated instance
    pub fn register_timer(&self, id: &ActorId, timer: TimerDefinition) -> Result<()> {
        timer.validate()?;
        let cell = self
            .lookup(id)
            .ok_or_else(|| Error::actor_not_active(&self.type_name, id.as_str()))?;
        cell.set_timer(timer);
        Ok(())
    }

    /// Remove a transient timer; unknown names are a no-op
    pub fn unregister_timer(&self, id: &ActorId, name: &str) -> Result<()> {
        let cell = self
            .lookup(id)
            .ok_or_else(|| Error::actor_not_active(&self.type_name, id.as_str()))?;
        cell.remove_timer(name);
        Ok(())
    }

    /// Fire a transient timer as a turn
    ///
    /// Timers die with their instance, so firing against an inactive id is a
    /// stale callback and fails with `ActorNotActive`. A one-shot timer is
    /// removed after a successful fire; errors keep it registered so the
    /// scheduler may retry.
    #[instrument(skip(self), fields(actor_type = %self.type_name, actor_id = %id, timer = name), level = "debug")]
    pub async fn fire_timer(&self, id: &ActorId, name: &str) -> Result<()> {
        let cell = self
            .lookup(id)
            .ok_or_else(|| Error::actor_not_active(&self.type_name, id.as_str()))?;

        let permit = self.turns.acquire(id).await?;
        if cell.is_removed() {
            return Err(Error::actor_not_active(&self.type_name, id.as_str()));
        }
        if let Err(e) = self.ensure_activated(&cell).await {
            cell.discard();
            self.remove_if_same(id, &cell);
            return Err(e);
        }

        let timer = cell.timer(name).ok_or_else(|| Error::TimerNotFound {
            id: id.to_string(),
            name: name.to_string(),
        })?;

        let result = self
            .run_turn(&cell, &timer.callback, timer.payload.clone(), permit)
            .await;

        if result.is_ok() && timer.period_ms.is_none() {
            cell.remove_timer(name);
        }
        result.map(|_| ())
    }

    /// Persist a durable reminder definition via the store
    pub async fn register_reminder(&self, id: &ActorId, reminder: ReminderDefinition) -> Result<()> {
        reminder.validate()?;
        self.store
            .register_reminder(&self.type_name, id, reminder)
            .await
    }

    /// Delete a durable reminder definition via the store
    pub async fn unregister_reminder(&self, id: &ActorId, name: &str) -> Result<()> {
        self.store
            .unregister_reminder(&self.type_name, id, name)
            .await
    }

    /// Fire a durable reminder as a turn
    ///
    /// Reminders survive deactivation, so firing reactivates the instance if
    /// needed. The callback binding comes from the persisted definition; the
    /// payload is the one delivered with the firing.
    #[instrument(skip(self, payload), fields(actor_type = %self.type_name, actor_id = %id, reminder = name), level = "debug")]
    pub async fn fire_reminder(&self, id: &ActorId, name: &str, payload: Bytes) -> Result<()> {
        let reminder = self
            .store
            .get_reminder(&self.type_name, id, name)
            .await?
            .ok_or_else(|| Error::ReminderNotFound {
                id: id.to_string(),
                name: name.to_string(),
            })?;

        self.execute_turn(id, &reminder.callback, payload)
            .await
            .map(|_| ())
    }

    /// Deactivate an actor, draining any in-flight turn first
    ///
    /// Never interrupts a running turn: waits up to
    /// `drain_ongoing_call_timeout_ms`, then gives up with `DrainTimeout`.
    /// The `on_deactivate` hook is best-effort; deactivation always
    /// completes once the drain succeeded.
    #[instrument(skip(self), fields(actor_type = %self.type_name, actor_id = %id), level = "info")]
    pub async fn deactivate(&self, id: &ActorId) -> Result<()> {
        self.deactivate_with_drain(id, true).await
    }

    async fn deactivate_with_drain(&self, id: &ActorId, wait_for_turn: bool) -> Result<()> {
        let cell = self
            .lookup(id)
            .ok_or_else(|| Error::actor_not_active(&self.type_name, id.as_str()))?;

        let timeout_ms = self.config.drain_ongoing_call_timeout_ms;
        let permit = if wait_for_turn {
            match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                self.turns.acquire(id),
            )
            .await
            {
                Ok(acquired) => acquired?,
                Err(_elapsed) => {
                    warn!(actor_id = %id, timeout_ms, "drain timed out, actor stays active");
                    return Err(Error::DrainTimeout {
                        id: id.to_string(),
                        timeout_ms,
                    });
                }
            }
        } else {
            match self.turns.try_acquire(id) {
                Some(permit) => permit,
                None => {
                    return Err(Error::DrainTimeout {
                        id: id.to_string(),
                        timeout_ms: 0,
                    })
                }
            }
        };

        if cell.is_removed() {
            return Err(Error::actor_not_active(&self.type_name, id.as_str()));
        }

        let transitioned = cell.transition(LifecycleState::Deactivating);
        debug_assert!(transitioned, "deactivation from non-active state");

        {
            let mut inner = cell.inner.lock().await;
            if inner.activated {
                let mut ctx = ActorContext::new(
                    self.type_name.as_str(),
                    cell.id().clone(),
                    self.store.clone(),
                );
                match inner.behavior.on_deactivate(&mut ctx).await {
                    Ok(()) => {
                        let effects = ctx.finish();
                        if !effects.changes.is_empty() {
                            if let Err(e) = self
                                .store
                                .save_state(&self.type_name, cell.id(), &effects.changes)
                                .await
                            {
                                warn!(
                                    actor_id = %id,
                                    error = %e,
                                    "state flush during deactivation failed"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!(actor_id = %id, error = %e, "on_deactivate hook failed");
                    }
                }
            }
        }

        let removed = cell.transition(LifecycleState::Removed);
        debug_assert!(removed);
        self.remove_if_same(id, &cell);
        drop(permit);

        info!(actor_id = %id, "actor deactivated");
        Ok(())
    }

    /// Drain and deactivate every instance of this type
    ///
    /// Used at process shutdown and rebalance. When
    /// `drain_rebalanced_actors` is false the drain wait is skipped and busy
    /// instances report a drain failure instead of waiting. Never partial:
    /// every instance is either fully deactivated or named in the error.
    #[instrument(skip(self), fields(actor_type = %self.type_name), level = "info")]
    pub async fn deactivate_all(&self) -> Result<()> {
        let ids: Vec<ActorId> = {
            let instances = self.instances.lock().unwrap();
            instances.values().map(|cell| cell.id().clone()).collect()
        };

        let mut failed = Vec::new();
        for id in ids {
            match self
                .deactivate_with_drain(&id, self.config.drain_rebalanced_actors)
                .await
            {
                Ok(()) => {}
                // Already gone (raced with idle sweep or an explicit call).
                Err(Error::ActorNotActive { .. }) => {}
                Err(e) => {
                    warn!(actor_id = %id, error = %e, "deactivation failed");
                    failed.push(id.to_string());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::DeactivationIncomplete { failed })
        }
    }

    /// Deactivate instances idle for at least the configured timeout
    ///
    /// Returns the number of instances deactivated. An instance with a
    /// running or queued turn is not idle, whatever its timestamp says.
    pub async fn sweep_idle(&self) -> usize {
        let now_ms = self.time.now_ms();
        let idle_timeout_ms = self.config.idle_timeout_ms;

        let candidates: Vec<ActorId> = {
            let instances = self.instances.lock().unwrap();
            instances
                .values()
                .filter(|cell| {
                    cell.lifecycle() == LifecycleState::Active
                        && cell.idle_ms(now_ms) >= idle_timeout_ms
                })
                .map(|cell| cell.id().clone())
                .collect()
        };

        let mut deactivated = 0;
        for id in candidates {
            if !self.turns.is_idle(&id) {
                continue;
            }
            match self.deactivate_with_drain(&id, true).await {
                Ok(()) => deactivated += 1,
                Err(Error::ActorNotActive { .. }) => {}
                Err(e) => {
                    debug!(actor_id = %id, error = %e, "idle deactivation skipped");
                }
            }
        }

        if deactivated > 0 {
            debug!(actor_type = %self.type_name, deactivated, "idle sweep");
        }
        deactivated
    }

    /// Spawn the periodic idle sweep for this manager
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = Duration::from_millis(self.config.scan_interval_ms.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; nothing can be idle yet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep_idle().await;
            }
        })
    }
}
