//! In-memory state store
//!
//! For tests, local runs, and simulations. Batches are applied under a
//! single write lock, so a committed turn is visible all-or-nothing, the
//! same contract a sidecar-backed store provides transactionally.

use async_trait::async_trait;
use bytes::Bytes;
use selkie_core::{
    ActorId, ActorStateStore, ReminderDefinition, Result, StateChangeRecord, StateOperation,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;

/// Per-actor state: key -> value
type ActorData = HashMap<String, Bytes>;

/// Store data: "type/id" -> actor data
type StoreData = HashMap<String, ActorData>;

/// Reminder data: "type/id" -> (name -> definition)
type ReminderData = HashMap<String, HashMap<String, ReminderDefinition>>;

/// In-memory actor state store
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    data: Arc<RwLock<StoreData>>,
    reminders: Arc<RwLock<ReminderData>>,
}

impl MemoryStateStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn actor_key(actor_type: &str, id: &ActorId) -> String {
        format!("{}/{}", actor_type, id)
    }

    /// Number of state keys stored for one actor (test observability)
    pub async fn state_key_count(&self, actor_type: &str, id: &ActorId) -> usize {
        self.data
            .read()
            .await
            .get(&Self::actor_key(actor_type, id))
            .map(|d| d.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ActorStateStore for MemoryStateStore {
    #[instrument(skip(self, changes), fields(actor_type, actor_id = %id, batch = changes.len()))]
    async fn save_state(
        &self,
        actor_type: &str,
        id: &ActorId,
        changes: &[StateChangeRecord],
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // One write lock for the whole batch: all-or-nothing visibility.
        let mut data = self.data.write().await;
        let actor_data = data.entry(Self::actor_key(actor_type, id)).or_default();

        for change in changes {
            match change.operation {
                StateOperation::Add | StateOperation::Update => {
                    debug_assert!(change.value.is_some(), "add/update carries a value");
                    actor_data.insert(
                        change.key.clone(),
                        change.value.clone().unwrap_or_default(),
                    );
                }
                StateOperation::Remove => {
                    actor_data.remove(&change.key);
                }
            }
        }

        Ok(())
    }

    #[instrument(skip(self), fields(actor_type, actor_id = %id, key))]
    async fn get_state(&self, actor_type: &str, id: &ActorId, key: &str) -> Result<Option<Bytes>> {
        Ok(self
            .data
            .read()
            .await
            .get(&Self::actor_key(actor_type, id))
            .and_then(|actor_data| actor_data.get(key))
            .cloned())
    }

    #[instrument(skip(self, reminder), fields(actor_type, actor_id = %id, name = %reminder.name))]
    async fn register_reminder(
        &self,
        actor_type: &str,
        id: &ActorId,
        reminder: ReminderDefinition,
    ) -> Result<()> {
        self.reminders
            .write()
            .await
            .entry(Self::actor_key(actor_type, id))
            .or_default()
            .insert(reminder.name.clone(), reminder);
        Ok(())
    }

    #[instrument(skip(self), fields(actor_type, actor_id = %id, name))]
    async fn unregister_reminder(&self, actor_type: &str, id: &ActorId, name: &str) -> Result<()> {
        if let Some(actor_reminders) = self
            .reminders
            .write()
            .await
            .get_mut(&Self::actor_key(actor_type, id))
        {
            actor_reminders.remove(name);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(actor_type, actor_id = %id, name))]
    async fn get_reminder(
        &self,
        actor_type: &str,
        id: &ActorId,
        name: &str,
    ) -> Result<Option<ReminderDefinition>> {
        Ok(self
            .reminders
            .read()
            .await
            .get(&Self::actor_key(actor_type, id))
            .and_then(|actor_reminders| actor_reminders.get(name))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, operation: StateOperation, value: Option<&str>) -> StateChangeRecord {
        StateChangeRecord {
            key: key.into(),
            operation,
            value: value.map(|v| Bytes::copy_from_slice(v.as_bytes())),
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemoryStateStore::new();
        let id = ActorId::new("c1").unwrap();

        store
            .save_state(
                "Counter",
                &id,
                &[record("count", StateOperation::Add, Some("5"))],
            )
            .await
            .unwrap();

        let value = store.get_state("Counter", &id, "count").await.unwrap();
        assert_eq!(value, Some(Bytes::from("5")));
        assert!(store.contains_state("Counter", &id, "count").await.unwrap());
    }

    #[tokio::test]
    async fn test_batch_applies_together() {
        let store = MemoryStateStore::new();
        let id = ActorId::new("c1").unwrap();

        store
            .save_state(
                "Counter",
                &id,
                &[
                    record("a", StateOperation::Add, Some("1")),
                    record("b", StateOperation::Add, Some("2")),
                ],
            )
            .await
            .unwrap();
        store
            .save_state(
                "Counter",
                &id,
                &[
                    record("a", StateOperation::Remove, None),
                    record("b", StateOperation::Update, Some("3")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.get_state("Counter", &id, "a").await.unwrap(), None);
        assert_eq!(
            store.get_state("Counter", &id, "b").await.unwrap(),
            Some(Bytes::from("3"))
        );
        assert_eq!(store.state_key_count("Counter", &id).await, 1);
    }

    #[tokio::test]
    async fn test_actors_are_isolated() {
        let store = MemoryStateStore::new();
        let c1 = ActorId::new("c1").unwrap();
        let c2 = ActorId::new("c2").unwrap();

        store
            .save_state(
                "Counter",
                &c1,
                &[record("count", StateOperation::Add, Some("1"))],
            )
            .await
            .unwrap();

        assert_eq!(store.get_state("Counter", &c2, "count").await.unwrap(), None);
        // Same id under a different type is a different actor.
        assert_eq!(store.get_state("Gauge", &c1, "count").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reminder_lifecycle() {
        let store = MemoryStateStore::new();
        let id = ActorId::new("c1").unwrap();
        let def = ReminderDefinition {
            name: "r1".into(),
            due_time_ms: 0,
            period_ms: Some(10_000),
            callback: "on_remind".into(),
            payload: Bytes::from("p"),
        };

        store
            .register_reminder("Counter", &id, def.clone())
            .await
            .unwrap();

        let loaded = store
            .get_reminder("Counter", &id, "r1")
            .await
            .unwrap()
            .expect("reminder should exist");
        assert_eq!(loaded.callback, "on_remind");

        store.unregister_reminder("Counter", &id, "r1").await.unwrap();
        assert!(store.get_reminder("Counter", &id, "r1").await.unwrap().is_none());

        // Unknown names are a no-op.
        store.unregister_reminder("Counter", &id, "r1").await.unwrap();
    }
}
