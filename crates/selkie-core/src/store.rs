//! State store client trait
//!
//! The collaborator interface the runtime uses to reach durable actor state
//! and reminder definitions. Implementations talk to the sidecar's state API
//! over whatever transport they like; the runtime only sees this trait and
//! treats values as opaque bytes.

use crate::actor::ActorId;
use crate::error::Result;
use crate::scheduling::ReminderDefinition;
use crate::state::StateChangeRecord;
use async_trait::async_trait;
use bytes::Bytes;

/// Client for the external actor state store
///
/// Failures surface as [`Error::StateStore`] carrying the operation and key
/// that failed.
///
/// [`Error::StateStore`]: crate::error::Error::StateStore
#[async_trait]
pub trait ActorStateStore: Send + Sync {
    /// Commit a turn's state changes as one all-or-nothing batch
    async fn save_state(
        &self,
        actor_type: &str,
        id: &ActorId,
        changes: &[StateChangeRecord],
    ) -> Result<()>;

    /// Read a single state value
    async fn get_state(&self, actor_type: &str, id: &ActorId, key: &str) -> Result<Option<Bytes>>;

    /// Check whether a state key exists
    async fn contains_state(&self, actor_type: &str, id: &ActorId, key: &str) -> Result<bool> {
        Ok(self.get_state(actor_type, id, key).await?.is_some())
    }

    /// Persist a reminder definition (replaces an existing one by name)
    async fn register_reminder(
        &self,
        actor_type: &str,
        id: &ActorId,
        reminder: ReminderDefinition,
    ) -> Result<()>;

    /// Delete a reminder definition; unknown names are a no-op
    async fn unregister_reminder(&self, actor_type: &str, id: &ActorId, name: &str) -> Result<()>;

    /// Fetch a reminder definition, e.g. to resolve a firing reminder's
    /// callback binding
    async fn get_reminder(
        &self,
        actor_type: &str,
        id: &ActorId,
        name: &str,
    ) -> Result<Option<ReminderDefinition>>;
}
