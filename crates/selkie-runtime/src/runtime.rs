//! Actor runtime
//!
//! TigerStyle: Explicit construction and shutdown, no global singleton.
//!
//! The runtime is the process-wide entry point: actor types register here,
//! and the inbound `dispatch_*` methods route calls originating from the
//! sidecar to the matching per-type manager. Construct one per process (or
//! one per test — instances are fully isolated) and call [`shutdown`] when
//! the process drains.
//!
//! [`shutdown`]: ActorRuntime::shutdown

use crate::manager::ActorManager;
use bytes::Bytes;
use selkie_core::{
    ActorId, ActorStateStore, ActorTypeConfig, ActorTypeInfo, Error, Result,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Process-wide actor type registry and dispatch router
///
/// Registration is write-once per type; dispatch is safe to call
/// concurrently from any number of callers. Calls for different (type, id)
/// pairs proceed fully in parallel; calls for the same pair are serialized
/// by the manager's turn scheduler, not here.
pub struct ActorRuntime {
    store: Arc<dyn ActorStateStore>,
    default_config: ActorTypeConfig,
    types: RwLock<HashMap<String, Arc<ActorTypeInfo>>>,
    /// Managers, created lazily on first dispatch for a registered type
    managers: Mutex<HashMap<String, Arc<ActorManager>>>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
}

impl ActorRuntime {
    /// Create a runtime with default per-type configuration
    pub fn new(store: Arc<dyn ActorStateStore>) -> Self {
        Self::with_config(store, ActorTypeConfig::default())
    }

    /// Create a runtime whose default configuration applies to every type
    /// registered without an explicit override
    pub fn with_config(store: Arc<dyn ActorStateStore>, default_config: ActorTypeConfig) -> Self {
        debug_assert!(default_config.validate().is_ok());

        Self {
            store,
            default_config,
            types: RwLock::new(HashMap::new()),
            managers: Mutex::new(HashMap::new()),
            sweepers: Mutex::new(Vec::new()),
        }
    }

    /// The default configuration used for types without an override
    pub fn config(&self) -> &ActorTypeConfig {
        &self.default_config
    }

    /// Register an actor type
    ///
    /// One-time per runtime lifetime; registering the same type name again
    /// fails with `DuplicateActorType`.
    pub fn register_actor(&self, type_info: ActorTypeInfo) -> Result<()> {
        if let Some(config) = type_info.config() {
            config.validate()?;
        }

        let mut types = self.types.write().unwrap();
        let type_name = type_info.type_name().to_string();
        if types.contains_key(&type_name) {
            return Err(Error::DuplicateActorType { type_name });
        }

        info!(actor_type = %type_name, "actor type registered");
        types.insert(type_name, Arc::new(type_info));
        Ok(())
    }

    /// Names of all registered actor types
    pub fn registered_types(&self) -> Vec<String> {
        let types = self.types.read().unwrap();
        let mut names: Vec<String> = types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get (or lazily create) the manager for a registered type
    pub fn manager(&self, type_name: &str) -> Result<Arc<ActorManager>> {
        let info = {
            let types = self.types.read().unwrap();
            types
                .get(type_name)
                .cloned()
                .ok_or_else(|| Error::unknown_actor_type(type_name))?
        };

        if let Some(manager) = self.managers.lock().unwrap().get(type_name) {
            return Ok(manager.clone());
        }

        let config = info
            .config()
            .cloned()
            .unwrap_or_else(|| self.default_config.clone());
        let manager = Arc::new(ActorManager::new(
            type_name,
            info.factory(),
            config,
            self.store.clone(),
        ));

        let mut managers = self.managers.lock().unwrap();
        // Another dispatcher may have created it while we built ours.
        if let Some(existing) = managers.get(type_name) {
            return Ok(existing.clone());
        }
        self.sweepers
            .lock()
            .unwrap()
            .push(manager.spawn_idle_sweeper());
        managers.insert(type_name.to_string(), manager.clone());
        Ok(manager)
    }

    /// Inbound entry point: activate an actor
    #[instrument(skip(self), fields(actor_type = type_name, actor_id = id), level = "debug")]
    pub async fn dispatch_activate(&self, type_name: &str, id: &str) -> Result<()> {
        let manager = self.manager(type_name)?;
        manager.activate(&ActorId::new(id)?).await
    }

    /// Inbound entry point: deactivate an actor
    #[instrument(skip(self), fields(actor_type = type_name, actor_id = id), level = "debug")]
    pub async fn dispatch_deactivate(&self, type_name: &str, id: &str) -> Result<()> {
        let manager = self.manager(type_name)?;
        manager.deactivate(&ActorId::new(id)?).await
    }

    /// Inbound entry point: invoke an actor method
    #[instrument(skip(self, payload), fields(actor_type = type_name, actor_id = id, method), level = "debug")]
    pub async fn dispatch_invoke(
        &self,
        type_name: &str,
        id: &str,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes> {
        let manager = self.manager(type_name)?;
        manager.invoke_method(&ActorId::new(id)?, method, payload).await
    }

    /// Inbound entry point: fire a transient timer
    #[instrument(skip(self), fields(actor_type = type_name, actor_id = id, timer = name), level = "debug")]
    pub async fn dispatch_timer(&self, type_name: &str, id: &str, name: &str) -> Result<()> {
        let manager = self.manager(type_name)?;
        manager.fire_timer(&ActorId::new(id)?, name).await
    }

    /// Inbound entry point: fire a durable reminder
    #[instrument(skip(self, payload), fields(actor_type = type_name, actor_id = id, reminder = name), level = "debug")]
    pub async fn dispatch_reminder(
        &self,
        type_name: &str,
        id: &str,
        name: &str,
        payload: Bytes,
    ) -> Result<()> {
        let manager = self.manager(type_name)?;
        manager.fire_reminder(&ActorId::new(id)?, name, payload).await
    }

    /// Drain and deactivate everything; called at process shutdown
    ///
    /// Stops the idle sweepers, then runs `deactivate_all` on every manager.
    /// Reports the (type-qualified) ids that failed to drain.
    #[instrument(skip(self), level = "info")]
    pub async fn shutdown(&self) -> Result<()> {
        for sweeper in self.sweepers.lock().unwrap().drain(..) {
            sweeper.abort();
        }

        let managers: Vec<Arc<ActorManager>> = {
            let managers = self.managers.lock().unwrap();
            managers.values().cloned().collect()
        };

        let mut failed = Vec::new();
        for manager in managers {
            match manager.deactivate_all().await {
                Ok(()) => {}
                Err(Error::DeactivationIncomplete { failed: ids }) => {
                    for id in ids {
                        failed.push(format!("{}/{}", manager.type_name(), id));
                    }
                }
                Err(e) => {
                    warn!(actor_type = %manager.type_name(), error = %e, "shutdown drain failed");
                    failed.push(format!("{}/*", manager.type_name()));
                }
            }
        }

        info!("actor runtime shut down");
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::DeactivationIncomplete { failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use selkie_core::{ActorBehavior, ActorContext, ActorFactory};
    use selkie_store::MemoryStateStore;

    struct EchoBehavior;

    #[async_trait]
    impl ActorBehavior for EchoBehavior {
        async fn dispatch(
            &mut self,
            _ctx: &mut ActorContext,
            method: &str,
            payload: Bytes,
        ) -> selkie_core::Result<Bytes> {
            match method {
                "echo" => Ok(payload),
                "upper" => {
                    let text = String::from_utf8_lossy(&payload).to_uppercase();
                    Ok(Bytes::from(text))
                }
                other => Err(Error::method_not_found("Echo", other)),
            }
        }
    }

    fn echo_factory() -> Arc<dyn ActorFactory> {
        Arc::new(|_id: &ActorId| Box::new(EchoBehavior) as Box<dyn ActorBehavior>)
    }

    fn runtime() -> ActorRuntime {
        let runtime = ActorRuntime::new(Arc::new(MemoryStateStore::new()));
        runtime
            .register_actor(ActorTypeInfo::new("Echo", echo_factory()).unwrap())
            .unwrap();
        runtime
    }

    #[tokio::test]
    async fn test_register_duplicate_type_fails() {
        let runtime = runtime();
        let err = runtime
            .register_actor(ActorTypeInfo::new("Echo", echo_factory()).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateActorType { .. }));
        assert_eq!(runtime.registered_types(), vec!["Echo".to_string()]);
    }

    #[tokio::test]
    async fn test_dispatch_to_unknown_type_fails() {
        let runtime = runtime();
        let err = runtime
            .dispatch_invoke("Ghost", "g1", "echo", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownActorType { .. }));

        let err = runtime.dispatch_activate("Ghost", "g1").await.unwrap_err();
        assert!(matches!(err, Error::UnknownActorType { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_invoke_roundtrip() {
        let runtime = runtime();

        let response = runtime
            .dispatch_invoke("Echo", "e1", "upper", Bytes::from("hello"))
            .await
            .unwrap();
        assert_eq!(response, Bytes::from("HELLO"));
    }

    #[tokio::test]
    async fn test_invalid_actor_id_rejected_at_boundary() {
        let runtime = runtime();
        let err = runtime
            .dispatch_invoke("Echo", "", "echo", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidActorId { .. }));
    }

    #[tokio::test]
    async fn test_activate_deactivate_through_runtime() {
        let runtime = runtime();

        runtime.dispatch_activate("Echo", "e1").await.unwrap();
        let err = runtime.dispatch_activate("Echo", "e1").await.unwrap_err();
        assert!(matches!(err, Error::ActorAlreadyActive { .. }));

        runtime.dispatch_deactivate("Echo", "e1").await.unwrap();
        let err = runtime.dispatch_deactivate("Echo", "e1").await.unwrap_err();
        assert!(matches!(err, Error::ActorNotActive { .. }));
    }

    #[tokio::test]
    async fn test_managers_created_lazily_per_type() {
        let runtime = runtime();
        runtime
            .register_actor(ActorTypeInfo::new("Echo2", echo_factory()).unwrap())
            .unwrap();

        // Only the dispatched type gets a manager.
        runtime
            .dispatch_invoke("Echo", "e1", "echo", Bytes::new())
            .await
            .unwrap();
        assert!(runtime.managers.lock().unwrap().contains_key("Echo"));
        assert!(!runtime.managers.lock().unwrap().contains_key("Echo2"));
    }

    #[tokio::test]
    async fn test_shutdown_drains_all_instances() {
        let runtime = runtime();

        for n in 0..3 {
            runtime
                .dispatch_invoke("Echo", &format!("e{}", n), "echo", Bytes::new())
                .await
                .unwrap();
        }
        assert_eq!(runtime.manager("Echo").unwrap().active_count(), 3);

        runtime.shutdown().await.unwrap();
        assert_eq!(runtime.manager("Echo").unwrap().active_count(), 0);
    }

    #[tokio::test]
    async fn test_per_type_config_override() {
        let runtime = runtime();
        runtime
            .register_actor(
                ActorTypeInfo::new("Strict", echo_factory())
                    .unwrap()
                    .with_config(ActorTypeConfig {
                        require_explicit_activation: true,
                        ..Default::default()
                    })
                    .unwrap(),
            )
            .unwrap();

        let err = runtime
            .dispatch_invoke("Strict", "s1", "echo", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ActorNotActive { .. }));

        // The default-config type still auto-activates.
        runtime
            .dispatch_invoke("Echo", "e1", "echo", Bytes::new())
            .await
            .unwrap();
    }
}
