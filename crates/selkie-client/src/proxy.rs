//! Actor proxy
//!
//! Caller-side stub for invoking a (possibly remote) actor by type and id.
//! The proxy holds no shared mutable state and needs no turn discipline of
//! its own — exclusivity is enforced on the receiving side. Transport is a
//! collaborator behind [`ActorInvokeClient`]; nothing is contacted until the
//! first `invoke`.

use async_trait::async_trait;
use bytes::Bytes;
use selkie_core::{ActorId, Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Invocation transport client
///
/// Implementations carry the request to the sidecar's actor-invoke endpoint
/// (HTTP, gRPC, in-process loopback) and return the decoded response bytes.
/// Remote failures surface as [`Error::Invocation`] carrying the remote
/// status and message.
#[async_trait]
pub trait ActorInvokeClient: Send + Sync {
    /// Invoke a method on an actor and return the response payload
    async fn invoke_actor(
        &self,
        actor_type: &str,
        id: &ActorId,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes>;
}

/// Caller-side handle to one actor
///
/// Cheap to create and clone; addressing is by (type, id) only.
#[derive(Clone)]
pub struct ActorProxy {
    actor_type: String,
    id: ActorId,
    client: Arc<dyn ActorInvokeClient>,
}

impl ActorProxy {
    /// Create a proxy; does not contact the sidecar until first use
    pub fn create(
        client: Arc<dyn ActorInvokeClient>,
        actor_type: impl Into<String>,
        id: ActorId,
    ) -> Self {
        let actor_type = actor_type.into();
        debug_assert!(!actor_type.is_empty(), "actor type must not be empty");

        Self {
            actor_type,
            id,
            client,
        }
    }

    /// The target actor's type name
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// The target actor's id
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Invoke a method with an opaque payload
    #[instrument(skip(self, payload), fields(actor_type = %self.actor_type, actor_id = %self.id, method), level = "debug")]
    pub async fn invoke(&self, method: &str, payload: Bytes) -> Result<Bytes> {
        debug_assert!(!method.is_empty(), "method name must not be empty");
        self.client
            .invoke_actor(&self.actor_type, &self.id, method, payload)
            .await
    }

    /// Invoke with a typed request and response
    ///
    /// Serializes the request to JSON, invokes the actor, and deserializes
    /// the response. The runtime itself never inspects payloads; this
    /// convenience lives entirely at the proxy edge.
    pub async fn request<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let payload = serde_json::to_vec(request).map_err(|e| Error::Serialization {
            reason: format!("failed to serialize request: {}", e),
        })?;

        let response = self.invoke(method, Bytes::from(payload)).await?;

        serde_json::from_slice(&response).map_err(|e| Error::Serialization {
            reason: format!("failed to deserialize response: {}", e),
        })
    }

    /// Fire-and-forget invocation (response payload discarded)
    pub async fn send(&self, method: &str, payload: Bytes) -> Result<()> {
        self.invoke(method, payload).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records calls and replays canned responses
    struct MockClient {
        calls: Mutex<Vec<(String, String, String)>>,
        response: std::result::Result<Bytes, (u16, String)>,
    }

    impl MockClient {
        fn ok(response: impl Into<Bytes>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Ok(response.into()),
            }
        }

        fn failing(status: u16, message: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                response: Err((status, message.to_string())),
            }
        }
    }

    #[async_trait]
    impl ActorInvokeClient for MockClient {
        async fn invoke_actor(
            &self,
            actor_type: &str,
            id: &ActorId,
            method: &str,
            _payload: Bytes,
        ) -> Result<Bytes> {
            self.calls.lock().unwrap().push((
                actor_type.to_string(),
                id.to_string(),
                method.to_string(),
            ));
            match &self.response {
                Ok(bytes) => Ok(bytes.clone()),
                Err((status, message)) => Err(Error::invocation(*status, message.clone())),
            }
        }
    }

    fn proxy(client: Arc<MockClient>) -> ActorProxy {
        ActorProxy::create(client, "Counter", ActorId::new("c1").unwrap())
    }

    #[tokio::test]
    async fn test_create_is_lazy() {
        let client = Arc::new(MockClient::ok("ignored"));
        let _proxy = proxy(client.clone());
        assert!(client.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_forwards_addressing() {
        let client = Arc::new(MockClient::ok("8"));
        let proxy = proxy(client.clone());

        let response = proxy.invoke("increment", Bytes::from("3")).await.unwrap();
        assert_eq!(response, Bytes::from("8"));

        let calls = client.calls.lock().unwrap();
        assert_eq!(
            calls.as_slice(),
            &[("Counter".to_string(), "c1".to_string(), "increment".to_string())]
        );
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces_status() {
        let client = Arc::new(MockClient::failing(500, "actor crashed"));
        let proxy = proxy(client);

        let err = proxy.invoke("increment", Bytes::new()).await.unwrap_err();
        match err {
            Error::Invocation { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("crashed"));
            }
            other => panic!("expected Invocation error, got {other}"),
        }
    }

    #[derive(serde::Serialize)]
    struct Req {
        delta: i64,
    }

    #[derive(serde::Deserialize, Debug)]
    struct Resp {
        count: i64,
    }

    #[tokio::test]
    async fn test_typed_request() {
        let client = Arc::new(MockClient::ok(r#"{"count":8}"#));
        let proxy = proxy(client);

        let response: Resp = proxy.request("increment", &Req { delta: 3 }).await.unwrap();
        assert_eq!(response.count, 8);
    }

    #[tokio::test]
    async fn test_typed_request_bad_response() {
        let client = Arc::new(MockClient::ok("not json"));
        let proxy = proxy(client);

        let err = proxy
            .request::<_, Resp>("increment", &Req { delta: 3 })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
