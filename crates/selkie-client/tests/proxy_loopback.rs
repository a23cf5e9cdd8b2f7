//! Proxy round trips over an in-process loopback transport
//!
//! Wires `ActorProxy` to a live `ActorRuntime` through the transport trait,
//! the same seam an HTTP or gRPC client implementation would fill in.

use async_trait::async_trait;
use bytes::Bytes;
use selkie_client::{ActorInvokeClient, ActorProxy};
use selkie_core::{
    ActorBehavior, ActorContext, ActorFactory, ActorId, ActorTypeInfo, Error, Result,
};
use selkie_runtime::ActorRuntime;
use selkie_store::MemoryStateStore;
use std::sync::Arc;

/// Loopback transport: forwards straight into a local runtime's dispatch
/// entry point, as a sidecar-bound client would over the wire
struct LoopbackClient {
    runtime: Arc<ActorRuntime>,
}

#[async_trait]
impl ActorInvokeClient for LoopbackClient {
    async fn invoke_actor(
        &self,
        actor_type: &str,
        id: &ActorId,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes> {
        self.runtime
            .dispatch_invoke(actor_type, id.as_str(), method, payload)
            .await
    }
}

struct CounterBehavior;

fn parse_count(value: Option<Bytes>) -> i64 {
    value
        .map(|v| String::from_utf8_lossy(&v).parse().unwrap_or(0))
        .unwrap_or(0)
}

#[async_trait]
impl ActorBehavior for CounterBehavior {
    async fn dispatch(
        &mut self,
        ctx: &mut ActorContext,
        method: &str,
        payload: Bytes,
    ) -> Result<Bytes> {
        match method {
            "increment" => {
                let n: i64 = String::from_utf8_lossy(&payload).parse().unwrap_or(1);
                let count = parse_count(ctx.get_state("count").await?) + n;
                ctx.set_state("count", count.to_string());
                Ok(Bytes::from(count.to_string()))
            }
            "get" => Ok(Bytes::from(
                parse_count(ctx.get_state("count").await?).to_string(),
            )),
            other => Err(Error::method_not_found("Counter", other)),
        }
    }
}

fn loopback() -> Arc<LoopbackClient> {
    let runtime = Arc::new(ActorRuntime::new(Arc::new(MemoryStateStore::new())));
    let factory: Arc<dyn ActorFactory> =
        Arc::new(|_id: &ActorId| Box::new(CounterBehavior) as Box<dyn ActorBehavior>);
    runtime
        .register_actor(ActorTypeInfo::new("Counter", factory).unwrap())
        .unwrap();
    Arc::new(LoopbackClient { runtime })
}

#[tokio::test]
async fn test_proxy_invoke_roundtrip() {
    let client = loopback();
    let proxy = ActorProxy::create(client, "Counter", ActorId::new("c1").unwrap());

    let response = proxy.invoke("increment", Bytes::from("5")).await.unwrap();
    assert_eq!(response, Bytes::from("5"));

    let response = proxy.invoke("increment", Bytes::from("3")).await.unwrap();
    assert_eq!(response, Bytes::from("8"));
}

#[tokio::test]
async fn test_proxies_share_the_actor_by_address() {
    let client = loopback();
    let first = ActorProxy::create(client.clone(), "Counter", ActorId::new("c1").unwrap());
    let second = ActorProxy::create(client.clone(), "Counter", ActorId::new("c1").unwrap());
    let other = ActorProxy::create(client, "Counter", ActorId::new("c2").unwrap());

    first.send("increment", Bytes::from("2")).await.unwrap();
    second.send("increment", Bytes::from("2")).await.unwrap();
    other.send("increment", Bytes::from("9")).await.unwrap();

    assert_eq!(first.invoke("get", Bytes::new()).await.unwrap(), Bytes::from("4"));
    assert_eq!(other.invoke("get", Bytes::new()).await.unwrap(), Bytes::from("9"));
}

#[tokio::test]
async fn test_proxy_surfaces_dispatch_errors() {
    let client = loopback();
    let proxy = ActorProxy::create(client, "Ghost", ActorId::new("g1").unwrap());

    let err = proxy.invoke("anything", Bytes::new()).await.unwrap_err();
    assert!(matches!(err, Error::UnknownActorType { .. }));
}
