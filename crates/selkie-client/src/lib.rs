//! Selkie Client
//!
//! Caller-side pieces of the Selkie actor framework: the
//! [`ActorInvokeClient`] transport trait and the [`ActorProxy`] stub for
//! invoking actors by (type, id) without touching the runtime directly.
//!
//! Transport implementations (HTTP, gRPC) live with the embedding
//! application; tests use an in-process loopback over `selkie-runtime`.

pub mod proxy;

pub use proxy::{ActorInvokeClient, ActorProxy};
