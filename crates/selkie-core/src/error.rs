//! Error types for Selkie
//!
//! TigerStyle: Explicit error types with context, using thiserror.

use thiserror::Error;

/// Result type alias for Selkie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Selkie error types
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Registration Errors
    // =========================================================================
    #[error("Actor type already registered: {type_name}")]
    DuplicateActorType { type_name: String },

    #[error("Unknown actor type: {type_name}")]
    UnknownActorType { type_name: String },

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    #[error("Actor already active: {type_name}/{id}")]
    ActorAlreadyActive { type_name: String, id: String },

    #[error("Actor not active: {type_name}/{id}")]
    ActorNotActive { type_name: String, id: String },

    #[error("Drain timed out for actor {id} after {timeout_ms} ms")]
    DrainTimeout { id: String, timeout_ms: u64 },

    #[error("Deactivation incomplete, {} actor(s) failed to drain", failed.len())]
    DeactivationIncomplete { failed: Vec<String> },

    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    #[error("Method not found: {type_name}.{method}")]
    MethodNotFound { type_name: String, method: String },

    #[error("Turn queue full for actor {id}: {depth} waiters (limit: {limit})")]
    TurnQueueFull {
        id: String,
        depth: usize,
        limit: usize,
    },

    // =========================================================================
    // Scheduling Errors
    // =========================================================================
    #[error("Timer not found: {name} on actor {id}")]
    TimerNotFound { id: String, name: String },

    #[error("Reminder not found: {name} on actor {id}")]
    ReminderNotFound { id: String, name: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid actor ID: {id}, reason: {reason}")]
    InvalidActorId { id: String, reason: String },

    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    #[error("State store {operation} failed for key {key}: {reason}")]
    StateStore {
        operation: String,
        key: String,
        reason: String,
    },

    #[error("Invocation failed with status {status}: {message}")]
    Invocation { status: u16, message: String },

    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Transport-agnostic error category
///
/// Inbound dispatch entry points return `Result`; an external routing layer
/// maps the category onto whatever status representation its transport uses
/// (e.g. HTTP 404/409/500 or the gRPC equivalents).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The addressed type, actor, method, timer, or reminder does not exist
    NotFound,
    /// The operation conflicts with existing registration or activation
    AlreadyExists,
    /// The request itself is malformed
    InvalidArgument,
    /// The operation could not proceed in the current lifecycle state
    FailedPrecondition,
    /// A dependency (store, queue capacity) is temporarily unavailable
    Unavailable,
    /// Everything else
    Internal,
}

impl Error {
    /// Create an unknown actor type error
    pub fn unknown_actor_type(type_name: impl Into<String>) -> Self {
        Self::UnknownActorType {
            type_name: type_name.into(),
        }
    }

    /// Create an actor not active error
    pub fn actor_not_active(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ActorNotActive {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Create a method not found error
    pub fn method_not_found(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    /// Create a state store error
    pub fn state_store(
        operation: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StateStore {
            operation: operation.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an invocation error
    pub fn invocation(status: u16, message: impl Into<String>) -> Self {
        Self::Invocation {
            status,
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Classify this error for transport status mapping
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownActorType { .. }
            | Self::ActorNotActive { .. }
            | Self::MethodNotFound { .. }
            | Self::TimerNotFound { .. }
            | Self::ReminderNotFound { .. } => ErrorCategory::NotFound,
            Self::DuplicateActorType { .. } | Self::ActorAlreadyActive { .. } => {
                ErrorCategory::AlreadyExists
            }
            Self::InvalidActorId { .. }
            | Self::InvalidConfiguration { .. }
            | Self::Serialization { .. } => ErrorCategory::InvalidArgument,
            Self::DrainTimeout { .. } | Self::DeactivationIncomplete { .. } => {
                ErrorCategory::FailedPrecondition
            }
            Self::TurnQueueFull { .. } | Self::StateStore { .. } => ErrorCategory::Unavailable,
            Self::Invocation { .. } | Self::Internal { .. } | Self::Other(_) => {
                ErrorCategory::Internal
            }
        }
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::TurnQueueFull { .. } | Self::StateStore { .. } | Self::DrainTimeout { .. }
        )
    }
}
