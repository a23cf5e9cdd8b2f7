//! TigerStyle constants for Selkie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Actor Limits
// =============================================================================

/// Maximum length of an actor ID in bytes
pub const ACTOR_ID_LENGTH_BYTES_MAX: usize = 256;

/// Maximum length of an actor type name in bytes
pub const ACTOR_TYPE_NAME_LENGTH_BYTES_MAX: usize = 128;

/// Maximum length of a method name in bytes
pub const METHOD_NAME_LENGTH_BYTES_MAX: usize = 256;

/// Maximum number of concurrently activated instances per actor type
pub const ACTOR_CONCURRENT_COUNT_MAX: usize = 1_000_000;

// =============================================================================
// Turn Limits
// =============================================================================

/// Maximum number of queued callers waiting for one actor's turn slot
pub const TURN_QUEUE_DEPTH_MAX: usize = 10_000;

/// Maximum table re-lookups when an instance is removed mid-acquisition
pub const TURN_LOOKUP_RETRY_COUNT_MAX: usize = 8;

// =============================================================================
// State Limits
// =============================================================================

/// Maximum length of a state key in bytes
pub const STATE_KEY_LENGTH_BYTES_MAX: usize = 10 * 1024;

/// Maximum size of a single state value in bytes (1 MB)
pub const STATE_VALUE_SIZE_BYTES_MAX: usize = 1024 * 1024;

/// Maximum number of state changes one turn may accumulate
pub const STATE_CHANGES_PER_TURN_COUNT_MAX: usize = 10_000;

// =============================================================================
// Lifecycle Defaults (matching the sidecar's actor runtime defaults)
// =============================================================================

/// Default idle timeout before an instance is eligible for deactivation (1 hour)
pub const ACTOR_IDLE_TIMEOUT_MS_DEFAULT: u64 = 60 * 60 * 1000;

/// Maximum configurable idle timeout (24 hours)
pub const ACTOR_IDLE_TIMEOUT_MS_MAX: u64 = 24 * 60 * 60 * 1000;

/// Default interval between idle scans (30 sec)
pub const ACTOR_SCAN_INTERVAL_MS_DEFAULT: u64 = 30 * 1000;

/// Default bound on how long deactivation waits for an in-flight turn (1 min)
pub const DRAIN_CALL_TIMEOUT_MS_DEFAULT: u64 = 60 * 1000;

/// Maximum configurable drain timeout (10 min)
pub const DRAIN_CALL_TIMEOUT_MS_MAX: u64 = 10 * 60 * 1000;

// =============================================================================
// Scheduling Limits
// =============================================================================

/// Maximum length of a timer or reminder name in bytes
pub const SCHEDULE_NAME_LENGTH_BYTES_MAX: usize = 256;

/// Maximum size of a timer or reminder payload in bytes (1 MB)
pub const SCHEDULE_PAYLOAD_SIZE_BYTES_MAX: usize = 1024 * 1024;

// Compile-time assertions for constant validity
const _: () = {
    assert!(ACTOR_ID_LENGTH_BYTES_MAX >= 64);
    assert!(ACTOR_TYPE_NAME_LENGTH_BYTES_MAX >= 32);
    assert!(STATE_VALUE_SIZE_BYTES_MAX <= 100 * 1024 * 1024);
    assert!(ACTOR_IDLE_TIMEOUT_MS_DEFAULT <= ACTOR_IDLE_TIMEOUT_MS_MAX);
    assert!(DRAIN_CALL_TIMEOUT_MS_DEFAULT <= DRAIN_CALL_TIMEOUT_MS_MAX);
    assert!(TURN_LOOKUP_RETRY_COUNT_MAX >= 2);
};
