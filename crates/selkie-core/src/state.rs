//! State change tracking
//!
//! TigerStyle: Buffer every mutation, commit one batch, never partial.
//!
//! A turn's state mutations are recorded here instead of being written
//! through to the store. After the turn returns successfully the accumulated
//! records are flushed as a single all-or-nothing batch; after a failed turn
//! they are dropped, so the store never observes a half-applied turn.

use crate::constants::STATE_CHANGES_PER_TURN_COUNT_MAX;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Operation carried by one committed state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateOperation {
    /// Key did not exist in the store from this turn's perspective
    Add,
    /// Key existed and is being overwritten
    Update,
    /// Key is being deleted
    Remove,
}

/// One entry of a turn's commit batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeRecord {
    /// State key, unique within the actor
    pub key: String,
    /// What happened to the key
    pub operation: StateOperation,
    /// New value; absent for removals
    pub value: Option<Bytes>,
}

/// How a key is currently tracked within the turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackedKind {
    /// Loaded from the store, not mutated yet
    Unchanged,
    Add,
    Update,
    Remove,
}

#[derive(Debug, Clone)]
struct TrackedEntry {
    value: Option<Bytes>,
    kind: TrackedKind,
}

/// Result of consulting the tracker for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedRead {
    /// The turn has a value for this key (written or previously loaded)
    Value(Bytes),
    /// The turn removed this key
    Removed,
    /// The tracker knows nothing; consult the store
    Untracked,
}

/// Per-turn record of state mutations
///
/// Read-your-writes within the turn; flushed by the manager after the turn.
#[derive(Debug, Default)]
pub struct StateChangeTracker {
    entries: HashMap<String, TrackedEntry>,
}

impl StateChangeTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Consult the tracker for a key
    pub fn read(&self, key: &str) -> TrackedRead {
        match self.entries.get(key) {
            Some(entry) => match entry.kind {
                TrackedKind::Remove => TrackedRead::Removed,
                _ => match &entry.value {
                    Some(value) => TrackedRead::Value(value.clone()),
                    None => TrackedRead::Untracked,
                },
            },
            None => TrackedRead::Untracked,
        }
    }

    /// Record a value loaded from the store, so later reads and writes in the
    /// same turn see it without another store round trip
    pub fn note_loaded(&mut self, key: impl Into<String>, value: Bytes) {
        let key = key.into();
        debug_assert!(!key.is_empty(), "state key must not be empty");

        // A load never overwrites a mutation already recorded this turn.
        self.entries.entry(key).or_insert(TrackedEntry {
            value: Some(value),
            kind: TrackedKind::Unchanged,
        });
    }

    /// Record a write
    ///
    /// A key the store never saw is an `Add`; anything already tracked
    /// becomes an `Update` (an `Add` stays an `Add` — the store still has
    /// never seen it).
    pub fn set(&mut self, key: impl Into<String>, value: Bytes) {
        let key = key.into();
        debug_assert!(!key.is_empty(), "state key must not be empty");
        debug_assert!(
            self.entries.len() <= STATE_CHANGES_PER_TURN_COUNT_MAX,
            "state changes per turn exceed limit"
        );

        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.kind = match entry.kind {
                    TrackedKind::Add => TrackedKind::Add,
                    _ => TrackedKind::Update,
                };
                entry.value = Some(value);
            }
            None => {
                self.entries.insert(
                    key,
                    TrackedEntry {
                        value: Some(value),
                        kind: TrackedKind::Add,
                    },
                );
            }
        }
    }

    /// Record a removal of a key this turn already knows about
    ///
    /// Returns false when the tracker has no live entry for the key; the
    /// caller then checks the store and uses [`mark_removed`] if it exists
    /// there.
    ///
    /// [`mark_removed`]: StateChangeTracker::mark_removed
    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => match entry.kind {
                // Added this turn and never committed: forget it entirely.
                TrackedKind::Add => {
                    self.entries.remove(key);
                    true
                }
                TrackedKind::Remove => false,
                TrackedKind::Update | TrackedKind::Unchanged => {
                    entry.kind = TrackedKind::Remove;
                    entry.value = None;
                    true
                }
            },
            None => false,
        }
    }

    /// Record a removal of a key known to exist in the store
    pub fn mark_removed(&mut self, key: impl Into<String>) {
        self.entries.insert(
            key.into(),
            TrackedEntry {
                value: None,
                kind: TrackedKind::Remove,
            },
        );
    }

    /// Number of entries that would be committed
    pub fn change_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.kind != TrackedKind::Unchanged)
            .count()
    }

    /// Whether a flush would be a no-op
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Drain the tracker into a commit batch, sorted by key for determinism
    pub fn take_changes(&mut self) -> Vec<StateChangeRecord> {
        let mut records: Vec<StateChangeRecord> = self
            .entries
            .drain()
            .filter_map(|(key, entry)| {
                let operation = match entry.kind {
                    TrackedKind::Unchanged => return None,
                    TrackedKind::Add => StateOperation::Add,
                    TrackedKind::Update => StateOperation::Update,
                    TrackedKind::Remove => StateOperation::Remove,
                };
                Some(StateChangeRecord {
                    key,
                    operation,
                    value: entry.value,
                })
            })
            .collect();

        records.sort_by(|a, b| a.key.cmp(&b.key));
        debug_assert!(records.len() <= STATE_CHANGES_PER_TURN_COUNT_MAX);
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_untracked_is_add() {
        let mut tracker = StateChangeTracker::new();
        tracker.set("count", Bytes::from("1"));

        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StateOperation::Add);
        assert_eq!(changes[0].value, Some(Bytes::from("1")));
    }

    #[test]
    fn test_set_after_load_is_update() {
        let mut tracker = StateChangeTracker::new();
        tracker.note_loaded("count", Bytes::from("1"));
        tracker.set("count", Bytes::from("2"));

        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StateOperation::Update);
    }

    #[test]
    fn test_repeated_set_stays_add() {
        let mut tracker = StateChangeTracker::new();
        tracker.set("count", Bytes::from("1"));
        tracker.set("count", Bytes::from("2"));

        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StateOperation::Add);
        assert_eq!(changes[0].value, Some(Bytes::from("2")));
    }

    #[test]
    fn test_remove_of_fresh_add_cancels_out() {
        let mut tracker = StateChangeTracker::new();
        tracker.set("tmp", Bytes::from("x"));
        assert!(tracker.remove("tmp"));

        assert!(tracker.is_empty());
        assert!(tracker.take_changes().is_empty());
    }

    #[test]
    fn test_remove_of_loaded_key_is_remove() {
        let mut tracker = StateChangeTracker::new();
        tracker.note_loaded("count", Bytes::from("1"));
        assert!(tracker.remove("count"));

        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StateOperation::Remove);
        assert_eq!(changes[0].value, None);
    }

    #[test]
    fn test_remove_untracked_defers_to_caller() {
        let mut tracker = StateChangeTracker::new();
        assert!(!tracker.remove("missing"));

        tracker.mark_removed("missing");
        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].operation, StateOperation::Remove);
    }

    #[test]
    fn test_read_your_writes() {
        let mut tracker = StateChangeTracker::new();
        assert_eq!(tracker.read("count"), TrackedRead::Untracked);

        tracker.set("count", Bytes::from("5"));
        assert_eq!(tracker.read("count"), TrackedRead::Value(Bytes::from("5")));

        tracker.remove("count");
        // Freshly added then removed: gone without a trace.
        assert_eq!(tracker.read("count"), TrackedRead::Untracked);

        tracker.note_loaded("other", Bytes::from("1"));
        tracker.remove("other");
        assert_eq!(tracker.read("other"), TrackedRead::Removed);
    }

    #[test]
    fn test_loaded_only_keys_do_not_flush() {
        let mut tracker = StateChangeTracker::new();
        tracker.note_loaded("a", Bytes::from("1"));
        tracker.note_loaded("b", Bytes::from("2"));
        tracker.set("c", Bytes::from("3"));

        let changes = tracker.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].key, "c");
    }

    #[test]
    fn test_changes_sorted_by_key() {
        let mut tracker = StateChangeTracker::new();
        tracker.set("b", Bytes::from("2"));
        tracker.set("a", Bytes::from("1"));
        tracker.set("c", Bytes::from("3"));

        let keys: Vec<_> = tracker.take_changes().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
