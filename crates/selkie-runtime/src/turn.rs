//! Turn scheduler
//!
//! TigerStyle: One turn per actor id, FIFO fairness, bounded queues.
//!
//! Actors are single-threaded by contract, so behavior code never needs its
//! own locking. This module is the single point enforcing that contract: at
//! most one turn (method call, timer fire, or reminder fire) runs per actor
//! id at any time, and concurrent callers for the same id are served in
//! arrival order. Ids never contend with each other.

use selkie_core::constants::TURN_QUEUE_DEPTH_MAX;
use selkie_core::{ActorId, Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::trace;

/// A caller queued for an actor's turn slot, FIFO per id
struct PendingCall {
    /// Hand-off channel; the permit itself travels through it so a caller
    /// that gave up waiting can never strand the slot
    wake_tx: oneshot::Sender<TurnPermit>,
    /// When the caller joined the queue
    enqueued_at: Instant,
}

/// Per-id slot state
struct TurnSlot {
    /// Whether a turn is currently in progress
    busy: bool,
    /// Callers waiting for the slot, in arrival order
    waiters: VecDeque<PendingCall>,
}

type SlotTable = Arc<Mutex<HashMap<String, TurnSlot>>>;

/// Mutual exclusion per actor id with FIFO fairness across callers
///
/// `acquire` suspends (never busy-waits) until no other turn is in progress
/// for the id, then grants a [`TurnPermit`]. Dropping the permit wakes the
/// next queued caller, so the slot is released on every exit path —
/// success, error, or panic.
pub struct TurnScheduler {
    slots: SlotTable,
}

impl TurnScheduler {
    /// Create a scheduler with no slots
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Acquire the turn slot for an actor id, queueing FIFO if occupied
    ///
    /// # Errors
    /// `TurnQueueFull` when the id already has `TURN_QUEUE_DEPTH_MAX`
    /// queued callers.
    pub async fn acquire(&self, id: &ActorId) -> Result<TurnPermit> {
        let wait_rx = {
            let mut slots = self.slots.lock().unwrap();
            let slot = slots.entry(id.as_str().to_string()).or_insert_with(|| TurnSlot {
                busy: false,
                waiters: VecDeque::new(),
            });

            if !slot.busy {
                slot.busy = true;
                None
            } else {
                if slot.waiters.len() >= TURN_QUEUE_DEPTH_MAX {
                    return Err(Error::TurnQueueFull {
                        id: id.to_string(),
                        depth: slot.waiters.len(),
                        limit: TURN_QUEUE_DEPTH_MAX,
                    });
                }
                let (wake_tx, wake_rx) = oneshot::channel();
                slot.waiters.push_back(PendingCall {
                    wake_tx,
                    enqueued_at: Instant::now(),
                });
                Some(wake_rx)
            }
        };

        match wait_rx {
            None => Ok(TurnPermit::new(self.slots.clone(), id.as_str().to_string())),
            Some(rx) => rx
                .await
                .map_err(|_| Error::internal("turn scheduler dropped a queued caller")),
        }
    }

    /// Acquire the slot only if it is free right now
    pub fn try_acquire(&self, id: &ActorId) -> Option<TurnPermit> {
        let mut slots = self.slots.lock().unwrap();
        let slot = slots.entry(id.as_str().to_string()).or_insert_with(|| TurnSlot {
            busy: false,
            waiters: VecDeque::new(),
        });

        if slot.busy {
            return None;
        }
        slot.busy = true;
        Some(TurnPermit::new(self.slots.clone(), id.as_str().to_string()))
    }

    /// Whether no turn is running or queued for the id
    pub fn is_idle(&self, id: &ActorId) -> bool {
        let slots = self.slots.lock().unwrap();
        match slots.get(id.as_str()) {
            None => true,
            Some(slot) => !slot.busy && slot.waiters.is_empty(),
        }
    }

    /// Number of callers queued behind the current turn
    pub fn queued_count(&self, id: &ActorId) -> usize {
        let slots = self.slots.lock().unwrap();
        slots.get(id.as_str()).map(|s| s.waiters.len()).unwrap_or(0)
    }
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on one actor id's turn slot
///
/// Release happens on drop: the next queued caller is woken, or the slot is
/// freed and reclaimed when nobody waits.
pub struct TurnPermit {
    slots: SlotTable,
    key: String,
    /// Disarmed permits skip release on drop (used when a hand-off fails)
    armed: bool,
}

impl TurnPermit {
    fn new(slots: SlotTable, key: String) -> Self {
        Self {
            slots,
            key,
            armed: true,
        }
    }
}

impl Drop for TurnPermit {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        release_slot(&self.slots, &self.key);
    }
}

/// Hand the slot to the next live waiter, or free it
///
/// Waiters that gave up (drain timeouts, cancelled callers) are skipped.
/// The hand-off keeps `busy` set, so FIFO order cannot be jumped by a
/// fresh caller arriving between release and wake-up.
fn release_slot(slots: &SlotTable, key: &str) {
    loop {
        let next = {
            let mut table = slots.lock().unwrap();
            let Some(slot) = table.get_mut(key) else {
                return;
            };
            match slot.waiters.pop_front() {
                Some(pending) => pending,
                None => {
                    slot.busy = false;
                    table.remove(key);
                    return;
                }
            }
        };

        trace!(
            actor_id = key,
            queued_ms = next.enqueued_at.elapsed().as_millis() as u64,
            "turn slot handed off"
        );

        let permit = TurnPermit::new(slots.clone(), key.to_string());
        match next.wake_tx.send(permit) {
            Ok(()) => return,
            Err(mut unclaimed) => {
                // Receiver is gone; neutralize the permit (its drop must not
                // re-release outside this loop) and try the next waiter.
                unclaimed.armed = false;
            }
        }
    }
}
