//! Per-repository registry of generation calls in flight.
//!
//! A `load` that finds a call already running for its repository attaches
//! to it and waits for its outcome. `modify`, `regenerate` and API-key
//! retries preempt whatever is running: the older call is told to stop
//! and the newer one takes over the slot, including any waiters, so
//! followers always receive the outcome of the last writer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::ports::cache::RepoKey;

struct Slot<T> {
    id: u64,
    outcome: Arc<watch::Sender<Option<T>>>,
    cancel: watch::Sender<bool>,
}

struct Slots<T> {
    next_id: u64,
    by_key: HashMap<RepoKey, Slot<T>>,
}

/// Shared map from repository to the generation call running for it.
pub struct InflightRegistry<T> {
    slots: Mutex<Slots<T>>,
}

/// Result of [`InflightRegistry::join`].
pub enum Join<T: Clone> {
    /// Nothing was running; the caller now owns the slot.
    Leader(Lease<T>),
    /// Another call owns the slot; wait on it.
    Follower(Waiter<T>),
}

/// Ownership of a registry slot. Dropping it frees the slot.
pub struct Lease<T: Clone> {
    registry: Arc<InflightRegistry<T>>,
    key: RepoKey,
    id: u64,
    outcome: Arc<watch::Sender<Option<T>>>,
    cancel: watch::Receiver<bool>,
}

/// Handle for waiting on somebody else's call.
pub struct Waiter<T> {
    outcome: watch::Receiver<Option<T>>,
}

impl<T> Default for InflightRegistry<T> {
    fn default() -> Self {
        Self { slots: Mutex::new(Slots { next_id: 0, by_key: HashMap::new() }) }
    }
}

impl<T: Clone> InflightRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attaches to the call running for `key`, or claims the slot.
    pub fn join(self: &Arc<Self>, key: &RepoKey) -> Join<T> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.by_key.get(key) {
            return Join::Follower(Waiter { outcome: slot.outcome.subscribe() });
        }
        let (outcome, _) = watch::channel(None);
        Join::Leader(self.install(&mut slots, key, Arc::new(outcome)))
    }

    /// Claims the slot for `key`, cancelling the call that held it.
    ///
    /// Waiters of the cancelled call are carried over to the new lease.
    pub fn preempt(self: &Arc<Self>, key: &RepoKey) -> Lease<T> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = match slots.by_key.remove(key) {
            Some(previous) => {
                previous.cancel.send_replace(true);
                previous.outcome
            }
            None => Arc::new(watch::channel(None).0),
        };
        self.install(&mut slots, key, outcome)
    }

    /// Whether a call is currently running for `key`.
    #[must_use]
    pub fn is_running(&self, key: &RepoKey) -> bool {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).by_key.contains_key(key)
    }

    fn install(
        self: &Arc<Self>,
        slots: &mut Slots<T>,
        key: &RepoKey,
        outcome: Arc<watch::Sender<Option<T>>>,
    ) -> Lease<T> {
        let id = slots.next_id;
        slots.next_id += 1;
        let (cancel, cancel_rx) = watch::channel(false);
        slots.by_key.insert(key.clone(), Slot { id, outcome: Arc::clone(&outcome), cancel });
        Lease { registry: Arc::clone(self), key: key.clone(), id, outcome, cancel: cancel_rx }
    }

    fn release(&self, key: &RepoKey, id: u64) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if slots.by_key.get(key).is_some_and(|slot| slot.id == id) {
            slots.by_key.remove(key);
        }
    }
}

impl<T: Clone> Lease<T> {
    /// Whether a newer call has taken over this slot.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once a newer call has taken over this slot.
    pub async fn cancelled(&self) {
        let mut cancel = self.cancel.clone();
        // A closed channel means the slot is gone, which also ends this call.
        let _ = cancel.wait_for(|cancelled| *cancelled).await;
    }

    /// Publishes `outcome` to waiters, unless this lease was preempted.
    pub fn complete(&self, outcome: &T) {
        if !self.is_cancelled() {
            self.outcome.send_replace(Some(outcome.clone()));
        }
    }
}

impl<T: Clone> Drop for Lease<T> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.id);
    }
}

impl<T: Clone> Waiter<T> {
    /// Waits for the owning call's outcome.
    ///
    /// Returns `None` if the slot was abandoned without an outcome.
    pub async fn outcome(mut self) -> Option<T> {
        let outcome = self.outcome.wait_for(Option::is_some).await.ok()?.clone();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> RepoKey {
        RepoKey::new("octo", "hello")
    }

    fn leader(join: Join<u32>) -> Lease<u32> {
        match join {
            Join::Leader(lease) => lease,
            Join::Follower(_) => panic!("expected to lead"),
        }
    }

    fn follower(join: Join<u32>) -> Waiter<u32> {
        match join {
            Join::Follower(waiter) => waiter,
            Join::Leader(_) => panic!("expected to follow"),
        }
    }

    #[tokio::test]
    async fn second_join_follows_and_gets_leader_outcome() {
        let registry = InflightRegistry::new();
        let lease = leader(registry.join(&key()));
        let waiter = follower(registry.join(&key()));

        lease.complete(&7);
        drop(lease);

        assert_eq!(waiter.outcome().await, Some(7));
        assert!(!registry.is_running(&key()));
    }

    #[tokio::test]
    async fn preempt_cancels_previous_and_inherits_waiters() {
        let registry = InflightRegistry::new();
        let first = leader(registry.join(&key()));
        let waiter = follower(registry.join(&key()));

        let second = registry.preempt(&key());
        assert!(first.is_cancelled());
        first.cancelled().await;

        // The superseded call's outcome is not published.
        first.complete(&1);
        drop(first);
        assert!(registry.is_running(&key()));

        second.complete(&2);
        drop(second);
        assert_eq!(waiter.outcome().await, Some(2));
    }

    #[tokio::test]
    async fn abandoned_slot_releases_waiters_with_none() {
        let registry = InflightRegistry::new();
        let lease = leader(registry.join(&key()));
        let waiter = follower(registry.join(&key()));
        drop(lease);
        assert_eq!(waiter.outcome().await, None);
    }

    #[test]
    fn different_repositories_do_not_interact() {
        let registry = InflightRegistry::<u32>::new();
        let _a = leader(registry.join(&RepoKey::new("octo", "a")));
        let _b = leader(registry.join(&RepoKey::new("octo", "b")));
        let _c = leader(registry.join(&RepoKey::new("Octo", "a")));
    }
}
