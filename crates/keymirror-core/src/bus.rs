#![forbid(unsafe_code)]

//! Notification bus: key-filtered, synchronous fan-out.
//!
//! # Invariants
//!
//! 1. `publish(key)` invokes the callbacks registered for `key` at publish
//!    time, in registration order, each receiving the key.
//! 2. Publish iterates a snapshot of the registry: a callback that
//!    unsubscribes during the pass does not alter the pass, and a callback
//!    registered during the pass is not invoked until the next one.
//! 3. Once a [`Subscription`] is dropped (or explicitly unsubscribed), no
//!    later publish reaches its callback.
//! 4. Publishes for one key never invoke callbacks registered for another.
//!
//! Fan-out is synchronous and single-threaded: no batching, no queueing,
//! no deduplication. Consumers that recompute snapshots on notification get
//! their deduplication from the cache cell instead.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use tracing::trace;

type Callback = Rc<RefCell<dyn FnMut(&str)>>;

#[derive(Default)]
struct BusInner {
    /// Per-key subscriber lists; `Vec` preserves registration order.
    subscribers: AHashMap<String, Vec<(u64, Callback)>>,
    next_id: u64,
}

/// Publish/subscribe registry keyed by storage key.
///
/// Clonable handle with shared interior. Each [`crate::hub::Hub`] owns one
/// bus, so separate engine instances never leak notifications into each
/// other.
#[derive(Clone, Default)]
pub struct NotifyBus {
    inner: Rc<RefCell<BusInner>>,
}

impl NotifyBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `key` until the returned guard goes away.
    #[must_use]
    pub fn subscribe(&self, key: &str, callback: impl FnMut(&str) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner
            .subscribers
            .entry(key.to_owned())
            .or_default()
            .push((id, Rc::new(RefCell::new(callback))));
        Subscription {
            bus: Rc::downgrade(&self.inner),
            key: key.to_owned(),
            id,
        }
    }

    /// Invoke every callback registered for `key`, in registration order.
    ///
    /// The registry is snapshotted before the first invocation; see the
    /// module invariants.
    pub fn publish(&self, key: &str) {
        let snapshot: Vec<Callback> = {
            let inner = self.inner.borrow();
            match inner.subscribers.get(key) {
                Some(list) => list.iter().map(|(_, cb)| Rc::clone(cb)).collect(),
                None => Vec::new(),
            }
        };
        trace!(key, fanout = snapshot.len(), "publishing change");
        for callback in snapshot {
            (&mut *callback.borrow_mut())(key);
        }
    }

    /// Number of live subscriptions for `key`.
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .borrow()
            .subscribers
            .get(key)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for NotifyBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("NotifyBus")
            .field("keys", &inner.subscribers.len())
            .finish()
    }
}

/// RAII guard for one bus registration; unsubscribes on drop.
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    key: String,
    id: u64,
}

impl Subscription {
    /// Remove the registration now instead of at drop time.
    ///
    /// Takes effect before returning: no publish issued afterwards can
    /// reach the callback.
    pub fn unsubscribe(self) {
        // Drop does the removal.
    }

    fn remove(&self) {
        let Some(inner) = self.bus.upgrade() else {
            // Bus already gone; nothing to detach from.
            return;
        };
        let mut inner = inner.borrow_mut();
        if let Some(list) = inner.subscribers.get_mut(&self.key) {
            list.retain(|(id, _)| *id != self.id);
            if list.is_empty() {
                inner.subscribers.remove(&self.key);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
