#![forbid(unsafe_code)]

//! One engine instance: the shared notification bus, the in-memory
//! fallback store, and the cross-context sync channel.
//!
//! A [`Hub`] is explicitly constructed and passed around by handle — never
//! ambient global state — so independent engine instances (one per test,
//! say) cannot leak notifications or fallback entries into each other. All
//! bindings created from one hub share its bus and fallback store, which
//! is what makes two local observers of the same key converge.

use std::rc::Rc;

use keymirror_store::{BackendHandle, MemoryStore, StorageBackend, StoreError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::binding::BindingBuilder;
use crate::bus::NotifyBus;
use crate::codec::{Codec, JsonCodec};
use crate::sync::{StorageEvent, SyncChannel};

/// Handle to one engine instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Hub {
    inner: Rc<HubInner>,
}

struct HubInner {
    bus: NotifyBus,
    channel: SyncChannel,
    fallback: MemoryStore,
    fallback_handle: BackendHandle,
}

impl Hub {
    /// Create a fresh, isolated engine instance.
    #[must_use]
    pub fn new() -> Self {
        let fallback = MemoryStore::new();
        let fallback_handle = BackendHandle::new(Rc::new(fallback.clone()));
        Self {
            inner: Rc::new(HubInner {
                bus: NotifyBus::new(),
                channel: SyncChannel::new(),
                fallback,
                fallback_handle,
            }),
        }
    }

    /// The notification bus shared by every binding of this hub.
    #[must_use]
    pub fn bus(&self) -> &NotifyBus {
        &self.inner.bus
    }

    /// The cross-context event channel of this hub.
    #[must_use]
    pub fn channel(&self) -> &SyncChannel {
        &self.inner.channel
    }

    /// Guarded handle to this hub's in-memory fallback store.
    ///
    /// Every call returns a handle to the *same* store instance, so all
    /// consumers that fall back within one hub observe each other's
    /// writes.
    #[must_use]
    pub fn fallback(&self) -> BackendHandle {
        self.inner.fallback_handle.clone()
    }

    /// Direct handle to the fallback store, mainly for inspection.
    #[must_use]
    pub fn fallback_store(&self) -> &MemoryStore {
        &self.inner.fallback
    }

    /// Feed a change notification from another execution context into this
    /// engine. Listeners attached by syncing bindings decide whether the
    /// event's origin matches their configured backend.
    pub fn deliver(&self, event: &StorageEvent) {
        self.inner.channel.deliver(event);
    }

    /// Wrap a durable backend construction result, falling back to this
    /// hub's in-memory store when construction failed.
    #[must_use]
    pub fn durable_or_fallback(
        &self,
        result: Result<Rc<dyn StorageBackend>, StoreError>,
    ) -> BackendHandle {
        match result {
            Ok(store) => BackendHandle::new(store),
            Err(err) => {
                warn!(%err, "durable backend unavailable; using in-memory fallback");
                self.fallback()
            }
        }
    }

    /// Begin configuring an observation of `key` with the default JSON
    /// codec.
    #[must_use]
    pub fn bind<T>(&self, key: impl Into<String>, default: T) -> BindingBuilder<T>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        self.bind_with(key, default, JsonCodec)
    }

    /// Begin configuring an observation of `key` with a caller-supplied
    /// codec.
    #[must_use]
    pub fn bind_with<T: 'static>(
        &self,
        key: impl Into<String>,
        default: T,
        codec: impl Codec<T> + 'static,
    ) -> BindingBuilder<T> {
        BindingBuilder::new(self.clone(), key.into(), default, Rc::new(codec))
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub")
            .field("bus", &self.inner.bus)
            .field("channel", &self.inner.channel)
            .field("fallback", &self.inner.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_handles_share_one_store() {
        let hub = Hub::new();
        let a = hub.fallback();
        let b = hub.fallback();
        a.save("k", "v");
        assert_eq!(b.load("k").as_deref(), Some("v"));
        assert_eq!(a.origin(), b.origin());
    }

    #[test]
    fn hubs_are_isolated() {
        let one = Hub::new();
        let two = Hub::new();
        one.fallback().save("k", "v");
        assert_eq!(two.fallback().load("k"), None);
        assert_ne!(one.fallback().origin(), two.fallback().origin());
    }

    #[test]
    fn durable_or_fallback_prefers_the_durable_store() {
        let hub = Hub::new();
        let store = MemoryStore::new();
        let handle =
            hub.durable_or_fallback(Ok(Rc::new(store.clone()) as Rc<dyn StorageBackend>));
        assert_eq!(handle.origin(), store.origin());
        assert_ne!(handle.origin(), hub.fallback().origin());
    }

    #[test]
    fn durable_or_fallback_degrades_on_construction_failure() {
        let hub = Hub::new();
        let handle =
            hub.durable_or_fallback(Err(StoreError::Unavailable("no session".to_owned())));
        assert_eq!(handle.origin(), hub.fallback().origin());
    }

    #[test]
    fn clones_share_the_instance() {
        let hub = Hub::new();
        let clone = hub.clone();
        hub.fallback().save("k", "v");
        assert_eq!(clone.fallback().load("k").as_deref(), Some("v"));
    }
}
