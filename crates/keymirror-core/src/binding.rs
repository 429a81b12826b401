#![forbid(unsafe_code)]

//! One observation of one key: the read, write, and remove paths.
//!
//! # Design
//!
//! A [`Binding`] owns its cache cell outright — two consumers observing the
//! same key each hold their own binding, their own cell, and their own
//! subscriptions, even though both read the same backend key and hear the
//! same bus notifications. Bindings are deliberately not `Clone`.
//!
//! The read path ([`Binding::snapshot`]) is the only mutator of the cell:
//! it reads the raw string through the guarded backend handle, reuses the
//! cached decoded value when the raw string is unchanged, and otherwise
//! decodes (falling back to the default on absence or decode failure).
//! Default seeding runs at most once per arming, on the first snapshot,
//! and only when the raw value is exactly absent.
//!
//! The write path encodes and persists, then notifies the bus
//! *unconditionally* — even when persistence failed — so subscribers
//! re-read and converge on backend truth.
//!
//! # Failure Modes
//!
//! - Backend failure at any call: absorbed by the guarded handle; reads
//!   see absence, writes and removes become no-ops.
//! - Decode failure: the default value is returned and the malformed raw
//!   entry is left in the backend for later recovery.
//! - Encode failure: nothing is persisted; subscribers are still notified.

use std::cell::RefCell;
use std::rc::Rc;

use keymirror_store::{BackendHandle, StorageBackend, StoreError};
use tracing::{debug, trace, warn};

use crate::bus::Subscription;
use crate::cell::CacheCell;
use crate::codec::Codec;
use crate::hub::Hub;
use crate::sync::ListenerGuard;

/// Backend selection for a binding under construction.
enum BackendChoice {
    /// The hub's shared in-memory fallback store.
    Fallback,
    /// A caller-supplied durable backend.
    Durable(BackendHandle),
    /// Durability disabled: no storage at all.
    Disabled,
}

/// Configures and creates a [`Binding`]. Obtained from [`Hub::bind`] or
/// [`Hub::bind_with`].
#[must_use]
pub struct BindingBuilder<T> {
    hub: Hub,
    key: String,
    default: T,
    codec: Rc<dyn Codec<T>>,
    backend: BackendChoice,
    sync: bool,
    seed_default: bool,
}

impl<T: 'static> BindingBuilder<T> {
    pub(crate) fn new(hub: Hub, key: String, default: T, codec: Rc<dyn Codec<T>>) -> Self {
        Self {
            hub,
            key,
            default,
            codec,
            backend: BackendChoice::Fallback,
            sync: true,
            seed_default: false,
        }
    }

    /// Replace the codec.
    pub fn codec(mut self, codec: impl Codec<T> + 'static) -> Self {
        self.codec = Rc::new(codec);
        self
    }

    /// Bind to a caller-supplied durable backend.
    pub fn backend(mut self, handle: BackendHandle) -> Self {
        self.backend = BackendChoice::Durable(handle);
        self
    }

    /// Bind to the durable backend if its construction succeeded, else to
    /// the hub's in-memory fallback.
    pub fn durable_or_fallback(
        mut self,
        result: Result<Rc<dyn StorageBackend>, StoreError>,
    ) -> Self {
        self.backend = BackendChoice::Durable(self.hub.durable_or_fallback(result));
        self
    }

    /// Disable durability entirely: reads always fall through to the
    /// default, writes and removes become pure notifications.
    pub fn ephemeral(mut self) -> Self {
        self.backend = BackendChoice::Disabled;
        self
    }

    /// Enable or disable cross-context synchronization (default: enabled).
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Persist the default value on first observation of an empty key
    /// (default: disabled).
    pub fn seed_default(mut self, seed: bool) -> Self {
        self.seed_default = seed;
        self
    }

    /// Create the binding and arm it.
    pub fn finish(self) -> Binding<T> {
        let backend = match self.backend {
            BackendChoice::Fallback => Some(self.hub.fallback()),
            BackendChoice::Durable(handle) => Some(handle),
            BackendChoice::Disabled => None,
        };
        let default = Rc::new(self.default);
        let mut binding = Binding {
            hub: self.hub,
            key: self.key,
            default: Rc::clone(&default),
            codec: self.codec,
            backend,
            cell: RefCell::new(CacheCell::new(default)),
            seed_default: self.seed_default,
            sync: self.sync,
            sync_guard: None,
        };
        if binding.sync {
            binding.attach_sync();
        }
        binding
    }
}

/// A live observation of one key by one consumer.
///
/// Dropping the binding tears the observation down: the sync listener
/// detaches and the cache cell is discarded. Bus subscriptions are owned
/// by whoever called [`Binding::subscribe`] and end with their guard.
pub struct Binding<T> {
    hub: Hub,
    key: String,
    default: Rc<T>,
    codec: Rc<dyn Codec<T>>,
    backend: Option<BackendHandle>,
    cell: RefCell<CacheCell<T>>,
    seed_default: bool,
    sync: bool,
    sync_guard: Option<ListenerGuard>,
}

impl<T: 'static> Binding<T> {
    /// The observed key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The configured backend, if durability is enabled.
    #[must_use]
    pub fn backend(&self) -> Option<&BackendHandle> {
        self.backend.as_ref()
    }

    /// Whether cross-context synchronization is currently enabled.
    #[must_use]
    pub fn sync_enabled(&self) -> bool {
        self.sync
    }

    /// Compute the current decoded value.
    ///
    /// Reference-stable: repeated calls without an intervening change
    /// return the same `Rc` allocation. Safe to call arbitrarily often;
    /// the only shared-state mutation is the binding's own cell and the
    /// one-shot default seed.
    #[must_use]
    pub fn snapshot(&self) -> Rc<T> {
        let raw = self.backend.as_ref().and_then(|b| b.load(&self.key));

        {
            let cell = self.cell.borrow();
            if cell.is_fresh(&raw) {
                return cell.decoded();
            }
        }

        let decoded = match &raw {
            None => Rc::clone(&self.default),
            Some(text) => match self.codec.decode(text) {
                Ok(value) => Rc::new(value),
                Err(err) => {
                    warn!(key = %self.key, %err, "decode failed; using default value");
                    Rc::clone(&self.default)
                }
            },
        };

        let mut cell = self.cell.borrow_mut();

        // One-shot default seeding on the first snapshot of this arming,
        // only when the key is exactly absent.
        if raw.is_none() && !cell.primed() && self.seed_default {
            if let Some(backend) = &self.backend {
                if !self.codec.is_absent(&self.default) {
                    match self.codec.encode(&self.default) {
                        Ok(encoded) => {
                            debug!(key = %self.key, "seeding default value");
                            backend.save(&self.key, &encoded);
                            cell.commit(Some(encoded), Rc::clone(&self.default));
                            return cell.decoded();
                        }
                        Err(err) => {
                            warn!(key = %self.key, %err, "default seeding skipped; encode failed");
                        }
                    }
                }
            }
        }

        cell.commit(raw, decoded);
        cell.decoded()
    }

    /// Encode and persist `value`, then notify every local subscriber of
    /// this key.
    ///
    /// Notification is unconditional: after a failed write, subscribers
    /// re-read the backend and converge on its unchanged truth.
    pub fn set(&self, value: T) {
        match self.codec.encode(&value) {
            Ok(encoded) => {
                if let Some(backend) = &self.backend {
                    backend.save(&self.key, &encoded);
                }
            }
            Err(err) => {
                warn!(key = %self.key, %err, "encode failed; value not persisted");
            }
        }
        self.hub.bus().publish(&self.key);
    }

    /// Apply `f` to the last decoded value and persist the result.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.snapshot();
        self.set(f(&current));
    }

    /// Remove the stored entry, then notify every local subscriber.
    ///
    /// Without a backend this is a pure notification; subsequent snapshots
    /// fall through to the default value either way.
    pub fn remove(&self) {
        if let Some(backend) = &self.backend {
            backend.erase(&self.key);
        }
        self.hub.bus().publish(&self.key);
    }

    /// Register `callback` for change notifications on this binding's key.
    #[must_use]
    pub fn subscribe(&self, callback: impl FnMut(&str) + 'static) -> Subscription {
        self.hub.bus().subscribe(&self.key, callback)
    }

    /// Re-arm against a different backend (or none).
    ///
    /// The old sync listener is detached and the cache cell discarded
    /// before the new configuration takes effect, so no stale notification
    /// from the old backend can reach the new cell. Seeding re-arms with
    /// the cell.
    pub fn set_backend(&mut self, backend: Option<BackendHandle>) {
        self.detach_sync();
        self.backend = backend;
        self.cell = RefCell::new(CacheCell::new(Rc::clone(&self.default)));
        debug!(key = %self.key, "re-armed against new backend");
        if self.sync {
            self.attach_sync();
        }
    }

    /// Re-arm with a different codec, discarding the cache cell.
    pub fn set_codec(&mut self, codec: Rc<dyn Codec<T>>) {
        self.codec = codec;
        self.cell = RefCell::new(CacheCell::new(Rc::clone(&self.default)));
        debug!(key = %self.key, "re-armed with new codec");
    }

    /// Enable or disable cross-context synchronization. Idempotent.
    pub fn set_sync(&mut self, sync: bool) {
        self.sync = sync;
        if sync {
            self.attach_sync();
        } else {
            self.detach_sync();
        }
    }

    fn attach_sync(&mut self) {
        if self.sync_guard.is_some() {
            return;
        }
        let Some(backend) = &self.backend else {
            // Nothing to reconcile with: no backend means no out-of-band
            // changes can exist.
            return;
        };
        let origin = backend.origin();
        let bus = self.hub.bus().clone();
        let key = self.key.clone();
        self.sync_guard = Some(self.hub.channel().attach(move |event| {
            if event.key != key {
                return;
            }
            if event.origin == origin {
                trace!(key = %event.key, "cross-context change matches backend; republishing");
                bus.publish(&event.key);
            } else {
                trace!(key = %event.key, "ignoring cross-context change from unrelated backend");
            }
        }));
    }

    fn detach_sync(&mut self) {
        self.sync_guard.take();
    }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("backend", &self.backend)
            .field("sync", &self.sync)
            .field("seed_default", &self.seed_default)
            .finish_non_exhaustive()
    }
}
