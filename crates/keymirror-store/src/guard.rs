#![forbid(unsafe_code)]

//! Failure boundary around backend calls.
//!
//! Every backend read, write, and remove the engine performs goes through
//! [`BackendHandle`]. A failing delegate degrades to a neutral result —
//! `None` for reads, a no-op for writes and removes — so engine code never
//! carries its own error handling for storage failures.
//!
//! Only delegate-originated `Err` values are absorbed here. Panics are
//! programming errors and propagate unchanged.

use std::rc::Rc;

use tracing::warn;

use crate::backend::{OriginToken, StorageBackend};

/// Shared, guarded handle to one backend instance.
///
/// Cloning the handle shares the underlying store; both clones report the
/// same [`OriginToken`].
#[derive(Clone)]
pub struct BackendHandle {
    store: Rc<dyn StorageBackend>,
}

impl BackendHandle {
    /// Wrap a backend in the failure boundary.
    #[must_use]
    pub fn new(store: Rc<dyn StorageBackend>) -> Self {
        Self { store }
    }

    /// Identity token of the underlying backend instance.
    #[must_use]
    pub fn origin(&self) -> OriginToken {
        self.store.origin()
    }

    /// Guarded read: a failing delegate reads as "no value present".
    #[must_use]
    pub fn load(&self, key: &str) -> Option<String> {
        match self.store.get_raw(key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, %err, "backend read failed; treating key as absent");
                None
            }
        }
    }

    /// Guarded write: a failing delegate makes the write a no-op.
    pub fn save(&self, key: &str, value: &str) {
        if let Err(err) = self.store.set_raw(key, value) {
            warn!(key, %err, "backend write failed; value not persisted");
        }
    }

    /// Guarded remove: a failing delegate makes the remove a no-op.
    pub fn erase(&self, key: &str) {
        if let Err(err) = self.store.remove_raw(key) {
            warn!(key, %err, "backend remove failed; entry left in place");
        }
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("origin", &self.origin())
            .finish_non_exhaustive()
    }
}
