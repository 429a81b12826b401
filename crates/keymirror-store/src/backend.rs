#![forbid(unsafe_code)]

//! Backend contract: mutable string-keyed storage.
//!
//! A backend stores raw strings verbatim under opaque keys. Keys are
//! namespaced by the caller; no structure is imposed here. Any call may
//! fail — platform stores reject writes over quota, deny access, or become
//! unreachable entirely — which is why all engine I/O goes through the
//! failure boundary in [`crate::guard`] rather than calling a backend
//! directly.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Error produced by a storage backend call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend itself is unreachable (e.g. construction failed or the
    /// underlying handle went away).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The caller is not allowed to touch this backend.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The backend rejected a write for lack of space.
    #[error("quota exceeded for key: {key}")]
    QuotaExceeded {
        /// Key whose write was rejected.
        key: String,
    },

    /// Any other delegate-reported failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Identity of one backend *instance*.
///
/// Two handles over the same physical store report the same token; two
/// stores of the same type report different tokens. The cross-context sync
/// listener uses this to reject change notifications originating from an
/// unrelated backend, even one of the identical type holding a same-named
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OriginToken(u64);

impl OriginToken {
    /// Allocate a fresh token from the process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A mutable string-keyed store the engine can mirror values into.
///
/// Implementations use interior mutability: the engine shares backends as
/// `Rc<dyn StorageBackend>` within one thread of control. Removing a
/// missing key is not an error. Values are stored and returned verbatim —
/// no decoding, framing, or metadata at this layer.
pub trait StorageBackend {
    /// Read the raw string stored for `key`, if any.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` verbatim under `key`.
    fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the entry for `key`.
    fn remove_raw(&self, key: &str) -> Result<(), StoreError>;

    /// The identity token of this backend instance.
    fn origin(&self) -> OriginToken;
}
