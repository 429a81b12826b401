#![forbid(unsafe_code)]

//! In-memory fallback store.
//!
//! Used as a drop-in when no durable backend is reachable. Entries are held
//! verbatim in a process-local map and vanish with the process; reads of
//! never-written keys return `None`.
//!
//! Cloning a `MemoryStore` clones the *handle*: all clones observe the same
//! entries and report the same [`OriginToken`], matching the behavior of a
//! real shared backend within one execution context. There is no
//! cross-context notification channel for this store — it is never visible
//! outside the process.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::backend::{OriginToken, StorageBackend, StoreError};

/// Volatile string store with shared-interior clone semantics.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Rc<MemoryInner>,
}

struct MemoryInner {
    entries: RefCell<AHashMap<String, String>>,
    origin: OriginToken,
}

impl MemoryStore {
    /// Create an empty store with a fresh instance identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MemoryInner {
                entries: RefCell::new(AHashMap::new()),
                origin: OriginToken::next(),
            }),
        }
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("origin", &self.inner.origin)
            .field("len", &self.len())
            .finish()
    }
}

impl StorageBackend for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.entries.borrow().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        self.inner.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn origin(&self) -> OriginToken {
        self.inner.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_written_key_reads_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_raw("missing").unwrap(), None);
    }

    #[test]
    fn values_round_trip_verbatim() {
        let store = MemoryStore::new();
        store.set_raw("k", r#"{"a": 1}"#).unwrap();
        assert_eq!(store.get_raw("k").unwrap().as_deref(), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn remove_clears_entry_and_tolerates_missing() {
        let store = MemoryStore::new();
        store.set_raw("k", "v").unwrap();
        store.remove_raw("k").unwrap();
        assert_eq!(store.get_raw("k").unwrap(), None);
        // Removing again is not an error.
        store.remove_raw("k").unwrap();
    }

    #[test]
    fn clones_share_entries_and_identity() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set_raw("k", "v").unwrap();
        assert_eq!(b.get_raw("k").unwrap().as_deref(), Some("v"));
        assert_eq!(a.origin(), b.origin());
    }

    #[test]
    fn separate_stores_are_distinct_instances() {
        let a = MemoryStore::new();
        let b = MemoryStore::new();
        a.set_raw("k", "v").unwrap();
        assert_eq!(b.get_raw("k").unwrap(), None);
        assert_ne!(a.origin(), b.origin());
    }

    #[test]
    fn len_tracks_entries() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set_raw("a", "1").unwrap();
        store.set_raw("b", "2").unwrap();
        assert_eq!(store.len(), 2);
        store.remove_raw("a").unwrap();
        assert_eq!(store.len(), 1);
    }
}
