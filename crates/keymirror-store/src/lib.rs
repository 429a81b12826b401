#![forbid(unsafe_code)]

//! Storage-facing building blocks for Keymirror.
//!
//! This crate defines the contract any storage backend must satisfy
//! ([`StorageBackend`]), the failure boundary every backend call passes
//! through ([`BackendHandle`]), and the in-memory fallback used when no
//! durable backend is reachable ([`MemoryStore`]).
//!
//! Backends store raw strings verbatim under caller-chosen keys. The engine
//! in `keymirror-core` never talks to a backend directly: all I/O goes
//! through [`BackendHandle`], which absorbs delegate failures so a throwing
//! backend degrades to "operation had no effect" instead of propagating.

pub mod backend;
pub mod guard;
pub mod memory;

pub use backend::{OriginToken, StorageBackend, StoreError};
pub use guard::BackendHandle;
pub use memory::MemoryStore;
