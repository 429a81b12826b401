#![forbid(unsafe_code)]

//! Keymirror: a key-addressed synchronization engine.
//!
//! Mirrors a logical value, identified by a string key, into a pluggable
//! storage backend and keeps every local observer of that key convergent:
//! writes notify subscribers synchronously, out-of-band changes made by
//! other execution contexts arrive through a cross-context sync channel,
//! and a failing backend degrades to an in-memory fallback without ever
//! surfacing an error to the caller.
//!
//! # Architecture
//!
//! - [`Hub`]: one engine instance — owns the [`NotifyBus`], the shared
//!   in-memory fallback store, and the [`SyncChannel`]. Explicitly
//!   constructed; separate hubs are fully isolated.
//! - [`Binding`]: one observation of one key by one consumer, with its own
//!   cache cell. `snapshot()` computes the current decoded value on
//!   demand (reference-stable while the stored raw string is unchanged);
//!   `set`/`update`/`remove` write through the backend and fan out to
//!   subscribers.
//! - [`Codec`]: pluggable value ⇄ string strategy. [`JsonCodec`] is the
//!   default; [`SentinelCodec`] additionally round-trips explicit absence
//!   distinctly from `null` and from missing keys.
//! - Backends implement [`StorageBackend`] (from `keymirror-store`); every
//!   call passes through the [`BackendHandle`] failure boundary, so a
//!   throwing backend means "no value" on read and "no effect" on write.
//!
//! # Example
//!
//! ```
//! use keymirror_core::Hub;
//!
//! let hub = Hub::new();
//! let counter = hub.bind("count", 0_i32).seed_default(true).finish();
//! assert_eq!(*counter.snapshot(), 0);
//!
//! counter.set(5);
//! assert_eq!(*counter.snapshot(), 5);
//!
//! counter.remove();
//! assert_eq!(*counter.snapshot(), 0);
//! ```

pub mod binding;
pub mod bus;
mod cell;
pub mod codec;
pub mod hub;
pub mod sync;

pub use binding::{Binding, BindingBuilder};
pub use bus::{NotifyBus, Subscription};
pub use codec::{ABSENT_SENTINEL, Codec, CodecError, JsonCodec, SentinelCodec};
pub use hub::Hub;
pub use sync::{ListenerGuard, StorageEvent, SyncChannel};

pub use keymirror_store::{BackendHandle, MemoryStore, OriginToken, StorageBackend, StoreError};
