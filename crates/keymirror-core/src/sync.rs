#![forbid(unsafe_code)]

//! Cross-context sync ingress.
//!
//! Other execution contexts that write to the same physical backend share
//! no memory with this one; the platform delivers change notifications
//! instead. [`SyncChannel`] is the engine-side registry those notifications
//! flow through: the embedder translates platform events into
//! [`StorageEvent`]s and hands them to [`crate::hub::Hub::deliver`], and
//! each syncing binding listens for events whose origin token matches its
//! *currently configured* backend instance, republishing matches on the
//! notification bus.
//!
//! The engine never feeds its own writes into the channel, so self-caused
//! echoes cannot occur; origin matching additionally drops events from
//! unrelated backend instances, including same-typed ones holding a
//! same-named key.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use keymirror_store::OriginToken;
use tracing::trace;

/// A change observed in another execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key whose stored value changed.
    pub key: String,
    /// Identity of the backend instance that changed.
    pub origin: OriginToken,
}

impl StorageEvent {
    /// Convenience constructor.
    #[must_use]
    pub fn new(key: impl Into<String>, origin: OriginToken) -> Self {
        Self {
            key: key.into(),
            origin,
        }
    }
}

type Listener = Rc<RefCell<dyn FnMut(&StorageEvent)>>;

#[derive(Default)]
struct ChannelInner {
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Registry of cross-context event listeners.
///
/// Clonable handle with shared interior; one per [`crate::hub::Hub`].
#[derive(Clone, Default)]
pub struct SyncChannel {
    inner: Rc<RefCell<ChannelInner>>,
}

impl SyncChannel {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a listener until the returned guard goes away.
    #[must_use]
    pub fn attach(&self, listener: impl FnMut(&StorageEvent) + 'static) -> ListenerGuard {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Rc::new(RefCell::new(listener))));
        ListenerGuard {
            channel: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Dispatch `event` to every attached listener, over a snapshot taken
    /// now.
    pub fn deliver(&self, event: &StorageEvent) {
        let snapshot: Vec<Listener> = {
            let inner = self.inner.borrow();
            inner
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect()
        };
        trace!(key = %event.key, listeners = snapshot.len(), "delivering cross-context event");
        for listener in snapshot {
            (&mut *listener.borrow_mut())(event);
        }
    }

    /// Number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl std::fmt::Debug for SyncChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// RAII guard for one attached listener; detaches on drop.
///
/// Detach is idempotent: dropping the guard after the channel itself is
/// gone is a no-op.
pub struct ListenerGuard {
    channel: Weak<RefCell<ChannelInner>>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn deliver_reaches_attached_listeners() {
        let channel = SyncChannel::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _guard = channel.attach(move |event: &StorageEvent| {
            seen_clone.borrow_mut().push(event.clone());
        });

        let event = StorageEvent::new("k", OriginToken::next());
        channel.deliver(&event);
        assert_eq!(*seen.borrow(), vec![event]);
    }

    #[test]
    fn dropping_guard_detaches() {
        let channel = SyncChannel::new();
        let count = Rc::new(RefCell::new(0_u32));
        let count_clone = Rc::clone(&count);
        let guard = channel.attach(move |_: &StorageEvent| {
            *count_clone.borrow_mut() += 1;
        });
        assert_eq!(channel.listener_count(), 1);

        channel.deliver(&StorageEvent::new("k", OriginToken::next()));
        drop(guard);
        assert_eq!(channel.listener_count(), 0);
        channel.deliver(&StorageEvent::new("k", OriginToken::next()));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn deliver_without_listeners_is_a_noop() {
        let channel = SyncChannel::new();
        channel.deliver(&StorageEvent::new("k", OriginToken::next()));
    }

    #[test]
    fn guard_outliving_channel_is_inert() {
        let guard = {
            let channel = SyncChannel::new();
            channel.attach(|_: &StorageEvent| {})
        };
        drop(guard);
    }
}
