//! Subscription registry fanning events out to listeners.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::{EventKind, SpeechEvent};

type Handler = Arc<dyn Fn(&SpeechEvent) + Send + Sync>;

struct Listener {
    id: u64,
    /// `None` listens on every channel.
    kind: Option<EventKind>,
    handler: Handler,
}

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl HubInner {
    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| l.id != id);
    }
}

/// Registry of event listeners, keyed by [`EventKind`].
///
/// Cloning the hub shares the registry. Handlers run on whichever task calls
/// [`EventHub::emit`]; they are never invoked while the registry lock is held,
/// so a handler may subscribe or unsubscribe freely.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen on one channel.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&SpeechEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Listen on every channel.
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SpeechEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    /// Deliver `event` to every listener on its channel, in subscription order.
    pub fn emit(&self, event: &SpeechEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.kind.is_none_or(|k| k == kind))
            .map(|l| Arc::clone(&l.handler))
            .collect();

        if handlers.is_empty() {
            tracing::trace!(channel = kind.name(), "No listeners for event");
        }
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of listeners that would receive an event of `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.kind.is_none_or(|k| k == kind))
            .count()
    }

    fn register(&self, kind: Option<EventKind>, handler: Handler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener { id, kind, handler });

        Subscription {
            hub: Arc::downgrade(&self.inner),
            id,
            removed: AtomicBool::new(false),
            remove_on_drop: true,
        }
    }
}

/// Handle to a registered listener.
///
/// The listener is removed by [`Subscription::remove`] or when the handle is
/// dropped. Call [`Subscription::detach`] to keep it registered for the life
/// of the hub instead.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription {
    hub: Weak<HubInner>,
    id: u64,
    removed: AtomicBool,
    remove_on_drop: bool,
}

impl Subscription {
    /// Unsubscribe. Calling this more than once is a no-op.
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }

    /// Whether [`Subscription::remove`] has been called.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    /// Keep the listener registered after this handle is dropped.
    pub fn detach(mut self) {
        self.remove_on_drop = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.remove_on_drop {
            self.remove();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("removed", &self.is_removed())
            .finish_non_exhaustive()
    }
}
