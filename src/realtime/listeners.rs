//! In-memory listener registry for realtime events.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::events::{EventKind, RealtimeEvent};

type Listener = Arc<dyn Fn(&RealtimeEvent) + Send + Sync + 'static>;

/// Handle identifying one registration, returned by
/// [`ListenerRegistry::on`] and consumed by [`ListenerRegistry::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Table of event kind to subscribed callbacks.
///
/// Callbacks for one kind are invoked in registration order. Dispatch
/// iterates over a snapshot of the sequence, so a callback registering or
/// removing listeners mid-dispatch cannot disturb the running dispatch. A
/// panicking callback is logged and does not prevent the remaining
/// callbacks from running.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event kind. Appends to the end of the
    /// dispatch order for that kind.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove one registration. Returns whether a matching registration was
    /// found.
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        let Some(mut callbacks) = self.listeners.get_mut(&kind) else {
            return false;
        };

        let Some(position) = callbacks.iter().position(|(lid, _)| *lid == id) else {
            return false;
        };

        drop(callbacks.remove(position));
        true
    }

    /// Invoke every callback registered for the event's kind, in
    /// registration order.
    pub fn emit(&self, event: &RealtimeEvent) {
        // Snapshot under the shard lock, invoke outside it: callbacks may
        // call `on`/`off` themselves.
        let snapshot: Vec<Listener> = match self.listeners.get(&event.kind()) {
            Some(callbacks) => callbacks
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect(),
            None => return,
        };

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!(kind = ?event.kind(), "listener panicked during event dispatch");
            }
        }
    }

    /// Number of callbacks registered for a kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners
            .get(&kind)
            .map_or(0, |callbacks| callbacks.len())
    }
}
