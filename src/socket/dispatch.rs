//! Listener registry shared by named listeners and the `on*` slots.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::warn;

use super::event::{EventKind, Listener, ListenerFailure, ListenerId, SocketEvent};
use crate::{metrics, panic::catch_callback};

#[derive(Default)]
struct Registry {
    named: HashMap<String, Vec<(ListenerId, Listener)>>,
    slots: HashMap<EventKind, Listener>,
}

/// Routes socket events to registered listeners.
///
/// For each event the singular slot fires first, then named listeners in
/// registration order. Listeners run outside the registry lock, so they may
/// register or remove listeners and close the socket.
#[derive(Default)]
pub(crate) struct EventDispatcher {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub(crate) fn add(&self, name: &str, listener: Listener) -> ListenerId {
        if EventKind::from_name(name).is_none() {
            warn!(event = name, "Listener added for un-triggered event");
        }
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock()
            .named
            .entry(name.to_owned())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a listener, returning whether it was registered under `name`.
    pub(crate) fn remove(&self, name: &str, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let Some(listeners) = registry.named.get_mut(name) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        before != listeners.len()
    }

    pub(crate) fn set_slot(&self, kind: EventKind, listener: Option<Listener>) {
        let mut registry = self.lock();
        match listener {
            Some(listener) => {
                registry.slots.insert(kind, listener);
            }
            None => {
                registry.slots.remove(&kind);
            }
        }
    }

    /// Deliver `event`, stopping at the first listener that fails.
    pub(crate) fn dispatch(&self, event: &SocketEvent) -> Result<(), ListenerFailure> {
        for listener in self.snapshot(event.kind()) {
            match catch_callback(|| listener(event)) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(ListenerFailure::Returned(err)),
                Err(panic) => {
                    metrics::inc_listener_panics();
                    return Err(ListenerFailure::Panicked(panic.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Deliver `event` to every listener, logging failures.
    pub(crate) fn notify(&self, event: &SocketEvent) {
        for listener in self.snapshot(event.kind()) {
            let failure = match catch_callback(|| listener(event)) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => ListenerFailure::Returned(err),
                Err(panic) => {
                    metrics::inc_listener_panics();
                    ListenerFailure::Panicked(panic.to_string())
                }
            };
            warn!(event = %event.kind(), error = %failure, "socket listener failed");
        }
    }

    fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        let registry = self.lock();
        let name = kind.to_string();
        registry
            .slots
            .get(&kind)
            .into_iter()
            .chain(
                registry
                    .named
                    .get(&name)
                    .into_iter()
                    .flatten()
                    .map(|(_, listener)| listener),
            )
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock();
        f.debug_struct("EventDispatcher")
            .field("named", &registry.named.keys().collect::<Vec<_>>())
            .field("slots", &registry.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}
