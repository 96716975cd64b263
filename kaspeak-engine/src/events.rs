//! Session event bus
//!
//! Publish/subscribe over the closed set of events a session emits.
//! Emission snapshots the listener list before dispatch, so listeners can
//! subscribe or unsubscribe from inside a handler; each listener runs on
//! the next task-queue turn and a failing listener is logged without
//! starving the rest.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kaspeak_primitives::MessageHeader;
use tracing::warn;

/// Events a session can emit.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A verified Kaspeak payload was extracted from a confirmed block.
    MessageReceived {
        header: Arc<MessageHeader>,
        data: Arc<[u8]>,
    },
    /// The ledger connection came up.
    Connected { network_id: String },
    /// The ledger connection was released.
    Disconnected,
    /// The tracked balance was refreshed.
    BalanceChanged {
        balance_sompi: u64,
        utxo_count: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageReceived,
    Connected,
    Disconnected,
    BalanceChanged,
}

impl SessionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SessionEvent::MessageReceived { .. } => EventKind::MessageReceived,
            SessionEvent::Connected { .. } => EventKind::Connected,
            SessionEvent::Disconnected => EventKind::Disconnected,
            SessionEvent::BalanceChanged { .. } => EventKind::BalanceChanged,
        }
    }
}

pub type ListenerId = u64;

pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type Listener = Arc<dyn Fn(SessionEvent) -> ListenerResult + Send + Sync>;

struct Entry {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

#[derive(Default)]
struct BusState {
    next_id: ListenerId,
    listeners: HashMap<EventKind, Vec<Entry>>,
}

/// Type-safe publish/subscribe over [`SessionEvent`].
#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener for every occurrence of `kind`.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(SessionEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(listener), false)
    }

    /// Subscribes a listener that removes itself after its first dispatch.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(SessionEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(listener), true)
    }

    fn subscribe(&self, kind: EventKind, listener: Listener, once: bool) -> ListenerId {
        let mut state = self.state.lock().expect("event bus poisoned");
        let id = state.next_id;
        state.next_id += 1;
        state
            .listeners
            .entry(kind)
            .or_default()
            .push(Entry { id, once, listener });
        id
    }

    /// Removes a listener. Returns `false` when the id was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock().expect("event bus poisoned");
        let mut removed = false;
        for entries in state.listeners.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed |= entries.len() != before;
        }
        removed
    }

    /// Dispatches the event to every listener subscribed at emission time.
    ///
    /// Listeners run on the next task-queue turn, in subscription order;
    /// `once` subscriptions are dropped before dispatch so re-entrant emits
    /// cannot fire them twice.
    pub fn emit(&self, event: SessionEvent) {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let mut state = self.state.lock().expect("event bus poisoned");
            match state.listeners.get_mut(&event.kind()) {
                None => return,
                Some(entries) => {
                    let snapshot = entries
                        .iter()
                        .map(|entry| (entry.id, entry.listener.clone()))
                        .collect();
                    entries.retain(|entry| !entry.once);
                    snapshot
                }
            }
        };

        if snapshot.is_empty() {
            return;
        }

        tokio::spawn(async move {
            for (id, listener) in snapshot {
                if let Err(e) = listener(event.clone()) {
                    warn!(listener = id, "event listener failed: {e}");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    fn counter_listener(counter: Arc<AtomicUsize>) -> impl Fn(SessionEvent) -> ListenerResult {
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn settle() {
        // let spawned dispatch turns run
        sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn listeners_receive_matching_events() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.on(EventKind::Disconnected, counter_listener(hits.clone()));

        bus.emit(SessionEvent::Disconnected);
        bus.emit(SessionEvent::Connected {
            network_id: "testnet-10".into(),
        });
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn once_fires_a_single_time() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.once(EventKind::Disconnected, counter_listener(hits.clone()));

        bus.emit(SessionEvent::Disconnected);
        bus.emit(SessionEvent::Disconnected);
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn off_unsubscribes() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let id = bus.on(EventKind::Disconnected, counter_listener(hits.clone()));

        assert!(bus.off(id));
        assert!(!bus.off(id));

        bus.emit(SessionEvent::Disconnected);
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_listener_does_not_starve_the_rest() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        bus.on(EventKind::Disconnected, |_| Err("boom".into()));
        bus.on(EventKind::Disconnected, counter_listener(hits.clone()));

        bus.emit(SessionEvent::Disconnected);
        settle().await;

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
