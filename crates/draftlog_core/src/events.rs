//! In-process sync bus for versioning events.
//!
//! Components that want to observe versioning activity (a revisions panel,
//! multiple open views of the same file) subscribe here instead of sharing
//! mutable state. The bus is constructed once per process and passed by
//! reference to whoever needs it; there is no implicit global instance.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::block::SyncStatus;
use crate::payload::EntryType;

/// A unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback function type for versioning events.
///
/// Callbacks are invoked synchronously and should not block.
pub type EventCallback = Arc<dyn Fn(&VersioningEvent) + Send + Sync>;

/// Something the versioning engine did that observers may care about.
#[derive(Debug, Clone)]
pub enum VersioningEvent {
    /// A new entry was appended to a document's log.
    EntryRecorded {
        /// The versioned document.
        document: PathBuf,
        /// Whether a snapshot keyframe or a diff was written.
        entry_type: EntryType,
        /// Sequence number assigned to the entry.
        device_seq: u64,
    },
    /// A document's history was reconstructed.
    HistoryLoaded {
        /// The versioned document.
        document: PathBuf,
        /// Number of revisions reconstructed.
        revisions: usize,
    },
    /// A text block was brought back in sync with its backing file.
    BlockReconciled {
        /// The block's backing file.
        document: PathBuf,
        /// The status that was resolved (never `Clean`).
        resolved_from: SyncStatus,
    },
}

/// Thread-safe publish/subscribe dispatcher for [`VersioningEvent`]s.
pub struct SyncBus {
    callbacks: RwLock<HashMap<SubscriptionId, EventCallback>>,
    next_id: AtomicU64,
}

impl SyncBus {
    /// Create a new bus with no subscribers.
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to versioning events.
    ///
    /// Returns an id that can be used to unsubscribe later.
    pub fn subscribe(&self, callback: EventCallback) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.insert(id, callback);
        id
    }

    /// Remove a subscription. Returns `true` if it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.remove(&id).is_some()
    }

    /// Publish an event to all subscribers.
    ///
    /// Callbacks run synchronously in unspecified order. A panicking
    /// callback is isolated so it cannot take down the publisher or the
    /// other subscribers; versioning is auxiliary and must never abort the
    /// host's primary operation.
    pub fn emit(&self, event: &VersioningEvent) {
        let callbacks = self.callbacks.read().unwrap();
        for callback in callbacks.values() {
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            }));
        }
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.read().unwrap().len()
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SyncBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn history_loaded() -> VersioningEvent {
        VersioningEvent::HistoryLoaded {
            document: PathBuf::from("draft.md"),
            revisions: 2,
        }
    }

    #[test]
    fn test_subscribe_and_emit() {
        let bus = SyncBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        bus.subscribe(Arc::new(move |_event| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(&history_loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = SyncBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let id = bus.subscribe(Arc::new(move |_event| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.emit(&history_loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let bus = SyncBus::new();
        let a = bus.subscribe(Arc::new(|_| {}));
        let b = bus.subscribe(Arc::new(|_| {}));
        assert_ne!(a, b);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let bus = SyncBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe(Arc::new(|_| {
            panic!("subscriber bug");
        }));
        let c = Arc::clone(&counter);
        bus.subscribe(Arc::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(&history_loaded());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
