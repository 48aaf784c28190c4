//! Membership change notification
//!
//! An explicitly constructed notifier fans membership-event timestamps out
//! to registered listeners. The observation source (whatever watches the
//! cluster) calls [`MembershipNotifier::notify`]; each worker's state drains
//! its own pending queue at commit time.

use crate::types::Timestamp;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Listener notified when the set of participating hosts changes
///
/// Delivery happens on the notifier's thread, never the listener's own
/// execution sequence, so implementations must not block.
pub trait HostUpdateListener: Send + Sync {
    /// Called with the logical timestamp of the membership event
    fn on_hosts_updated(&self, timestamp: Timestamp);
}

/// Cloneable handle over a pending-update queue
///
/// Clones share the same queue: the notifier appends from its own thread
/// while the owning worker drains during commit.
#[derive(Debug, Clone, Default)]
pub struct HostUpdates {
    pending: Arc<Mutex<VecDeque<Timestamp>>>,
}

impl HostUpdates {
    /// Create an empty queue handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamp; never blocks on the consumer
    pub fn push(&self, timestamp: Timestamp) {
        self.pending.lock().push_back(timestamp);
    }

    /// Drain every pending timestamp in arrival order
    pub fn drain(&self) -> Vec<Timestamp> {
        self.pending.lock().drain(..).collect()
    }

    /// Returns true if no updates are pending
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl HostUpdateListener for HostUpdates {
    fn on_hosts_updated(&self, timestamp: Timestamp) {
        self.push(timestamp);
    }
}

/// Fan-out point for membership events
///
/// Owned by the top-level orchestration entry point and passed by reference
/// to whatever needs to register listeners. Timestamps must be strictly
/// increasing; stale or duplicate events are dropped.
pub struct MembershipNotifier {
    /// Registered listeners keyed by registration id
    listeners: DashMap<Uuid, Arc<dyn HostUpdateListener>>,

    /// Highest timestamp delivered so far
    last_timestamp: AtomicU64,

    /// Wall-clock time of the last delivered event
    last_event_at: Mutex<Option<DateTime<Utc>>>,
}

impl MembershipNotifier {
    /// Create a new notifier with no listeners
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            last_timestamp: AtomicU64::new(0),
            last_event_at: Mutex::new(None),
        }
    }

    /// Register a listener, returning its registration id
    pub fn register_listener(&self, listener: Arc<dyn HostUpdateListener>) -> Uuid {
        let id = Uuid::new_v4();
        self.listeners.insert(id, listener);
        debug!(listener_id = %id, count = self.listeners.len(), "Listener registered");
        id
    }

    /// Remove a listener; returns false if the id was not registered
    pub fn remove_listener(&self, id: Uuid) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            debug!(listener_id = %id, count = self.listeners.len(), "Listener removed");
        } else {
            warn!(listener_id = %id, "Attempted to remove unknown listener");
        }
        removed
    }

    /// Register a listener for the lifetime of the returned guard
    ///
    /// The listener is removed when the guard drops, on every exit path.
    pub fn register_scoped(&self, listener: Arc<dyn HostUpdateListener>) -> ListenerGuard<'_> {
        let id = self.register_listener(listener);
        ListenerGuard { notifier: self, id }
    }

    /// Deliver a membership event to every registered listener
    ///
    /// Events with a timestamp not greater than the last delivered one are
    /// dropped.
    pub fn notify(&self, timestamp: Timestamp) {
        let prev = self.last_timestamp.fetch_max(timestamp, Ordering::SeqCst);
        if timestamp <= prev {
            warn!(
                timestamp = timestamp,
                last_timestamp = prev,
                "Dropping stale membership event"
            );
            return;
        }

        *self.last_event_at.lock() = Some(Utc::now());

        for entry in self.listeners.iter() {
            entry.value().on_hosts_updated(timestamp);
        }
        debug!(
            timestamp = timestamp,
            listeners = self.listeners.len(),
            "Delivered membership event"
        );
    }

    /// Number of currently registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Highest timestamp delivered so far (0 if none)
    pub fn last_timestamp(&self) -> Timestamp {
        self.last_timestamp.load(Ordering::SeqCst)
    }

    /// Wall-clock time of the last delivered event
    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        *self.last_event_at.lock()
    }
}

impl Default for MembershipNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its listener from the notifier when dropped
pub struct ListenerGuard<'a> {
    notifier: &'a MembershipNotifier,
    id: Uuid,
}

impl ListenerGuard<'_> {
    /// Registration id of the guarded listener
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.notifier.remove_listener(self.id);
    }
}
