//! # Event Log Contract
//!
//! The engine does not own durable storage. It consumes an append-only log
//! through the [`EventLog`] trait: append, list everything in order, and
//! subscribe to new events so the index can be updated incrementally.
//!
//! [`MemoryLog`] is the in-process implementation used for embedded
//! deployments and tests.

use crate::event::FactEvent;
use crate::{EventId, StrandError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked once per newly appended event.
pub type Subscriber = Arc<dyn Fn(&FactEvent) + Send + Sync>;

/// Handle identifying one subscription on a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

// =============================================================================
// EVENTLOG TRAIT
// =============================================================================

/// The append / list / subscribe contract of the fact log.
///
/// Implementations must deliver events to subscribers in append order and
/// only after the append has succeeded. Subscribers must not append to the
/// log that is notifying them.
pub trait EventLog: Send + Sync {
    /// Append one event. An error means the event was not recorded.
    fn append(&self, event: FactEvent) -> Result<(), StrandError>;

    /// Every recorded event, in append order.
    fn get_all(&self) -> Result<Vec<FactEvent>, StrandError>;

    /// Register a callback for future appends.
    fn subscribe(&self, callback: Subscriber) -> SubscriptionId;

    /// Remove a callback. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

// =============================================================================
// SUBSCRIPTION GUARD
// =============================================================================

/// Unsubscribes from its log when dropped.
pub struct Subscription {
    id: SubscriptionId,
    log: Weak<dyn EventLog>,
}

impl Subscription {
    /// Subscribe `callback` to `log` and return a guard for it.
    pub fn attach(log: &Arc<dyn EventLog>, callback: Subscriber) -> Self {
        let id = log.subscribe(callback);
        Self {
            id,
            log: Arc::downgrade(log),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(log) = self.log.upgrade() {
            log.unsubscribe(self.id);
        }
    }
}

// =============================================================================
// IN-MEMORY LOG
// =============================================================================

/// An append-only log held in memory.
///
/// Rejects invalid events and duplicate event ids.
#[derive(Default)]
pub struct MemoryLog {
    /// Held from push to last notification so delivery follows log order.
    append_order: Mutex<()>,
    events: RwLock<Vec<FactEvent>>,
    ids: RwLock<BTreeSet<EventId>>,
    subscribers: RwLock<BTreeMap<SubscriptionId, Subscriber>>,
    next_subscription: AtomicU64,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log pre-populated with `events` (validated, in order).
    pub fn from_events(events: Vec<FactEvent>) -> Result<Self, StrandError> {
        let log = Self::new();
        for event in events {
            log.append(event)?;
        }
        Ok(log)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLog")
            .field("events", &self.len())
            .field("subscribers", &self.subscribers.read().len())
            .finish()
    }
}

impl EventLog for MemoryLog {
    fn append(&self, event: FactEvent) -> Result<(), StrandError> {
        event.validate().map_err(|e| StrandError::Ingestion {
            operation: "append".to_string(),
            reason: e.to_string(),
        })?;

        let _order = self.append_order.lock();
        {
            let mut ids = self.ids.write();
            if !ids.insert(event.id.clone()) {
                return Err(StrandError::Ingestion {
                    operation: "append".to_string(),
                    reason: format!("duplicate event id {}", event.id),
                });
            }
            self.events.write().push(event.clone());
        }

        // Callbacks run without the event locks held, so they may read the log.
        let subscribers: Vec<Subscriber> = self.subscribers.read().values().cloned().collect();
        for subscriber in subscribers {
            subscriber(&event);
        }
        Ok(())
    }

    fn get_all(&self) -> Result<Vec<FactEvent>, StrandError> {
        Ok(self.events.read().clone())
    }

    fn subscribe(&self, callback: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().insert(id, callback);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.write().remove(&id);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProvenanceContext;
    use crate::event::{EdgeFact, NodeFact};
    use std::sync::atomic::AtomicUsize;

    fn edge_event(from: &str, to: &str) -> FactEvent {
        FactEvent::edge_created(
            EdgeFact::new(from, to, "knows"),
            "tester",
            ProvenanceContext::default(),
            None,
        )
        .expect("build")
    }

    #[test]
    fn append_preserves_order() {
        let log = MemoryLog::new();
        let first = edge_event("a", "b");
        let second = edge_event("b", "c");
        log.append(first.clone()).expect("append");
        log.append(second.clone()).expect("append");

        let all = log.get_all().expect("get_all");
        assert_eq!(all, vec![first, second]);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let log = MemoryLog::new();
        let event = edge_event("a", "b");
        log.append(event.clone()).expect("append");
        let err = log.append(event).expect_err("duplicate");
        assert!(matches!(err, StrandError::Ingestion { .. }));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn invalid_events_rejected_as_ingestion_errors() {
        let log = MemoryLog::new();
        let mut event = edge_event("a", "b");
        event.context.confidence = 7.0;
        assert!(matches!(
            log.append(event),
            Err(StrandError::Ingestion { .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn concurrent_appends_are_delivered_in_log_order() {
        let log: Arc<dyn EventLog> = Arc::new(MemoryLog::new());
        let delivered = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&delivered);
        let _subscription = Subscription::attach(
            &log,
            Arc::new(move |event: &FactEvent| {
                std::thread::yield_now();
                sink.lock().push(event.id.clone());
            }),
        );

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let log = Arc::clone(&log);
                scope.spawn(move || {
                    for round in 0..25 {
                        let node = NodeFact {
                            id: "n".into(),
                            node_type: format!("w{writer}r{round}"),
                            properties: crate::Properties::new(),
                        };
                        let event =
                            FactEvent::node_created(node, "tester", ProvenanceContext::default())
                                .expect("build");
                        log.append(event).expect("append");
                    }
                });
            }
        });

        let logged: Vec<EventId> = log
            .get_all()
            .expect("get_all")
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(logged.len(), 200);
        assert_eq!(*delivered.lock(), logged);
    }

    #[test]
    fn subscribers_see_each_append_until_dropped() {
        let log: Arc<dyn EventLog> = Arc::new(MemoryLog::new());
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&seen);
        let subscription = Subscription::attach(
            &log,
            Arc::new(move |_event: &FactEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        log.append(edge_event("a", "b")).expect("append");
        log.append(edge_event("b", "c")).expect("append");
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        drop(subscription);
        log.append(edge_event("c", "d")).expect("append");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
