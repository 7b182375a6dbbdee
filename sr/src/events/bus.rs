//! Event Bus - synchronous topic-based pub/sub for sequence events
//!
//! Handlers run inline on the publishing thread, in subscription order.
//! There is no queue at this level: anything that needs to leave the
//! publisher's thread (like file IO) queues on its own.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use super::types::{CheckDescriptor, SequenceEvent, TestInfo, TestStatus, Topic};
use crate::error::ReportResult;

type Handler = Arc<dyn Fn(&SequenceEvent) -> ReportResult + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
}

/// Central event bus for sequence activity
///
/// The sequencer publishes, reporters subscribe. Handler failures are logged
/// and never reach the publisher.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an event bus with no subscribers
    pub fn new() -> Self {
        debug!("EventBus::new: creating event bus");
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe a handler to one topic
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&SequenceEvent) -> ReportResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(%topic, ?id, "EventBus::subscribe");
        self.subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Subscription {
                id,
                topic,
                handler: Arc::new(handler),
            });
        id
    }

    /// Remove a subscription; returns false if it was not present
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        debug!(?id, "EventBus::unsubscribe");
        let mut subscriptions = self.subscriptions.write().unwrap_or_else(|e| e.into_inner());
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Dispatch an event to every handler subscribed to its topic
    ///
    /// Runs the handlers on the calling thread and returns how many ran.
    /// A failing handler is logged at warn level; the remaining handlers
    /// still run.
    pub fn publish(&self, event: &SequenceEvent) -> usize {
        let topic = event.topic();
        debug!(%topic, test_index = ?event.test_index(), "EventBus::publish");

        // Snapshot so handlers may (un)subscribe without deadlocking
        let handlers: Vec<Handler> = self
            .subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| s.handler.clone())
            .collect();

        for handler in &handlers {
            if let Err(e) = handler(event) {
                warn!(%topic, error = %e, "EventBus::publish: handler failed");
            }
        }
        handlers.len()
    }

    /// Get the number of active subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Get the number of active subscriptions on one topic
    pub fn subscriber_count_for(&self, topic: Topic) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.topic == topic)
            .count()
    }

    /// Create a publisher handle with one method per topic
    pub fn publisher(self: &Arc<Self>) -> SequencePublisher {
        SequencePublisher { bus: self.clone() }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for sequencer components to publish without owning the bus
///
/// Cheap to clone; every method returns the number of handlers that ran.
#[derive(Clone)]
pub struct SequencePublisher {
    bus: Arc<EventBus>,
}

impl SequencePublisher {
    /// Publish a raw event
    pub fn publish(&self, event: SequenceEvent) -> usize {
        self.bus.publish(&event)
    }

    // === Convenience methods ===

    pub fn sequence_update(&self, status: &str) -> usize {
        self.publish(SequenceEvent::SequenceUpdate {
            status: status.to_string(),
        })
    }

    pub fn sequence_complete(
        &self,
        status: &str,
        passed: u32,
        failed: u32,
        error: u32,
        skipped: u32,
        sequence_status: &str,
    ) -> usize {
        self.publish(SequenceEvent::SequenceComplete {
            status: status.to_string(),
            passed,
            failed,
            error,
            skipped,
            sequence_status: sequence_status.to_string(),
        })
    }

    pub fn test_start(&self, test: &TestInfo, test_index: u32) -> usize {
        self.publish(SequenceEvent::TestStart {
            test: test.clone(),
            test_index,
        })
    }

    pub fn test_exception(&self, exception: &str, test_index: u32) -> usize {
        self.publish(SequenceEvent::TestException {
            exception: exception.to_string(),
            test_index,
        })
    }

    pub fn check(&self, passed: bool, check: CheckDescriptor, test_index: u32) -> usize {
        self.publish(SequenceEvent::Check {
            passed,
            check,
            test_index,
            check_count: None,
        })
    }

    pub fn test_complete(&self, test: &TestInfo, test_index: u32, status: TestStatus) -> usize {
        self.publish(SequenceEvent::TestComplete {
            test: test.clone(),
            test_index,
            status,
        })
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use std::sync::Mutex;

    fn recording_handler(
        log: Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(&SequenceEvent) -> ReportResult + Send + Sync + 'static {
        move |event| {
            log.lock().unwrap().push(format!("{}:{}", tag, event.topic()));
            Ok(())
        }
    }

    #[test]
    fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_routes_by_topic() {
        let bus = create_event_bus();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Topic::TestStart, recording_handler(log.clone(), "start"));
        bus.subscribe(Topic::Check, recording_handler(log.clone(), "check"));

        let publisher = bus.publisher();
        assert_eq!(publisher.test_start(&TestInfo::new("t"), 1), 1);
        assert_eq!(publisher.sequence_update("Running"), 0);

        assert_eq!(*log.lock().unwrap(), vec!["start:Test_Start".to_string()]);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Topic::Check, recording_handler(log.clone(), "first"));
        bus.subscribe(Topic::Check, recording_handler(log.clone(), "second"));

        let event = SequenceEvent::TestException {
            exception: "x".to_string(),
            test_index: 1,
        };
        assert_eq!(bus.publish(&event), 0);

        let check = SequenceEvent::Check {
            passed: true,
            check: CheckDescriptor::new(crate::events::CheckKind::Passes, "ok"),
            test_index: 1,
            check_count: None,
        };
        assert_eq!(bus.publish(&check), 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:Check", "second:Check"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe(Topic::Check, |_| Ok(()));
        assert_eq!(bus.subscriber_count_for(Topic::Check), 1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_failing_handler_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(Topic::SequenceUpdate, |_| Err(ReportError::NoActiveSession));
        bus.subscribe(Topic::SequenceUpdate, recording_handler(log.clone(), "after"));

        let ran = bus.publish(&SequenceEvent::SequenceUpdate {
            status: "Running".to_string(),
        });
        assert_eq!(ran, 2);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = create_event_bus();
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let bus_ref = bus.clone();
        let slot_ref = slot.clone();
        let id = bus.subscribe(Topic::TestStart, move |_| {
            if let Some(id) = *slot_ref.lock().unwrap() {
                bus_ref.unsubscribe(id);
            }
            Ok(())
        });
        *slot.lock().unwrap() = Some(id);

        bus.publisher().test_start(&TestInfo::new("t"), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
