//! Tokio broadcast event bus for identity lifecycle notifications.
//!
//! Publishing is fire-and-forget: a mutation never waits on, or fails
//! because of, its subscribers.

use crate::models::IdentityEvent;
use std::sync::OnceLock;
use tokio::sync::broadcast;

const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Central event bus for broadcasting identity events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<IdentityEvent>,
}

/// Filtered receiver that yields events matching a predicate.
pub struct FilteredReceiver<F> {
    receiver: broadcast::Receiver<IdentityEvent>,
    predicate: F,
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    pub fn publish(&self, event: IdentityEvent) {
        metrics::counter!("event_bus_publish_total", "event_type" => event.event_type())
            .increment(1);
        if self.sender.send(event).is_err() {
            // no subscribers
            metrics::counter!("event_bus_publish_failed_total").increment(1);
        }
    }

    /// Subscribes to the event bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        self.sender.subscribe()
    }

    /// Subscribes with a predicate to filter events.
    #[must_use]
    pub fn subscribe_filtered<F>(&self, predicate: F) -> FilteredReceiver<F>
    where
        F: Fn(&IdentityEvent) -> bool,
    {
        FilteredReceiver {
            receiver: self.subscribe(),
            predicate,
        }
    }

    /// Subscribes to events of one type (`"inserted"`, `"updated"`, ...).
    #[must_use]
    pub fn subscribe_event_type(
        &self,
        event_type: &'static str,
    ) -> FilteredReceiver<impl Fn(&IdentityEvent) -> bool> {
        self.subscribe_filtered(move |event| event.event_type() == event_type)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl<F> FilteredReceiver<F>
where
    F: Fn(&IdentityEvent) -> bool,
{
    /// Receives the next event that matches the predicate.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Closed`] once the bus is dropped.
    pub async fn recv(&mut self) -> Result<IdentityEvent, broadcast::error::RecvError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if (self.predicate)(&event) => return Ok(event),
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                },
                Err(err) => return Err(err),
            }
        }
    }

    /// Returns the next matching event already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<IdentityEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if (self.predicate)(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {},
                Err(_) => return None,
            }
        }
    }
}

static GLOBAL_EVENT_BUS: OnceLock<EventBus> = OnceLock::new();

/// Returns the global event bus, initializing it on first use.
#[must_use]
pub fn global_event_bus() -> &'static EventBus {
    GLOBAL_EVENT_BUS.get_or_init(EventBus::default)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::models::{EventMeta, IdentityId, IdentityStatus};

    #[tokio::test]
    async fn test_subscribe_filtered_skips_non_matching() {
        let bus = EventBus::new(16);
        let mut filtered = bus.subscribe_event_type("status_changed");

        bus.publish(IdentityEvent::Inserted {
            meta: EventMeta::new(None),
            id: IdentityId::new("urn:a"),
        });
        bus.publish(IdentityEvent::StatusChanged {
            meta: EventMeta::new(Some("urn:admin".to_string())),
            id: IdentityId::new("urn:a"),
            status: IdentityStatus::Deleted,
            sequence: 1,
        });

        let event = filtered.recv().await.expect("receive event");
        assert_eq!(event.event_type(), "status_changed");
        assert_eq!(event.id().as_str(), "urn:a");
    }

    #[test]
    fn test_recv_on_blocking_caller() {
        let bus = EventBus::new(8);
        let mut roles = bus.subscribe_event_type("roles_changed");
        bus.publish(IdentityEvent::RolesChanged {
            meta: EventMeta::new(None),
            id: IdentityId::new("urn:b"),
            added: 1,
            removed: 0,
            sequence: 3,
        });

        let event = tokio_test::block_on(roles.recv()).expect("receive event");
        assert!(matches!(event, IdentityEvent::RolesChanged { sequence: 3, .. }));
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let bus = EventBus::new(4);
        bus.publish(IdentityEvent::Inserted {
            meta: EventMeta::new(None),
            id: IdentityId::new("urn:a"),
        });
        let mut receiver = bus.subscribe_event_type("inserted");
        assert!(receiver.try_recv().is_none());
    }
}
