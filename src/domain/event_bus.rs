//! Broadcast channel for workflow events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Committed
//! workflow mutations publish a [`LoanEvent`] through the bus; the
//! notification/chat bridge (and any other downstream consumer) subscribes
//! to receive them. A full ring buffer drops the oldest events for lagging
//! receivers, never the publisher.

use tokio::sync::broadcast;

use super::LoanEvent;

/// Broadcast bus for [`LoanEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LoanEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that got the event. With no active
    /// receivers the event is silently dropped; the workflow outcome is
    /// already committed by the time an event is published.
    pub fn publish(&self, event: LoanEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver for all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LoanEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{LoanId, RequestId, UserId};
    use chrono::Utc;

    fn make_event(loan_id: LoanId) -> LoanEvent {
        LoanEvent::LoanFormed {
            loan_id,
            request_id: RequestId::new(),
            owner_id: UserId::new(),
            borrower_id: UserId::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(16);
        let count = bus.publish(make_event(LoanId::new()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let id = LoanId::new();
        bus.publish(make_event(id));

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected to receive event");
        };
        assert_eq!(event.event_type_str(), "loan_formed");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let count = bus.publish(make_event(LoanId::new()));
        assert_eq!(count, 2);

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.receiver_count(), 0);

        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);

        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
