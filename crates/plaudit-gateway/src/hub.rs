//! Broadcast hub: fan-out of newly ingested comments to live observers.
//!
//! Each observer owns a bounded queue drained by its own connection task.
//! `publish` only ever does a non-blocking `try_send` per queue, so a
//! stalled observer loses events instead of holding up the others. Missed
//! history is recovered from `GET /comments` on reconnect.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use plaudit_core::Comment;
use plaudit_protocol::frames::{EventFrame, Frame};
use plaudit_protocol::names::COMMENT_CREATED;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Why a single observer missed an event. Never surfaced to publishers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("observer queue full")]
    Full,
    #[error("observer disconnected")]
    Closed,
}

pub struct Hub {
    /// Connected observers: observer_id -> event queue.
    observers: DashMap<String, mpsc::Sender<String>>,
    capacity: usize,
    event_seq: AtomicU64,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        Self {
            observers: DashMap::new(),
            capacity: capacity.max(1),
            event_seq: AtomicU64::new(0),
        }
    }

    /// Add an observer to the fan-out set. The receiver yields serialized frames.
    pub fn register(&self) -> (String, mpsc::Receiver<String>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.observers.insert(id.clone(), tx);
        info!(observer_id = %id, observers = self.observers.len(), "observer registered");
        (id, rx)
    }

    /// Remove an observer. Returns false if it was already gone.
    pub fn disconnect(&self, observer_id: &str) -> bool {
        let removed = self.observers.remove(observer_id).is_some();
        if removed {
            info!(observer_id, observers = self.observers.len(), "observer removed");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Monotonically increasing sequence for broadcast events.
    pub fn next_seq(&self) -> u64 {
        self.event_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `comment-created` to every observer. Returns how many accepted it.
    pub fn publish(&self, comment: &Comment) -> usize {
        let event = EventFrame::new(COMMENT_CREATED, comment).with_seq(self.next_seq());
        let frame = Frame::from(event);
        match frame.to_text() {
            Ok(payload) => self.broadcast(payload),
            Err(e) => {
                warn!(id = %comment.id, error = %e, "could not serialize comment event");
                0
            }
        }
    }

    /// Push a pre-serialized frame to all observers, best effort.
    pub fn broadcast(&self, payload: String) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for entry in self.observers.iter() {
            match deliver(entry.value(), payload.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Closed) => closed.push(entry.key().clone()),
                Err(e) => debug!(observer_id = %entry.key(), error = %e, "event dropped"),
            }
        }

        // removal must happen after the iterator's shard guards are released
        for id in closed {
            if self.observers.remove(&id).is_some() {
                debug!(observer_id = %id, "pruned closed observer");
            }
        }

        delivered
    }
}

fn deliver(tx: &mpsc::Sender<String>, payload: String) -> Result<(), DeliveryError> {
    tx.try_send(payload).map_err(|e| match e {
        mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
        mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            name: "Ali".to_string(),
            comment: "hi".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    fn received_id(payload: &str) -> String {
        let event = Frame::parse(payload).unwrap().into_event().unwrap();
        assert_eq!(event.event, COMMENT_CREATED);
        event.payload_as::<Comment>().unwrap().id
    }

    #[test]
    fn publish_order_is_preserved_per_observer() {
        let hub = Hub::new(16);
        let (_, mut rx1) = hub.register();
        let (_, mut rx2) = hub.register();

        hub.publish(&comment("A"));
        hub.publish(&comment("B"));

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(received_id(&rx.try_recv().unwrap()), "A");
            assert_eq!(received_id(&rx.try_recv().unwrap()), "B");
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn disconnect_is_idempotent() {
        let hub = Hub::new(4);
        let (id, _rx) = hub.register();
        assert_eq!(hub.observer_count(), 1);
        assert!(hub.disconnect(&id));
        assert!(!hub.disconnect(&id));
        assert_eq!(hub.observer_count(), 0);
    }

    #[test]
    fn disconnected_observer_does_not_affect_others() {
        let hub = Hub::new(4);
        let (gone, _gone_rx) = hub.register();
        let (_, mut live_rx) = hub.register();

        hub.disconnect(&gone);
        assert_eq!(hub.publish(&comment("A")), 1);
        assert_eq!(received_id(&live_rx.try_recv().unwrap()), "A");
    }

    #[test]
    fn dropped_receiver_is_pruned_on_publish() {
        let hub = Hub::new(4);
        let (_, rx) = hub.register();
        let (_, mut live_rx) = hub.register();
        drop(rx);

        assert_eq!(hub.publish(&comment("A")), 1);
        assert_eq!(hub.observer_count(), 1);
        assert!(live_rx.try_recv().is_ok());
    }

    #[test]
    fn slow_observer_drops_without_blocking_others() {
        let hub = Hub::new(1);
        let (_, mut slow_rx) = hub.register();
        let (_, mut fast_rx) = hub.register();

        assert_eq!(hub.publish(&comment("A")), 2);
        // fast observer drains, slow one does not
        assert_eq!(received_id(&fast_rx.try_recv().unwrap()), "A");
        assert_eq!(hub.publish(&comment("B")), 1);
        assert_eq!(received_id(&fast_rx.try_recv().unwrap()), "B");

        // slow observer keeps its place in the set and sees only what fit
        assert_eq!(hub.observer_count(), 2);
        assert_eq!(received_id(&slow_rx.try_recv().unwrap()), "A");
        assert!(slow_rx.try_recv().is_err());
    }

    #[test]
    fn publish_without_observers_is_a_no_op() {
        let hub = Hub::new(4);
        assert_eq!(hub.publish(&comment("A")), 0);
    }

    #[test]
    fn events_carry_increasing_seq() {
        let hub = Hub::new(4);
        let (_, mut rx) = hub.register();
        hub.publish(&comment("A"));
        hub.publish(&comment("B"));

        let seq = |raw: String| {
            Frame::parse(&raw).unwrap().into_event().unwrap().seq.unwrap()
        };
        let first = seq(rx.try_recv().unwrap());
        let second = seq(rx.try_recv().unwrap());
        assert!(second > first);
    }
}
