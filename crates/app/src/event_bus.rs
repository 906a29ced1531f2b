//! In-process live-event broadcaster with one bounded queue per subscriber.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use camlink_domain::event::LiveEvent;
use camlink_domain::id::SubscriberId;

use crate::ports::EventPublisher;

/// Fans live events out to a dynamic set of subscribers.
///
/// Every subscriber owns a bounded queue. Publishing only ever calls
/// `try_send`, so a slow subscriber loses events instead of stalling the
/// others, and a dropped subscriber is forgotten on the next publish.
pub struct Broadcaster {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<LiveEvent>>>,
    queue_capacity: usize,
}

/// Receiving end of one subscription.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<LiveEvent>,
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers buffer up to `queue_capacity`
    /// events each.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a subscriber. Its queue already holds a `connected` event.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let id = SubscriberId::new();
        // the queue is empty and the receiver alive, this cannot fail
        let _ = sender.try_send(LiveEvent::Connected {
            at: camlink_domain::time::now(),
        });
        self.subscribers.lock().insert(id, sender);
        tracing::debug!(subscriber_id = %id, "subscriber registered");
        Subscription { id, receiver }
    }

    /// Forget a subscriber.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.subscribers.lock().remove(&id).is_some() {
            tracing::debug!(subscriber_id = %id, "subscriber removed");
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl EventPublisher for Broadcaster {
    fn publish(&self, event: LiveEvent) {
        let kind = event.kind();
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|id, sender| match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(subscriber_id = %id, kind, "subscriber queue full, event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(subscriber_id = %id, "subscriber gone, removing");
                false
            }
        });
    }
}
