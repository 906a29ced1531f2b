//! Event bus port — fan-out of live events.

use camlink_domain::event::LiveEvent;

/// Publishes live events to interested subscribers.
///
/// Publishing never waits on a subscriber, so it is synchronous.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: LiveEvent);
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: LiveEvent) {
        (**self).publish(event);
    }
}
