//! Clock port — source of "now" for freshness and pause-window checks.

use camlink_domain::time::Timestamp;

/// Provides the current time.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        camlink_domain::time::now()
    }
}

impl<T: Clock + Send + Sync> Clock for std::sync::Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
