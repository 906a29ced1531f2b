//! Shared application state for axum handlers.

use std::sync::Arc;

use camlink_app::event_bus::Broadcaster;
use camlink_app::services::device_state_cache::DeviceStateCache;

/// Application state shared across all axum handlers.
///
/// Generic over the cache's history store, event publisher and clock to avoid
/// dynamic dispatch. `Clone` is implemented manually so those types do not
/// need to be `Clone`. Only the `Arc` wrappers are cloned.
pub struct AppState<H, P, C> {
    /// Live event fan-out, one subscription per SSE connection.
    pub broadcaster: Arc<Broadcaster>,
    /// Latest status of every device.
    pub cache: Arc<DeviceStateCache<H, P, C>>,
}

impl<H, P, C> Clone for AppState<H, P, C> {
    fn clone(&self) -> Self {
        Self {
            broadcaster: Arc::clone(&self.broadcaster),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<H, P, C> AppState<H, P, C> {
    /// Build the state from services already shared with background tasks.
    pub fn new(broadcaster: Arc<Broadcaster>, cache: Arc<DeviceStateCache<H, P, C>>) -> Self {
        Self { broadcaster, cache }
    }
}
