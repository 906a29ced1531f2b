//! JSON and SSE handler modules.

pub mod devices;
pub mod sse;

use axum::Router;
use axum::routing::get;

use camlink_app::ports::{Clock, EventPublisher, HistoryStore};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<H, P, C>() -> Router<AppState<H, P, C>>
where
    H: HistoryStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/devices", get(devices::list::<H, P, C>))
        .route("/devices/{client_id}/status", get(devices::status::<H, P, C>))
        .route("/events/stream", get(sse::stream::<H, P, C>))
}
