//! Device status queries served from the state cache.

use axum::Json;
use axum::extract::{Path, State};

use camlink_app::ports::{Clock, EventPublisher, HistoryStore};
use camlink_domain::device::StatusView;

use crate::state::AppState;

/// `GET /api/devices` — status view of every device seen since startup.
pub async fn list<H, P, C>(State(state): State<AppState<H, P, C>>) -> Json<Vec<StatusView>>
where
    H: HistoryStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let views = state
        .cache
        .device_ids()
        .iter()
        .map(|client_id| state.cache.status_view(client_id))
        .collect();
    Json(views)
}

/// `GET /api/devices/{client_id}/status`
///
/// Unknown devices answer `found: false` rather than 404.
pub async fn status<H, P, C>(
    State(state): State<AppState<H, P, C>>,
    Path(client_id): Path<String>,
) -> Json<StatusView>
where
    H: HistoryStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    Json(state.cache.status_view(&client_id))
}
