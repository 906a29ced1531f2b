//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use camlink_app::ports::{Clock, EventPublisher, HistoryStore};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and includes a [`TraceLayer`] that logs
/// each HTTP request/response at the `DEBUG` level.
pub fn build<H, P, C>(state: AppState<H, P, C>) -> Router
where
    H: HistoryStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use camlink_app::event_bus::Broadcaster;
    use camlink_app::ports::SystemClock;
    use camlink_app::services::device_state_cache::DeviceStateCache;

    use super::*;
    use crate::api::tests::NullHistory;

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let broadcaster = Arc::new(Broadcaster::new(8));
        let cache = Arc::new(DeviceStateCache::new(
            NullHistory,
            Arc::clone(&broadcaster),
            SystemClock,
        ));
        let app = build(AppState::new(broadcaster, cache));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
