//! Server-Sent Events (SSE) stream of live gateway events.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use camlink_app::ports::{Clock, EventPublisher, HistoryStore};

use crate::state::AppState;

/// `GET /api/events/stream` — one broadcaster subscription per connection.
///
/// Each event goes out as an SSE frame named after its kind (`status`, `dht`,
/// `log`, …) with the JSON body as `data`. The first frame is always
/// `connected`. When the client goes away the receiver is dropped and the
/// broadcaster forgets the subscriber on its next publish.
pub async fn stream<H, P, C>(
    State(state): State<AppState<H, P, C>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>
where
    H: HistoryStore + Send + Sync + 'static,
    P: EventPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let subscription = state.broadcaster.subscribe();
    tracing::debug!(subscriber_id = %subscription.id, "sse stream opened");

    let events = ReceiverStream::new(subscription.receiver).filter_map(|event| {
        match event.data() {
            Ok(data) => Some(Ok(Event::default().event(event.kind()).data(data.to_string()))),
            Err(err) => {
                tracing::warn!(%err, kind = event.kind(), "failed to serialize live event");
                None
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
