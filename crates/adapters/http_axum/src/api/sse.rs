//! Server-Sent Events (SSE) stream of attribute push updates.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use duolight_app::ports::EventPublisher;
use duolight_domain::event::Event as DomainEvent;

use crate::state::AppState;

/// `GET /api/events` — SSE stream of attribute changes.
///
/// Every [`DomainEvent::AttributeChanged`] published by an accessory is sent
/// as a JSON `data:` frame under the `attribute_changed` event name. The
/// stream continues until the client disconnects or the bus is closed.
pub async fn stream<P>(
    State(state): State<AppState<P>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    let event_rx = state.event_bus.subscribe();
    let event_stream = BroadcastStream::new(event_rx).filter_map(|result| match result {
        Ok(event @ DomainEvent::AttributeChanged { .. }) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event("attribute_changed").data(json))),
            Err(err) => {
                tracing::warn!(%err, "failed to serialize event to JSON for SSE stream");
                None
            }
        },
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!(
                skipped = n,
                "SSE subscriber lagged, some events were dropped"
            );
            None
        }
    });

    Sse::new(event_stream).keep_alive(KeepAlive::default())
}
