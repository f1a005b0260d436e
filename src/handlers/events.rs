//! GET /api/events - SSE stream of `map_update` events.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::events::MAP_UPDATE_EVENT;
use crate::state::AppState;

pub async fn map_updates(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.service.events().subscribe();
    tracing::debug!("Viewer connected to map updates");

    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(update) => {
            let json = serde_json::to_string(&update).unwrap_or_default();
            Some(Ok(Event::default().event(MAP_UPDATE_EVENT).data(json)))
        }
        Err(_) => None, // lagged: skip missed messages
    });
    // End the stream on shutdown so graceful shutdown can finish.
    let stream = futures::StreamExt::take_until(updates, state.shutdown.triggered());

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
