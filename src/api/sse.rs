//! Server-Sent Events stream of hub notices.
//!
//! Each connection registers one observer. When the client goes away the
//! receiver is dropped and the hub prunes the observer on its next send.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use super::AppState;

/// GET /events - SSE notice stream
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.engine.subscribe();
    debug!(observer = %subscription.id, "SSE observer connected");

    let stream = UnboundedReceiverStream::new(subscription.rx).filter_map(|notice| async move {
        match Event::default().event(notice.kind()).json_data(&notice) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!("failed to encode notice: {e}");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
