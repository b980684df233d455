// crates/server/src/routes.rs
//! Live view endpoints.
//!
//! - `GET /`       — full bootstrap HTML document (history so far)
//! - `GET /events` — SSE stream; one event per subsequently published
//!   message, payload = JSON-encoded HTML fragment, plus keep-alive comments

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::Html,
    routing::get,
    Router,
};

use crate::watch::WatchState;

/// Build the watch router for one session.
pub fn router(state: Arc<WatchState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/events", get(events))
        .with_state(state)
}

/// GET / — the full history rendered as one self-contained page.
async fn index(State(state): State<Arc<WatchState>>) -> Html<String> {
    Html(state.bootstrap_document().await)
}

/// GET /events — persistent event stream for this viewer.
///
/// The subscription starts at connection time: fragments published earlier
/// are covered by the bootstrap document, not replayed here. Disconnecting
/// drops the stream, which unregisters the subscriber.
async fn events(
    State(state): State<Arc<WatchState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.broadcaster().subscribe();
    let guard = SubscriptionGuard {
        id: subscription.id,
        state: state.clone(),
    };
    let mut rx = subscription.rx;

    let stream = async_stream::stream! {
        // Owned by the stream: dropping the connection unregisters us.
        let _guard = guard;
        while let Some(payload) = rx.recv().await {
            yield Ok(Event::default().data(payload));
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

struct SubscriptionGuard {
    id: u64,
    state: Arc<WatchState>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.state.broadcaster().unsubscribe(self.id);
    }
}
