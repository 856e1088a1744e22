//! Server-Sent Events (SSE) stream and inbound event webhooks
//!
//! The SSE stream forwards search lifecycle events to connected UI
//! clients. The embeddings-updated webhook is the entry point for the
//! data-prep service to announce a refreshed embedding index.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use vss_common::events::VssEvent;

use crate::AppState;

/// POST /events/embeddings-updated response
#[derive(Debug, Serialize)]
pub struct EmbeddingsUpdatedResponse {
    pub status: String,
}

/// GET /events - SSE event stream for search lifecycle updates
///
/// Streams events:
/// - SearchUpdate (per-query status/result changes)
/// - SearchNotification (watch sync batch completed)
/// - VideoAdded (new video registered in the directory)
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to search events");

    // Subscribe to event broadcast
    let mut rx = state.event_bus.subscribe();

    // Create stream that forwards outbound events
    let stream = async_stream::stream! {
        info!("SSE: Search event stream started");

        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                // Broadcast events
                Ok(event) = rx.recv() => {
                    // Forward UI-facing events only
                    match &event {
                        VssEvent::SearchUpdate { .. }
                        | VssEvent::SearchNotification { .. }
                        | VssEvent::VideoAdded { .. } => {
                            let event_type = event.event_type();

                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    debug!("SSE: Broadcasting event: {}", event_type);
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                        }
                        _ => {
                            // Internal pipeline events stay off the wire
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

/// POST /events/embeddings-updated
///
/// Webhook for the data-prep service. Announces that the embedding
/// index changed; the event worker reacts by re-running every watched
/// query. Returns immediately, the sync happens in the background.
pub async fn embeddings_updated(State(state): State<AppState>) -> Json<EmbeddingsUpdatedResponse> {
    info!("Embeddings update announced, scheduling watch sync");

    let emitted = state.event_bus.emit(VssEvent::EmbeddingsUpdated {
        timestamp: Utc::now(),
    });
    if emitted.is_err() {
        warn!("EmbeddingsUpdated event had no subscribers, watch sync will not run");
    }

    Json(EmbeddingsUpdatedResponse {
        status: "accepted".to_string(),
    })
}

/// Build event routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(event_stream))
        .route("/events/embeddings-updated", post(embeddings_updated))
}
