//! Background event worker
//!
//! Consumes control events from the bus and drives the search state
//! service: single re-runs (RunQuery) and the watch sync batch
//! (EmbeddingsUpdated). Outbound events pass through untouched.

use tokio::sync::broadcast;
use tracing::{debug, warn};
use vss_common::events::VssEvent;

use crate::services::SearchStateService;

/// Worker task reacting to RunQuery and EmbeddingsUpdated events
///
/// # Behavior
/// - A failed or unknown-id re-run is logged; the loop continues
/// - Lagged events are skipped with a warning
/// - Ends when the bus sender side is dropped
pub async fn run_event_worker(service: SearchStateService, mut rx: broadcast::Receiver<VssEvent>) {
    debug!("Search event worker started");

    loop {
        match rx.recv().await {
            Ok(VssEvent::RunQuery { query_id, .. }) => {
                if let Err(e) = service.re_run_query(query_id).await {
                    warn!(query_id = %query_id, "Re-run skipped: {}", e);
                }
            }
            Ok(VssEvent::EmbeddingsUpdated { .. }) => {
                if let Err(e) = service.sync_searches().await {
                    warn!("Watch sync failed: {}", e);
                }
            }
            Ok(_) => {
                // SearchUpdate, SearchNotification and VideoAdded are
                // outbound-only; nothing to do here
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Search event worker: lagged {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("Search event worker: event bus closed, shutting down");
                break;
            }
        }
    }

    debug!("Search event worker stopped");
}
