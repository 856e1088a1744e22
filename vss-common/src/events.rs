//! Event types for the VSS event system
//!
//! Provides the shared event definitions and the EventBus used to wire the
//! pipeline-manager components together.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{SearchQuery, Video};

/// VSS event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission. All components exchange events through this central enum
/// for type safety and exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VssEvent {
    /// A search query should be (re)run against the search shim
    ///
    /// Triggers:
    /// - Search worker: dispatch the query to the shim and merge results
    RunQuery {
        /// Query UUID to re-run
        query_id: Uuid,
        /// When the run was requested
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The embedding store changed (new video content indexed)
    ///
    /// Triggers:
    /// - Search worker: re-run every query on the watch list
    EmbeddingsUpdated {
        /// When the update was reported
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A query's status or results changed
    ///
    /// Triggers:
    /// - SSE: push the updated record to all connected UIs
    SearchUpdate {
        /// Snapshot of the query after the change
        query: SearchQuery,
        /// When the change happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A watch re-run batch completed
    ///
    /// Emitted once per batch, regardless of how many queries were re-run
    /// or how many of them failed.
    ///
    /// Triggers:
    /// - SSE: let UIs know fresh watched results are available
    SearchNotification {
        /// When the batch finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A video was registered in the directory
    ///
    /// Triggers:
    /// - SSE: refresh library views
    VideoAdded {
        /// The new directory record
        video: Video,
        /// When the video was registered
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl VssEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            VssEvent::RunQuery { .. } => "RunQuery",
            VssEvent::EmbeddingsUpdated { .. } => "EmbeddingsUpdated",
            VssEvent::SearchUpdate { .. } => "SearchUpdate",
            VssEvent::SearchNotification { .. } => "SearchNotification",
            VssEvent::VideoAdded { .. } => "VideoAdded",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// The bus is constructed once at service assembly and handed to every
/// component that produces or consumes events.
///
/// # Examples
///
/// ```
/// use vss_common::events::{EventBus, VssEvent};
/// use uuid::Uuid;
///
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(VssEvent::RunQuery {
///     query_id: Uuid::new_v4(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VssEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    ///   Recommended values:
    ///   - Production: 100-1000
    ///   - Testing: 10-100
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<VssEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: VssEvent) -> Result<usize, broadcast::error::SendError<VssEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for events where it's acceptable if no component is currently
    /// listening (e.g. SSE pushes with no connected client).
    pub fn emit_lossy(&self, event: VssEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
