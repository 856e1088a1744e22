//! vss-pm library interface
//!
//! Exposes the application state, router and service layer for the
//! binary and for integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod event_worker;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use vss_common::events::EventBus;

use crate::services::SearchStateService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting and worker dispatch
    pub event_bus: EventBus,
    /// Search orchestration service
    pub search: SearchStateService,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, search: SearchStateService) -> Self {
        Self {
            db,
            event_bus,
            search,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::search_routes())
        .merge(api::video_routes())
        .merge(api::tag_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .with_state(state)
}
