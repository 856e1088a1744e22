//! vss-pm - Pipeline Manager Microservice
//!
//! Backend for the video search-and-summarization application. Owns
//! search query state, orchestrates the external search shim, serves
//! the video directory and pushes live updates to UI clients over SSE.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use vss_common::events::EventBus;

use vss_pm::config::PmConfig;
use vss_pm::services::{HttpSearchShim, SearchStateService};
use vss_pm::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting vss-pm (Pipeline Manager) microservice");
    info!(
        "Version: {} ({} {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP"),
    );

    // Resolve configuration: env > TOML > defaults
    let config = PmConfig::load()?;
    info!("Database: {}", config.database_path.display());
    info!("Search shim: {}", config.shim_base_url);

    // Initialize database connection pool
    let db_pool = vss_pm::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    // Create event bus for SSE broadcasting and worker dispatch
    let event_bus = EventBus::new(config.event_bus_capacity);
    info!("Event bus initialized");

    // Wire the search orchestration service to the HTTP shim client
    let shim = Arc::new(HttpSearchShim::new(&config.shim_base_url)?);
    let search = SearchStateService::new(db_pool.clone(), event_bus.clone(), shim);

    // Spawn the background event worker before accepting requests so
    // RunQuery events from early POST /search calls have a consumer
    let worker_rx = event_bus.subscribe();
    tokio::spawn(vss_pm::event_worker::run_event_worker(
        search.clone(),
        worker_rx,
    ));
    info!("Event worker started");

    // Create application state
    let state = AppState::new(db_pool, event_bus, search);

    // Build router
    let app = vss_pm::build_router(state);

    // Start server
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
