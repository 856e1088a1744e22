//! Search query API handlers
//!
//! CRUD surface over the search query store plus the watch-flag toggles.
//! Creating a query returns immediately; the actual shim search runs in
//! the background via the event worker.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vss_common::models::SearchQuery;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /search request
#[derive(Debug, Deserialize)]
pub struct CreateQueryRequest {
    /// Free-text search query
    pub query: String,
    /// Optional tag filters to restrict the search
    #[serde(default)]
    pub tags: Vec<String>,
}

/// POST /search/:query_id/watch and DELETE /search/:query_id/watch response
#[derive(Debug, Serialize)]
pub struct WatchResponse {
    pub status: String,
    pub query_id: Uuid,
    pub watch: bool,
}

/// GET /search
///
/// List all search queries, newest first, with result entries enriched
/// with full video records where the referenced video is known.
pub async fn list_queries(State(state): State<AppState>) -> ApiResult<Json<Vec<SearchQuery>>> {
    let queries = state.search.get_queries().await?;
    Ok(Json(queries))
}

/// POST /search
///
/// Create a new search query and dispatch it to the search shim in the
/// background. The response carries the freshly created record in
/// `running` status; results arrive later via SSE.
pub async fn create_query(
    State(state): State<AppState>,
    Json(request): Json<CreateQueryRequest>,
) -> ApiResult<Json<SearchQuery>> {
    let created = state.search.new_query(&request.query, request.tags).await?;

    Ok(Json(created))
}

/// GET /search/:query_id
///
/// Fetch a single search query by id.
pub async fn get_query(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
) -> ApiResult<Json<SearchQuery>> {
    let query = crate::db::queries::read(&state.db, query_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Search query not found: {}", query_id)))?;

    Ok(Json(query))
}

/// POST /search/:query_id/watch
///
/// Mark a query as watched so embedding updates re-run it.
pub async fn add_to_watch(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
) -> ApiResult<Json<WatchResponse>> {
    state.search.add_to_watch(query_id).await?;

    Ok(Json(WatchResponse {
        status: "updated".to_string(),
        query_id,
        watch: true,
    }))
}

/// DELETE /search/:query_id/watch
///
/// Remove a query from the watch list.
pub async fn remove_from_watch(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
) -> ApiResult<Json<WatchResponse>> {
    state.search.remove_from_watch(query_id).await?;

    Ok(Json(WatchResponse {
        status: "updated".to_string(),
        query_id,
        watch: false,
    }))
}

/// Build search query routes
pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(list_queries))
        .route("/search", post(create_query))
        .route("/search/:query_id", get(get_query))
        .route("/search/:query_id/watch", post(add_to_watch))
        .route("/search/:query_id/watch", delete(remove_from_watch))
}
