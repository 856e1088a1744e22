//! Tag registry API handlers

use axum::{extract::State, routing::get, Json, Router};

use crate::{error::ApiResult, AppState};

/// GET /tags
///
/// List all known tags, sorted alphabetically. Tags accumulate from
/// search queries and video registrations and are never deleted.
pub async fn list_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let tags = crate::db::tags::list_tags(&state.db).await?;
    Ok(Json(tags))
}

/// Build tag registry routes
pub fn tag_routes() -> Router<AppState> {
    Router::new().route("/tags", get(list_tags))
}
