//! Search query store
//!
//! Single-record operations over the search_queries table. Tags and result
//! blobs are stored as JSON text; timestamps as RFC 3339 text.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vss_common::models::{QueryStatus, SearchQuery, SearchResult};
use vss_common::Result;

/// Read all stored queries
pub async fn read_all(pool: &SqlitePool) -> Result<Vec<SearchQuery>> {
    let rows = sqlx::query(
        r#"
        SELECT query_id, query, watch, status, tags, results, created_at, updated_at
        FROM search_queries
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_query).collect()
}

/// Read a single query by id
pub async fn read(pool: &SqlitePool, query_id: Uuid) -> Result<Option<SearchQuery>> {
    let row = sqlx::query(
        r#"
        SELECT query_id, query, watch, status, tags, results, created_at, updated_at
        FROM search_queries
        WHERE query_id = ?
        "#,
    )
    .bind(query_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_query).transpose()
}

/// Insert a new query record
///
/// The query_id primary key enforces uniqueness; inserting a duplicate id
/// surfaces as a database error.
pub async fn create(pool: &SqlitePool, query: &SearchQuery) -> Result<SearchQuery> {
    let tags = serde_json::to_string(&query.tags)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to serialize tags: {}", e)))?;
    let results = query
        .results
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| vss_common::Error::Internal(format!("Failed to serialize results: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO search_queries (
            query_id, query, watch, status, tags, results, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(query.query_id.to_string())
    .bind(&query.query)
    .bind(query.watch as i64)
    .bind(query.status.to_string())
    .bind(&tags)
    .bind(&results)
    .bind(query.created_at.to_rfc3339())
    .bind(query.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(query.clone())
}

/// Set or clear the watch flag
///
/// Leaves every other column untouched, updated_at included.
pub async fn update_watch(pool: &SqlitePool, query_id: Uuid, watch: bool) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE search_queries
        SET watch = ?
        WHERE query_id = ?
        "#,
    )
    .bind(watch as i64)
    .bind(query_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(vss_common::Error::NotFound(format!(
            "Query {} not found",
            query_id
        )));
    }

    Ok(())
}

/// Update the lifecycle status, returning the post-update record
pub async fn update_status(
    pool: &SqlitePool,
    query_id: Uuid,
    status: QueryStatus,
) -> Result<SearchQuery> {
    let result = sqlx::query(
        r#"
        UPDATE search_queries
        SET status = ?, updated_at = ?
        WHERE query_id = ?
        "#,
    )
    .bind(status.to_string())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(query_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(vss_common::Error::NotFound(format!(
            "Query {} not found",
            query_id
        )));
    }

    read(pool, query_id).await?.ok_or_else(|| {
        vss_common::Error::Internal(format!("Query {} vanished after update", query_id))
    })
}

/// Replace the stored result set, returning the updated record
///
/// Returns `None` when no record with this id exists.
pub async fn add_results(
    pool: &SqlitePool,
    query_id: Uuid,
    results: &[SearchResult],
) -> Result<Option<SearchQuery>> {
    let blob = serde_json::to_string(results)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to serialize results: {}", e)))?;

    let result = sqlx::query(
        r#"
        UPDATE search_queries
        SET results = ?, updated_at = ?
        WHERE query_id = ?
        "#,
    )
    .bind(&blob)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(query_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    read(pool, query_id).await
}

/// Map a search_queries row to a SearchQuery
fn row_to_query(row: &SqliteRow) -> Result<SearchQuery> {
    let query_id: String = row.get("query_id");
    let query_id = Uuid::parse_str(&query_id)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse query_id: {}", e)))?;

    let status: String = row.get("status");
    let status = match status.as_str() {
        "idle" => QueryStatus::Idle,
        "running" => QueryStatus::Running,
        other => {
            return Err(vss_common::Error::Internal(format!(
                "Unknown query status '{}'",
                other
            )))
        }
    };

    let tags: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to deserialize tags: {}", e)))?;

    let results: Option<String> = row.get("results");
    let results: Option<Vec<SearchResult>> = results
        .map(|blob| serde_json::from_str(&blob))
        .transpose()
        .map_err(|e| {
            vss_common::Error::Internal(format!("Failed to deserialize results: {}", e))
        })?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(SearchQuery {
        query_id,
        query: row.get("query"),
        watch: row.get::<i64, _>("watch") != 0,
        status,
        tags,
        results,
        created_at,
        updated_at,
    })
}
