//! Tag catalog
//!
//! Accumulates every tag ever attached to a query or video, deduplicated,
//! to back the suggested-tags endpoint.

use sqlx::SqlitePool;
use vss_common::Result;

/// Record tags, ignoring ones already in the catalog
pub async fn record_tags(pool: &SqlitePool, tags: &[String]) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }

        sqlx::query("INSERT OR IGNORE INTO tags (tag, created_at) VALUES (?, ?)")
            .bind(tag)
            .bind(&now)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// List all known tags, sorted
pub async fn list_tags(pool: &SqlitePool) -> Result<Vec<String>> {
    let tags: Vec<(String,)> = sqlx::query_as("SELECT tag FROM tags ORDER BY tag ASC")
        .fetch_all(pool)
        .await?;

    Ok(tags.into_iter().map(|(tag,)| tag).collect())
}
