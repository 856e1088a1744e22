//! Video directory store
//!
//! Read-mostly catalog of videos known to the pipeline. The search side
//! only ever lists and looks up; registration happens on upload.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use vss_common::models::Video;
use vss_common::Result;

/// List all videos in the directory
pub async fn list(pool: &SqlitePool) -> Result<Vec<Video>> {
    let rows = sqlx::query(
        r#"
        SELECT video_id, name, url, tags, created_at, updated_at
        FROM videos
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_video).collect()
}

/// Look up a single video by id
pub async fn get(pool: &SqlitePool, video_id: Uuid) -> Result<Option<Video>> {
    let row = sqlx::query(
        r#"
        SELECT video_id, name, url, tags, created_at, updated_at
        FROM videos
        WHERE video_id = ?
        "#,
    )
    .bind(video_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_video).transpose()
}

/// Register a video in the directory
pub async fn create(pool: &SqlitePool, video: &Video) -> Result<Video> {
    let tags = serde_json::to_string(&video.tags)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to serialize tags: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO videos (video_id, name, url, tags, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(video.video_id.to_string())
    .bind(&video.name)
    .bind(&video.url)
    .bind(&tags)
    .bind(video.created_at.to_rfc3339())
    .bind(video.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(video.clone())
}

/// Map a videos row to a Video
fn row_to_video(row: &SqliteRow) -> Result<Video> {
    let video_id: String = row.get("video_id");
    let video_id = Uuid::parse_str(&video_id)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse video_id: {}", e)))?;

    let tags: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to deserialize tags: {}", e)))?;

    let created_at: String = row.get("created_at");
    let created_at = chrono::DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    let updated_at: String = row.get("updated_at");
    let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
        .map_err(|e| vss_common::Error::Internal(format!("Failed to parse updated_at: {}", e)))?
        .with_timezone(&chrono::Utc);

    Ok(Video {
        video_id,
        name: row.get("name"),
        url: row.get("url"),
        tags,
        created_at,
        updated_at,
    })
}
