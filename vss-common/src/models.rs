//! Domain models for the video search pipeline
//!
//! These are the shapes persisted by the pipeline manager and served to the
//! UI. The search shim wire types live here too so client and service code
//! share one contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Search query lifecycle state
///
/// `Running` only between dispatch to the shim and the terminal response;
/// every completion path (success, empty response, failure) settles back to
/// `Idle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Idle,
    Running,
}

impl std::fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryStatus::Idle => write!(f, "idle"),
            QueryStatus::Running => write!(f, "running"),
        }
    }
}

/// A persisted search query and its latest result set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query_id: Uuid,
    pub query: String,
    pub watch: bool,
    pub status: QueryStatus,
    pub tags: Vec<String>,
    /// Latest results from the shim; `None` until the first merge writes
    /// a set (a new query starts with an empty set, not `None`).
    pub results: Option<Vec<SearchResult>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SearchQuery {
    /// Build a fresh query record ready for its first run
    ///
    /// Starts `Running` because a run is dispatched immediately after
    /// creation; `watch` always starts off.
    pub fn new(query: impl Into<String>, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            query_id: Uuid::new_v4(),
            query: query.into(),
            watch: false,
            status: QueryStatus::Running,
            tags,
            results: Some(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single search hit
///
/// The shim's payload is schema-less beyond `metadata.video_id`; unknown
/// fields are preserved through the flattened `extra` maps so stored blobs
/// round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub metadata: ResultMetadata,
    /// Directory record for `metadata.video_id`. Filled on the read path
    /// only, never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Metadata block of a search hit; `video_id` links to the video directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub video_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A video known to the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub video_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Build a directory record for a newly registered video
    pub fn new(name: impl Into<String>, url: Option<String>, tags: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            video_id: Uuid::new_v4(),
            name: name.into(),
            url,
            tags,
            created_at: now,
            updated_at: now,
        }
    }
}

// ========================================
// Search shim wire types
// ========================================

/// One entry in the batch POSTed to the search shim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimQuery {
    pub query: String,
    pub query_id: Uuid,
    pub tags: Vec<String>,
}

/// Per-query result set inside a shim response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShimResultSet {
    pub query_id: Uuid,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// Body returned by the shim for a batch search
///
/// An absent or null `results` field deserializes to an empty vec; the shim
/// omits it when nothing matched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShimSearchResponse {
    #[serde(default)]
    pub results: Vec<ShimResultSet>,
}
