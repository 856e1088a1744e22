//! Search state orchestration
//!
//! Owns the search query lifecycle: creation, re-runs against the shim,
//! the watch list, and result enrichment on the read path.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use sqlx::SqlitePool;
use tracing::{error, info, warn};
use uuid::Uuid;
use vss_common::events::{EventBus, VssEvent};
use vss_common::models::{
    QueryStatus, SearchQuery, SearchResult, ShimQuery, ShimSearchResponse, Video,
};
use vss_common::{Error, Result};

use crate::db::{queries, tags, videos};
use crate::services::search_shim::SearchShim;

/// Search query orchestrator
///
/// Constructed once at assembly with the database pool, the event bus and
/// a shim client; cheap to clone into workers and handlers.
#[derive(Clone)]
pub struct SearchStateService {
    db: SqlitePool,
    event_bus: EventBus,
    shim: Arc<dyn SearchShim>,
}

impl SearchStateService {
    pub fn new(db: SqlitePool, event_bus: EventBus, shim: Arc<dyn SearchShim>) -> Self {
        Self {
            db,
            event_bus,
            shim,
        }
    }

    /// List all queries, with results enriched from the video directory
    ///
    /// Each result whose `metadata.video_id` resolves against the directory
    /// gets its transient `video` field filled in. Unknown or unparseable
    /// ids leave the field unset. Never writes.
    pub async fn get_queries(&self) -> Result<Vec<SearchQuery>> {
        let mut all = queries::read_all(&self.db).await?;

        let videos = videos::list(&self.db).await?;
        let videos_by_id: HashMap<Uuid, Video> = videos
            .into_iter()
            .map(|video| (video.video_id, video))
            .collect();

        for query in &mut all {
            let Some(results) = query.results.as_mut() else {
                continue;
            };
            for result in results.iter_mut() {
                if let Ok(video_id) = Uuid::parse_str(&result.metadata.video_id) {
                    if let Some(video) = videos_by_id.get(&video_id) {
                        result.video = Some(video.clone());
                    }
                }
            }
        }

        Ok(all)
    }

    /// Create a query and kick off its first run
    ///
    /// Blank query text is rejected. The record is persisted as `running`
    /// and a RunQuery event is emitted for the worker; the caller gets the
    /// record back immediately, before the shim has been contacted.
    pub async fn new_query(&self, query_text: &str, query_tags: Vec<String>) -> Result<SearchQuery> {
        if query_text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "query text must not be empty".to_string(),
            ));
        }

        let query = SearchQuery::new(query_text, query_tags);

        info!(query_id = %query.query_id, query = %query.query, "Creating search query");

        let created = queries::create(&self.db, &query).await?;
        tags::record_tags(&self.db, &created.tags).await?;

        if self
            .event_bus
            .emit(VssEvent::RunQuery {
                query_id: created.query_id,
                timestamp: chrono::Utc::now(),
            })
            .is_err()
        {
            warn!(query_id = %created.query_id, "RunQuery event had no subscribers");
        }

        Ok(created)
    }

    /// Put a query on the watch list
    pub async fn add_to_watch(&self, query_id: Uuid) -> Result<()> {
        queries::update_watch(&self.db, query_id, true).await
    }

    /// Take a query off the watch list
    pub async fn remove_from_watch(&self, query_id: Uuid) -> Result<()> {
        queries::update_watch(&self.db, query_id, false).await
    }

    /// Re-run a single query against the shim
    ///
    /// An unknown id is an error to the caller. Everything that goes wrong
    /// after dispatch is contained here: the query settles back to `idle`,
    /// the problem is logged, and `Ok(None)` is returned. Every terminal
    /// path leaves the query re-runnable.
    pub async fn re_run_query(&self, query_id: Uuid) -> Result<Option<SearchQuery>> {
        let query = queries::read(&self.db, query_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Query {} not found", query_id)))?;

        let updated = queries::update_status(&self.db, query_id, QueryStatus::Running).await?;
        self.broadcast_update(updated);

        match self.dispatch_and_merge(&query).await {
            Ok(Some(fresh)) => Ok(Some(fresh)),
            Ok(None) => {
                self.settle_idle(query_id).await;
                Ok(None)
            }
            Err(e) => {
                error!(query_id = %query_id, "Search run failed: {}", e);
                self.settle_idle(query_id).await;
                Ok(None)
            }
        }
    }

    /// Dispatch to the shim and merge the matching result set
    ///
    /// `Ok(None)` means the shim answered but carried nothing for this
    /// query (empty response, or no set with a matching id).
    async fn dispatch_and_merge(&self, query: &SearchQuery) -> Result<Option<SearchQuery>> {
        let response = self.run_search(query).await?;

        if response.results.is_empty() {
            warn!(query_id = %query.query_id, "No results found for query");
            return Ok(None);
        }

        match response
            .results
            .into_iter()
            .find(|set| set.query_id == query.query_id)
        {
            Some(set) => self.update_results(query.query_id, &set.results).await,
            None => {
                warn!(query_id = %query.query_id, "Shim response carried no result set for this query");
                Ok(None)
            }
        }
    }

    /// Send a single-element batch to the shim
    async fn run_search(&self, query: &SearchQuery) -> Result<ShimSearchResponse> {
        let batch = [ShimQuery {
            query: query.query.clone(),
            query_id: query.query_id,
            tags: query.tags.clone(),
        }];

        self.shim
            .search(&batch)
            .await
            .map_err(|e| Error::Internal(format!("Search shim request failed: {}", e)))
    }

    /// Merge a result set and settle the query at `idle`
    ///
    /// Returns the refreshed record, or `None` when the store no longer
    /// has the query.
    pub async fn update_results(
        &self,
        query_id: Uuid,
        results: &[SearchResult],
    ) -> Result<Option<SearchQuery>> {
        let Some(query) = queries::add_results(&self.db, query_id, results).await? else {
            return Ok(None);
        };

        let settled = queries::update_status(&self.db, query.query_id, QueryStatus::Idle).await?;
        self.broadcast_update(settled.clone());

        Ok(Some(settled))
    }

    /// Re-run every watched query after an embedding update
    ///
    /// Re-runs execute concurrently; a failure in one never aborts the
    /// others. Exactly one SearchNotification follows the batch, and none
    /// is emitted when nothing is watched. The watch list is the snapshot
    /// read at entry: a toggle while the batch is in flight takes effect
    /// on the next sync.
    pub async fn sync_searches(&self) -> Result<()> {
        let all = queries::read_all(&self.db).await?;

        let watched: Vec<SearchQuery> = all.into_iter().filter(|q| q.watch).collect();

        if watched.is_empty() {
            return Ok(());
        }

        info!(count = watched.len(), "Re-running watched queries");

        let re_runs = watched.iter().map(|query| {
            let service = self.clone();
            let query_id = query.query_id;
            async move {
                if let Err(e) = service.re_run_query(query_id).await {
                    warn!(query_id = %query_id, "Watched re-run failed: {}", e);
                }
            }
        });

        join_all(re_runs).await;

        self.event_bus.emit_lossy(VssEvent::SearchNotification {
            timestamp: chrono::Utc::now(),
        });

        Ok(())
    }

    /// Park a query back at `idle` after a run that produced nothing
    ///
    /// Best effort: a storage error here is logged, not propagated, so the
    /// failure path never raises.
    async fn settle_idle(&self, query_id: Uuid) {
        match queries::update_status(&self.db, query_id, QueryStatus::Idle).await {
            Ok(updated) => self.broadcast_update(updated),
            Err(e) => error!(query_id = %query_id, "Failed to settle query back to idle: {}", e),
        }
    }

    fn broadcast_update(&self, query: SearchQuery) {
        self.event_bus.emit_lossy(VssEvent::SearchUpdate {
            query,
            timestamp: chrono::Utc::now(),
        });
    }
}
