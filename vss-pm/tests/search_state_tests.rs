//! Integration tests for search orchestration
//!
//! Exercises the full query lifecycle against an in-memory database and
//! shim doubles: creation, re-runs, failure containment, result
//! enrichment and the watch sync batch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

use vss_common::events::{EventBus, VssEvent};
use vss_common::models::{
    QueryStatus, ResultMetadata, SearchResult, ShimQuery, ShimResultSet, ShimSearchResponse, Video,
};
use vss_pm::event_worker::run_event_worker;
use vss_pm::services::{SearchShim, SearchStateService, ShimError};

/// Build a minimal search hit pointing at a video id
fn hit(video_id: &str) -> SearchResult {
    SearchResult {
        metadata: ResultMetadata {
            video_id: video_id.to_string(),
            extra: serde_json::Map::new(),
        },
        video: None,
        extra: serde_json::Map::new(),
    }
}

/// Shim double that answers every query with the same fixed hits
struct EchoShim {
    video_ids: Vec<String>,
}

#[async_trait]
impl SearchShim for EchoShim {
    async fn search(&self, batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        let results = batch
            .iter()
            .map(|q| ShimResultSet {
                query_id: q.query_id,
                results: self.video_ids.iter().map(|id| hit(id)).collect(),
            })
            .collect();

        Ok(ShimSearchResponse { results })
    }
}

/// Shim double that always fails at the network layer
struct FailShim;

#[async_trait]
impl SearchShim for FailShim {
    async fn search(&self, _batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        Err(ShimError::Network("connection refused".to_string()))
    }
}

/// Shim double that answers with an empty response
struct EmptyShim;

#[async_trait]
impl SearchShim for EmptyShim {
    async fn search(&self, _batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        Ok(ShimSearchResponse::default())
    }
}

/// Shim double that answers for a query id nobody asked about
struct MismatchedShim;

#[async_trait]
impl SearchShim for MismatchedShim {
    async fn search(&self, _batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        Ok(ShimSearchResponse {
            results: vec![ShimResultSet {
                query_id: Uuid::new_v4(),
                results: vec![hit("stray")],
            }],
        })
    }
}

/// Shim double that fails queries whose text contains "fail"
struct SelectiveShim;

#[async_trait]
impl SearchShim for SelectiveShim {
    async fn search(&self, batch: &[ShimQuery]) -> Result<ShimSearchResponse, ShimError> {
        if batch.iter().any(|q| q.query.contains("fail")) {
            return Err(ShimError::Api(500, "embedding index offline".to_string()));
        }

        let results = batch
            .iter()
            .map(|q| ShimResultSet {
                query_id: q.query_id,
                results: vec![hit("match")],
            })
            .collect();

        Ok(ShimSearchResponse { results })
    }
}

/// Build a service over an in-memory database and the given shim double
async fn test_service(shim: Arc<dyn SearchShim>) -> (SearchStateService, SqlitePool, EventBus) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    vss_pm::db::init_tables(&pool)
        .await
        .expect("Failed to initialize schema");

    let event_bus = EventBus::new(100);
    let service = SearchStateService::new(pool.clone(), event_bus.clone(), shim);

    (service, pool, event_bus)
}

/// Collect buffered events until the bus goes quiet
async fn drain_events(rx: &mut broadcast::Receiver<VssEvent>) -> Vec<VssEvent> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
        events.push(event);
    }
    events
}

/// Wait for an event matching the predicate, skipping everything else
async fn wait_for<F>(rx: &mut broadcast::Receiver<VssEvent>, pred: F) -> Option<VssEvent>
where
    F: Fn(&VssEvent) -> bool,
{
    loop {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Ok(event)) if pred(&event) => return Some(event),
            Ok(Ok(_)) => continue,
            Ok(Err(_)) | Err(_) => return None,
        }
    }
}

#[tokio::test]
async fn test_new_query_starts_running_with_unique_ids() {
    let (service, pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let a = service
        .new_query("forklift near dock", vec!["warehouse".to_string()])
        .await
        .unwrap();
    let b = service.new_query("forklift near dock", vec![]).await.unwrap();

    assert_ne!(a.query_id, b.query_id);
    assert_eq!(a.status, QueryStatus::Running);
    assert!(!a.watch);

    // Persisted row matches what the caller got back
    let stored = vss_pm::db::queries::read(&pool, a.query_id)
        .await
        .unwrap()
        .expect("query not stored");
    assert_eq!(stored.query, "forklift near dock");
    assert_eq!(stored.status, QueryStatus::Running);
    assert_eq!(stored.tags, vec!["warehouse".to_string()]);
    assert_eq!(stored.results.as_ref().map(|r| r.len()), Some(0));
}

#[tokio::test]
async fn test_new_query_rejects_blank_text() {
    let (service, pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let err = service.new_query("   ", vec![]).await.unwrap_err();
    assert!(matches!(err, vss_common::Error::InvalidInput(_)));

    // Nothing was stored
    let all = vss_pm::db::queries::read_all(&pool).await.unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn test_successful_re_run_settles_idle_with_results() {
    let shim = EchoShim {
        video_ids: vec!["vid-a".to_string(), "vid-b".to_string()],
    };
    let (service, pool, _bus) = test_service(Arc::new(shim)).await;

    let created = service.new_query("red truck", vec![]).await.unwrap();
    let updated = service
        .re_run_query(created.query_id)
        .await
        .unwrap()
        .expect("successful run should return the refreshed record");

    assert_eq!(updated.status, QueryStatus::Idle);
    let results = updated.results.expect("results missing");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metadata.video_id, "vid-a");
    assert_eq!(results[1].metadata.video_id, "vid-b");

    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueryStatus::Idle);
    assert_eq!(stored.results.map(|r| r.len()), Some(2));
}

#[tokio::test]
async fn test_failing_shim_settles_idle_without_error() {
    let (service, pool, _bus) = test_service(Arc::new(FailShim)).await;

    let created = service.new_query("red truck", vec![]).await.unwrap();
    let outcome = service.re_run_query(created.query_id).await.unwrap();

    assert!(outcome.is_none());

    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueryStatus::Idle);
}

#[tokio::test]
async fn test_re_run_unknown_query_is_not_found() {
    let (service, _pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let err = service.re_run_query(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, vss_common::Error::NotFound(_)));
}

#[tokio::test]
async fn test_empty_shim_response_resets_status_to_idle() {
    let (service, pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let created = service.new_query("night shift", vec![]).await.unwrap();

    // Seed an earlier result set so we can see it survive the empty run
    service
        .update_results(created.query_id, &[hit("old-hit")])
        .await
        .unwrap();

    let outcome = service.re_run_query(created.query_id).await.unwrap();
    assert!(outcome.is_none());

    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueryStatus::Idle);
    // Previous results are retained, only the status was reset
    let results = stored.results.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.video_id, "old-hit");
}

#[tokio::test]
async fn test_mismatched_result_set_resets_status_to_idle() {
    let (service, pool, _bus) = test_service(Arc::new(MismatchedShim)).await;

    let created = service.new_query("red truck", vec![]).await.unwrap();
    let outcome = service.re_run_query(created.query_id).await.unwrap();

    assert!(outcome.is_none());

    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueryStatus::Idle);
    // The stray set was never merged
    assert_eq!(stored.results.map(|r| r.len()), Some(0));
}

#[tokio::test]
async fn test_get_queries_enriches_results_without_mutating_rows() {
    let video = Video::new("dock cam 3", None, vec!["warehouse".to_string()]);
    let shim = EchoShim {
        video_ids: vec![video.video_id.to_string(), "not-a-uuid".to_string()],
    };
    let (service, pool, _bus) = test_service(Arc::new(shim)).await;

    vss_pm::db::videos::create(&pool, &video).await.unwrap();

    let created = service.new_query("forklift", vec![]).await.unwrap();
    service.re_run_query(created.query_id).await.unwrap();

    let listed = service.get_queries().await.unwrap();
    assert_eq!(listed.len(), 1);
    let results = listed[0].results.as_ref().unwrap();
    assert_eq!(results.len(), 2);

    // Known id resolved against the directory; junk id left bare
    let enriched = results[0].video.as_ref().expect("video not enriched");
    assert_eq!(enriched.name, "dock cam 3");
    assert!(results[1].video.is_none());

    // Enrichment is read-side only: the stored blob has no video records
    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    for result in stored.results.as_ref().unwrap() {
        assert!(result.video.is_none());
    }

    // A second listing leaves the persisted record byte-identical
    service.get_queries().await.unwrap();
    let stored_again = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        serde_json::to_value(&stored).unwrap(),
        serde_json::to_value(&stored_again).unwrap()
    );
}

#[tokio::test]
async fn test_watch_round_trip_leaves_other_fields_untouched() {
    let (service, pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let created = service
        .new_query("loading bay", vec!["site-4".to_string()])
        .await
        .unwrap();

    service.add_to_watch(created.query_id).await.unwrap();
    let watched = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert!(watched.watch);
    assert_eq!(watched.updated_at, created.updated_at);

    service.remove_from_watch(created.query_id).await.unwrap();
    let unwatched = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert!(!unwatched.watch);
    assert_eq!(unwatched.query, created.query);
    assert_eq!(unwatched.status, created.status);
    assert_eq!(unwatched.tags, created.tags);
    // Toggling leaves both timestamps untouched
    assert_eq!(unwatched.created_at, created.created_at);
    assert_eq!(unwatched.updated_at, created.updated_at);
}

#[tokio::test]
async fn test_watch_unknown_query_is_not_found() {
    let (service, _pool, _bus) = test_service(Arc::new(EmptyShim)).await;

    let err = service.add_to_watch(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, vss_common::Error::NotFound(_)));
}

#[tokio::test]
async fn test_sync_searches_completes_with_partial_failures() {
    let (service, pool, bus) = test_service(Arc::new(SelectiveShim)).await;

    let ok = service.new_query("alpha dock count", vec![]).await.unwrap();
    let bad_one = service.new_query("beta fail case", vec![]).await.unwrap();
    let bad_two = service.new_query("gamma fail case", vec![]).await.unwrap();

    for id in [ok.query_id, bad_one.query_id, bad_two.query_id] {
        service.add_to_watch(id).await.unwrap();
    }

    // Subscribe after setup so only sync traffic lands in the buffer
    let mut rx = bus.subscribe();

    service.sync_searches().await.unwrap();

    let events = drain_events(&mut rx).await;
    let notifications = events
        .iter()
        .filter(|e| matches!(e, VssEvent::SearchNotification { .. }))
        .count();
    assert_eq!(notifications, 1, "expected exactly one SearchNotification");

    // Every watched query settled regardless of its shim outcome
    for id in [ok.query_id, bad_one.query_id, bad_two.query_id] {
        let stored = vss_pm::db::queries::read(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.status, QueryStatus::Idle);
    }

    let ok_row = vss_pm::db::queries::read(&pool, ok.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ok_row.results.map(|r| r.len()), Some(1));

    let bad_row = vss_pm::db::queries::read(&pool, bad_one.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bad_row.results.map(|r| r.len()), Some(0));
}

#[tokio::test]
async fn test_sync_with_nothing_watched_emits_nothing() {
    let (service, _pool, bus) = test_service(Arc::new(EmptyShim)).await;

    service.new_query("unwatched", vec![]).await.unwrap();

    let mut rx = bus.subscribe();
    service.sync_searches().await.unwrap();

    let events = drain_events(&mut rx).await;
    assert!(events.is_empty(), "unexpected events: {:?}", events);
}

#[tokio::test]
async fn test_re_run_broadcasts_running_then_idle() {
    let shim = EchoShim {
        video_ids: vec!["vid-a".to_string()],
    };
    let (service, _pool, bus) = test_service(Arc::new(shim)).await;

    let created = service.new_query("red truck", vec![]).await.unwrap();

    let mut rx = bus.subscribe();
    service.re_run_query(created.query_id).await.unwrap();

    let events = drain_events(&mut rx).await;
    let statuses: Vec<QueryStatus> = events
        .iter()
        .filter_map(|e| match e {
            VssEvent::SearchUpdate { query, .. } => Some(query.status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![QueryStatus::Running, QueryStatus::Idle]);
}

#[tokio::test]
async fn test_event_worker_executes_run_query_events() {
    let shim = EchoShim {
        video_ids: vec!["vid-a".to_string()],
    };
    let (service, pool, bus) = test_service(Arc::new(shim)).await;

    // Worker subscribed before the query is created, like at startup
    tokio::spawn(run_event_worker(service.clone(), bus.subscribe()));

    let created = service.new_query("forklift", vec![]).await.unwrap();

    // Poll until the background run settles the query
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let stored = vss_pm::db::queries::read(&pool, created.query_id)
            .await
            .unwrap()
            .unwrap();
        if stored.status == QueryStatus::Idle {
            assert_eq!(stored.results.map(|r| r.len()), Some(1));
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "query never settled to idle"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_event_worker_triggers_watch_sync() {
    let shim = EchoShim {
        video_ids: vec!["vid-a".to_string()],
    };
    let (service, pool, bus) = test_service(Arc::new(shim)).await;

    let created = service.new_query("forklift", vec![]).await.unwrap();
    service.add_to_watch(created.query_id).await.unwrap();

    tokio::spawn(run_event_worker(service.clone(), bus.subscribe()));
    let mut rx = bus.subscribe();

    bus.emit(VssEvent::EmbeddingsUpdated {
        timestamp: chrono::Utc::now(),
    })
    .unwrap();

    let notification = wait_for(&mut rx, |e| {
        matches!(e, VssEvent::SearchNotification { .. })
    })
    .await;
    assert!(notification.is_some(), "no SearchNotification after sync");

    let stored = vss_pm::db::queries::read(&pool, created.query_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, QueryStatus::Idle);
    assert_eq!(stored.results.map(|r| r.len()), Some(1));
}
