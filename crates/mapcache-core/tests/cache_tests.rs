//! Integration tests for the refresh coordinator against real and scripted backends.
//!
//! These tests exercise the lock discipline end to end: cold fills under
//! contention, wholesale replacement, failure handling, and concurrent
//! readers racing the refresher.

use async_trait::async_trait;
use mapcache_core::{
    write_collection, LocationStore, MapCacheError, MapLocation, MemoryLocationStore,
    RefreshCoordinator, SqliteLocationStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

fn set_a() -> Vec<MapLocation> {
    vec![
        MapLocation::new("a1", "Ashford", 1.0, 1.0),
        MapLocation::new("a2", "Amberlee", 2.0, 2.0),
        MapLocation::new("a3", "Aldmoor", 3.0, 3.0),
    ]
}

fn set_b() -> Vec<MapLocation> {
    vec![
        MapLocation::new("b1", "Brightwater", -1.0, 4.5),
        MapLocation::new("b2", "Bramble", -2.0, 5.5),
    ]
}

/// Backend that alternates between two record sets and yields mid-fetch.
struct AlternatingStore {
    calls: AtomicUsize,
}

#[async_trait]
impl LocationStore for AlternatingStore {
    async fn find_all(&self) -> mapcache_core::Result<Vec<MapLocation>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(if call % 2 == 0 { set_a() } else { set_b() })
    }

    async fn ping(&self) -> mapcache_core::Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "alternating".to_string()
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_cold_requests_fetch_once() {
    let store = Arc::new(MemoryLocationStore::new(set_a()));
    store.set_latency(Duration::from_millis(500));
    let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), FETCH_TIMEOUT));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.handle_request().await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        let records = result.unwrap().unwrap();
        assert_eq!(&*records, set_a().as_slice());
    }
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_cold_fill_lets_next_waiter_fetch() {
    let store = Arc::new(MemoryLocationStore::unavailable());
    store.set_latency(Duration::from_millis(100));
    let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), FETCH_TIMEOUT));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.handle_request().await })
    };
    tokio::task::yield_now().await;
    // Queued behind the failing fill; the backend recovers meanwhile
    store.set_records(set_b());
    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.handle_request().await })
    };

    assert!(first.await.unwrap().is_err());
    assert_eq!(&*second.await.unwrap().unwrap(), set_b().as_slice());
    assert_eq!(store.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_observe_mixed_snapshots() {
    let store = Arc::new(AlternatingStore {
        calls: AtomicUsize::new(0),
    });
    let coordinator = Arc::new(RefreshCoordinator::new(store, FETCH_TIMEOUT));

    let mut readers = Vec::new();
    let mut writers = Vec::new();
    for i in 0..64 {
        let coordinator = coordinator.clone();
        if i % 8 == 0 {
            writers.push(tokio::spawn(async move { coordinator.refresh().await }));
        } else {
            readers.push(tokio::spawn(async move { coordinator.handle_request().await }));
        }
    }

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    for reader in readers {
        let records = reader.await.unwrap().unwrap();
        assert!(
            &*records == set_a().as_slice() || &*records == set_b().as_slice(),
            "torn read: {:?}",
            records
        );
    }
}

#[tokio::test]
async fn test_repeated_reads_are_byte_identical() {
    let store = Arc::new(MemoryLocationStore::new(set_a()));
    let coordinator = RefreshCoordinator::new(store, FETCH_TIMEOUT);

    let first = serde_json::to_vec(&*coordinator.handle_request().await.unwrap()).unwrap();
    for _ in 0..5 {
        let next = serde_json::to_vec(&*coordinator.handle_request().await.unwrap()).unwrap();
        assert_eq!(first, next);
    }
}

#[tokio::test]
async fn test_sqlite_refresh_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("map.db");
    write_collection(&db, "maplocations", &set_a()).unwrap();

    let store = Arc::new(SqliteLocationStore::open(&db, "maplocations").unwrap());
    let coordinator = RefreshCoordinator::new(store, FETCH_TIMEOUT);

    assert_eq!(&*coordinator.handle_request().await.unwrap(), set_a().as_slice());

    // Backend changes are invisible until a refresh
    write_collection(&db, "maplocations", &set_b()).unwrap();
    assert_eq!(&*coordinator.handle_request().await.unwrap(), set_a().as_slice());

    coordinator.refresh().await.unwrap();
    assert_eq!(&*coordinator.handle_request().await.unwrap(), set_b().as_slice());

    // A broken document fails the whole refresh and keeps set B
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute(
            "INSERT INTO maplocations (_id, doc) VALUES ('bad', 'not json')",
            [],
        )
        .unwrap();
    }
    let err = coordinator.refresh().await.unwrap_err();
    assert!(matches!(err, MapCacheError::Decode { .. }));
    assert_eq!(&*coordinator.handle_request().await.unwrap(), set_b().as_slice());
}

mod http_backend {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use mapcache_core::HttpLocationStore;
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/data", addr)
    }

    #[tokio::test]
    async fn test_fetches_documents() {
        let app = Router::new().route(
            "/data/maplocations",
            get(|| async {
                Json(json!([
                    {"_id": "1", "location": "Town", "xy": {"x": 1.5, "y": 2.5}},
                    {"_id": "2", "location": "Fort", "xy": {"x": -4.0, "y": 0.0}}
                ]))
            }),
        );
        let store = HttpLocationStore::new(&serve(app).await, "maplocations").unwrap();

        store.ping().await.unwrap();
        let records = store.find_all().await.unwrap();
        assert_eq!(
            records,
            vec![
                MapLocation::new("1", "Town", 1.5, 2.5),
                MapLocation::new("2", "Fort", -4.0, 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_failure() {
        let app = Router::new().route(
            "/data/maplocations",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let store = HttpLocationStore::new(&serve(app).await, "maplocations").unwrap();

        let err = store.find_all().await.unwrap_err();
        assert!(matches!(err, MapCacheError::Network { .. }));
        assert!(err.is_fetch_failure());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.public_message(), "Failed to fetch map data");
        assert!(store.ping().await.is_err());
    }

    #[tokio::test]
    async fn test_client_timeout_keeps_cause() {
        let app = Router::new().route(
            "/data/maplocations",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "[]"
            }),
        );
        let url = format!("{}/maplocations", serve(app).await);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let err: MapCacheError = client.get(url).send().await.unwrap_err().into();

        assert!(matches!(err, MapCacheError::Network { .. }));
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(!err.to_string().contains("0ns"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_bad_body_is_decode_failure() {
        let app = Router::new().route(
            "/data/maplocations",
            get(|| async { Json(json!({"unexpected": Value::Null})) }),
        );
        let store = HttpLocationStore::new(&serve(app).await, "maplocations").unwrap();

        let err = store.find_all().await.unwrap_err();
        assert!(matches!(err, MapCacheError::Decode { .. }));
    }
}
