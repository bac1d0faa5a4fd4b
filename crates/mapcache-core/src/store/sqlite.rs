//! SQLite-backed document collection.
//!
//! Each collection is a table of JSON documents keyed by `_id`:
//!
//! ```sql
//! CREATE TABLE maplocations (_id TEXT PRIMARY KEY, doc TEXT NOT NULL);
//! ```
//!
//! The service only ever reads; [`write_collection`] exists for the import
//! command and for seeding test databases.

use super::traits::LocationStore;
use crate::config::is_valid_collection_name;
use crate::error::{MapCacheError, Result};
use crate::models::{Coordinates, MapLocation};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Stored document body. The identifier lives in its own column.
#[derive(Debug, Serialize, Deserialize)]
struct LocationDocument {
    location: String,
    xy: Coordinates,
}

/// Read-only view of a SQLite document collection.
pub struct SqliteLocationStore {
    db_path: PathBuf,
    collection: String,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLocationStore {
    /// Open an existing database read-only.
    ///
    /// The file must already exist; the collection is checked by [`ping`](LocationStore::ping).
    pub fn open(db_path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let db_path = db_path.as_ref();
        check_collection(collection)?;

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| MapCacheError::Startup {
            message: format!("Failed to open {}: {}", db_path.display(), e),
        })?;

        Ok(Self {
            db_path: db_path.to_path_buf(),
            collection: collection.to_string(),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|e| MapCacheError::Fetch {
                message: format!("Failed to lock database: {}", e),
                source: None,
            })?;
            f(&*conn, collection.as_str())
        })
        .await
        .map_err(|e| MapCacheError::Fetch {
            message: format!("Database task failed: {}", e),
            source: None,
        })?
    }
}

#[async_trait]
impl LocationStore for SqliteLocationStore {
    async fn find_all(&self) -> Result<Vec<MapLocation>> {
        let records = self.with_conn(read_collection).await?;
        debug!(
            "Read {} documents from {}:{}",
            records.len(),
            self.db_path.display(),
            self.collection
        );
        Ok(records)
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn, collection| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [collection],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Err(MapCacheError::Fetch {
                    message: format!("collection {} does not exist", collection),
                    source: None,
                });
            }
            Ok(())
        })
        .await
    }

    fn describe(&self) -> String {
        format!("sqlite {} ({})", self.db_path.display(), self.collection)
    }
}

fn check_collection(collection: &str) -> Result<()> {
    if is_valid_collection_name(collection) {
        Ok(())
    } else {
        Err(MapCacheError::Config {
            message: format!("invalid collection name {:?}", collection),
        })
    }
}

fn read_collection(conn: &Connection, collection: &str) -> Result<Vec<MapLocation>> {
    let sql = format!("SELECT _id, doc FROM {} ORDER BY rowid", collection);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (id, doc) = row?;
        let doc: LocationDocument = serde_json::from_str(&doc)
            .map_err(|e| MapCacheError::decode(e, format!("document {}", id)))?;
        records.push(MapLocation {
            id,
            location: doc.location,
            xy: doc.xy,
        });
    }
    Ok(records)
}

/// Replace the contents of a collection, creating the database and table if needed.
///
/// Runs in one transaction, so a concurrent reader sees either the old or the
/// new contents. Returns the number of documents written.
pub fn write_collection(
    db_path: impl AsRef<Path>,
    collection: &str,
    records: &[MapLocation],
) -> Result<usize> {
    let db_path = db_path.as_ref();
    check_collection(collection)?;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MapCacheError::Io {
            message: format!("Failed to create database directory: {}", e),
            path: Some(parent.to_path_buf()),
            source: Some(e),
        })?;
    }

    let mut conn = Connection::open(db_path).map_err(MapCacheError::write)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (_id TEXT PRIMARY KEY, doc TEXT NOT NULL);",
        collection
    ))
    .map_err(MapCacheError::write)?;

    let tx = conn.transaction().map_err(MapCacheError::write)?;
    tx.execute(&format!("DELETE FROM {}", collection), []).map_err(MapCacheError::write)?;
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} (_id, doc) VALUES (?1, ?2)",
                collection
            ))
            .map_err(MapCacheError::write)?;
        for record in records {
            let doc = serde_json::to_string(&LocationDocument {
                location: record.location.clone(),
                xy: record.xy,
            })
            .map_err(MapCacheError::encode)?;
            stmt.execute(params![record.id, doc]).map_err(MapCacheError::write)?;
        }
    }
    tx.commit().map_err(MapCacheError::write)?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<MapLocation> {
        vec![
            MapLocation::new("b", "Bridge", 4.0, 1.0),
            MapLocation::new("a", "Abbey", -2.5, 7.25),
        ]
    }

    #[tokio::test]
    async fn test_find_all_preserves_insertion_order() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("map.db");
        write_collection(&db, "maplocations", &sample()).unwrap();

        let store = SqliteLocationStore::open(&db, "maplocations").unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.find_all().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_rewrite_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("map.db");
        write_collection(&db, "maplocations", &sample()).unwrap();
        let store = SqliteLocationStore::open(&db, "maplocations").unwrap();

        let replacement = vec![MapLocation::new("c", "Camp", 0.0, 0.0)];
        write_collection(&db, "maplocations", &replacement).unwrap();

        assert_eq!(store.find_all().await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_ping_missing_collection() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("map.db");
        write_collection(&db, "other", &sample()).unwrap();

        let store = SqliteLocationStore::open(&db, "maplocations").unwrap();
        assert!(store.ping().await.is_err());
    }

    #[test]
    fn test_open_missing_file_is_startup_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = SqliteLocationStore::open(temp_dir.path().join("absent.db"), "maplocations");
        assert!(matches!(result, Err(MapCacheError::Startup { .. })));
    }

    #[test]
    fn test_invalid_collection_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let result = write_collection(temp_dir.path().join("map.db"), "x; DROP", &sample());
        assert!(matches!(result, Err(MapCacheError::Config { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_write_error_and_keeps_contents() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("map.db");
        write_collection(&db, "maplocations", &sample()).unwrap();

        let duplicated = vec![
            MapLocation::new("d", "Dock", 1.0, 1.0),
            MapLocation::new("d", "Dune", 2.0, 2.0),
        ];
        let err = write_collection(&db, "maplocations", &duplicated).unwrap_err();
        assert!(matches!(err, MapCacheError::Write { .. }));
        assert!(!err.is_fetch_failure());

        // The failed transaction rolled back
        let store = SqliteLocationStore::open(&db, "maplocations").unwrap();
        assert_eq!(store.find_all().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_malformed_document_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let db = temp_dir.path().join("map.db");
        write_collection(&db, "maplocations", &sample()).unwrap();
        {
            let conn = Connection::open(&db).unwrap();
            conn.execute(
                "INSERT INTO maplocations (_id, doc) VALUES ('z', '{\"location\":\"Nowhere\"}')",
                [],
            )
            .unwrap();
        }

        let store = SqliteLocationStore::open(&db, "maplocations").unwrap();
        let err = store.find_all().await.unwrap_err();
        assert!(matches!(err, MapCacheError::Decode { .. }));
        assert!(err.is_fetch_failure());
    }
}
