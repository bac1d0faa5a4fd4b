//! `import` subcommand: load a JSON file of locations into a SQLite collection.

use anyhow::{bail, Context, Result};
use mapcache_core::{parse_store_uri, write_collection, MapLocation, ServiceConfig, StoreLocation};
use std::path::Path;
use tracing::info;

/// Replace the configured SQLite collection with the documents in `file`.
///
/// The file holds a JSON array in the same shape the backend stores
/// (`_id` or `id`, `location`, `xy`). Returns the number of documents written.
pub fn run_import(config: &ServiceConfig, file: &Path) -> Result<usize> {
    let db_path = match parse_store_uri(&config.store_uri)? {
        StoreLocation::Sqlite(path) => path,
        StoreLocation::Http(_) => {
            bail!("import only supports SQLite stores, got {}", config.store_uri)
        }
    };

    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records: Vec<MapLocation> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse locations from {}", file.display()))?;

    let written = write_collection(&db_path, &config.collection, &records)?;
    info!(
        "Imported {} locations into {} ({})",
        written,
        db_path.display(),
        config.collection
    );
    Ok(written)
}
