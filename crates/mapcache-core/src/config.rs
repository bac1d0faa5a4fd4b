//! Centralized configuration for the map location cache.
//!
//! Defaults live as associated constants on the config structs. Runtime values
//! come from the process environment, falling back to a `.env` file in the
//! working directory; the server binary layers CLI flags on top.

use crate::error::{MapCacheError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Cache timing defaults.
pub struct CacheConfig;

impl CacheConfig {
    pub const REFRESH_INTERVAL: Duration = Duration::from_secs(20);
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Storage backend defaults.
pub struct StoreConfig;

impl StoreConfig {
    pub const DEFAULT_COLLECTION: &'static str = "maplocations";
    pub const SQLITE_SCHEME: &'static str = "sqlite://";
}

/// HTTP listener defaults.
pub struct ServerConfig;

impl ServerConfig {
    pub const DEFAULT_HOST: &'static str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const MAP_ROUTE: &'static str = "/api/map";
    pub const HEALTH_ROUTE: &'static str = "/health";
}

/// Environment variable names.
pub struct EnvKeys;

impl EnvKeys {
    pub const STORE_URI: &'static str = "MAP_STORE_URI";
    pub const COLLECTION: &'static str = "MAP_COLLECTION";
    pub const REFRESH_INTERVAL_SECS: &'static str = "MAP_REFRESH_INTERVAL_SECS";
    pub const FETCH_TIMEOUT_SECS: &'static str = "MAP_FETCH_TIMEOUT_SECS";
    pub const HOST: &'static str = "MAP_HOST";
    pub const PORT: &'static str = "MAP_PORT";
    pub const DOTENV_FILE: &'static str = ".env";
}

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Connection endpoint for the storage backend. Empty until configured.
    pub store_uri: String,
    /// Collection (table or resource) holding the location documents.
    pub collection: String,
    /// Period of the background refresh.
    pub refresh_interval: Duration,
    /// Upper bound on a single backend fetch.
    pub fetch_timeout: Duration,
    pub host: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_uri: String::new(),
            collection: StoreConfig::DEFAULT_COLLECTION.to_string(),
            refresh_interval: CacheConfig::REFRESH_INTERVAL,
            fetch_timeout: CacheConfig::FETCH_TIMEOUT,
            host: ServerConfig::DEFAULT_HOST.to_string(),
            port: ServerConfig::DEFAULT_PORT,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment and `./.env`.
    ///
    /// Process variables take precedence over the file. A missing `.env` is
    /// not an error; a missing store URI is reported by [`validate`](Self::validate).
    pub fn from_env() -> Result<Self> {
        let dotenv = load_dotenv_file(Path::new(EnvKeys::DOTENV_FILE));
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(uri) = lookup(EnvKeys::STORE_URI) {
            config.store_uri = uri.trim().to_string();
        }
        if let Some(collection) = lookup(EnvKeys::COLLECTION) {
            config.collection = collection.trim().to_string();
        }
        if let Some(raw) = lookup(EnvKeys::REFRESH_INTERVAL_SECS) {
            config.refresh_interval = parse_secs(EnvKeys::REFRESH_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(EnvKeys::FETCH_TIMEOUT_SECS) {
            config.fetch_timeout = parse_secs(EnvKeys::FETCH_TIMEOUT_SECS, &raw)?;
        }
        if let Some(host) = lookup(EnvKeys::HOST) {
            config.host = host.trim().to_string();
        }
        if let Some(raw) = lookup(EnvKeys::PORT) {
            config.port = raw.trim().parse().map_err(|_| MapCacheError::Config {
                message: format!("{} must be a port number, got {:?}", EnvKeys::PORT, raw),
            })?;
        }

        Ok(config)
    }

    /// Check that the configuration can start a server.
    pub fn validate(&self) -> Result<()> {
        if self.store_uri.is_empty() {
            return Err(MapCacheError::Config {
                message: format!("{} environment variable is not set", EnvKeys::STORE_URI),
            });
        }
        if !is_valid_collection_name(&self.collection) {
            return Err(MapCacheError::Config {
                message: format!(
                    "collection name {:?} must be alphanumeric or underscore and not start with a digit",
                    self.collection
                ),
            });
        }
        if self.refresh_interval.is_zero() {
            return Err(MapCacheError::Config {
                message: "refresh interval must be greater than zero".to_string(),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(MapCacheError::Config {
                message: "fetch timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Address string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| MapCacheError::Config {
            message: format!("{} must be a whole number of seconds, got {:?}", key, raw),
        })
}

/// Collection names end up in SQL and URL paths, so only plain identifiers pass.
pub fn is_valid_collection_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Read a `.env` file into a map. Missing or unreadable files yield an empty map.
pub fn load_dotenv_file(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    parse_dotenv_contents(&contents)
}

/// Parse `KEY=value` lines, skipping blanks and `#` comments.
pub fn parse_dotenv_contents(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), parse_dotenv_value(value.trim()));
    }
    map
}

fn parse_dotenv_value(raw: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote) {
            if let Some(end) = inner.find(quote) {
                let value = &inner[..end];
                return if quote == '"' {
                    value.replace("\\n", "\n").replace("\\\"", "\"")
                } else {
                    value.to_string()
                };
            }
        }
    }

    // Unquoted values end at an inline comment
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}
