//! Access to the remote key-value store holding the sensor readings.
//!
//! The store is a Firebase-style Realtime Database: every location is
//! readable as JSON at `{database_url}/{path}.json`. A local JSON snapshot of
//! the same shape can stand in for it via [`JsonFileStore`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use monitor_core::error::{MonitorError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Raw entries under a store location, keyed by store-assigned id.
pub type RawEntries = Map<String, Value>;

// ── StoreReader ───────────────────────────────────────────────────────────────

/// Read-only view of a key-value store.
pub trait StoreReader {
    /// Fetch the children of `path`.
    ///
    /// `Ok(None)` means the location is empty or absent; that is a normal
    /// "no data" outcome, not an error.
    fn get(&self, path: &str) -> Result<Option<RawEntries>>;
}

/// Convert a location's JSON body into entries.
///
/// The database renders objects whose keys are all small integers as JSON
/// arrays; those are mapped back to index keys, skipping `null` holes.
pub fn entries_from_value(value: Value) -> Option<RawEntries> {
    let entries = match value {
        Value::Null => return None,
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        other => {
            warn!(
                "store location holds a scalar ({}), expected a collection of readings",
                other
            );
            return None;
        }
    };
    (!entries.is_empty()).then_some(entries)
}

// ── StoreConfig ───────────────────────────────────────────────────────────────

/// Connection parameters for [`RealtimeDbClient`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the database, e.g. `https://<name>.firebaseio.com/`.
    pub database_url: String,
    /// Optional credentials file (JSON with an `auth_token` field).
    pub credentials: Option<PathBuf>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    auth_token: String,
}

/// Load the auth token from `path`.
///
/// A configured but missing file is not fatal: the client then talks to the
/// database unauthenticated, which works for public rules and local testing.
fn load_credentials(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        debug!("no credentials configured; using unauthenticated access");
        return Ok(None);
    };
    if !path.exists() {
        warn!("Service account not found: {} (skipping init)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|source| MonitorError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let creds: Credentials = serde_json::from_str(&content)?;
    debug!("loaded credentials from {}", path.display());
    Ok(Some(creds.auth_token))
}

// ── RealtimeDbClient ──────────────────────────────────────────────────────────

/// Blocking REST client for the Realtime Database.
pub struct RealtimeDbClient {
    client: reqwest::blocking::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RealtimeDbClient {
    /// Build the HTTP client and load credentials.
    pub fn connect(config: &StoreConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let auth_token = load_credentials(config.credentials.as_deref())?;
        Ok(Self {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    /// REST URL for `path` (without the auth query).
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// Whether requests carry an auth token.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

impl StoreReader for RealtimeDbClient {
    fn get(&self, path: &str) -> Result<Option<RawEntries>> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.query(&[("auth", token)]);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::StoreStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body: Value = response.json()?;
        Ok(entries_from_value(body))
    }
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// A store backed by a JSON export of the database on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StoreReader for JsonFileStore {
    fn get(&self, path: &str) -> Result<Option<RawEntries>> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            MonitorError::FileRead {
                path: self.path.clone(),
                source,
            }
        })?;
        let document: Value = serde_json::from_str(&content)?;

        let mut node = &document;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let child = match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match child {
                Some(next) => node = next,
                None => {
                    debug!("{} has no location {}", self.path.display(), path);
                    return Ok(None);
                }
            }
        }

        Ok(entries_from_value(node.clone()))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
