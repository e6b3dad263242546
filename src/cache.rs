//! TTL cache for raw schedule responses.
//!
//! Schedule data changes rarely (service changes land a few times a year),
//! so raw responses are kept in a blob store and refreshed lazily once they
//! age past the TTL. The store is a trait so tests run against an in-memory
//! double while production uses one JSON envelope file per key.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::oba::{Fetch, FetchError};

/// Default TTL: 24 hours.
pub const DEFAULT_TTL_SECS: u64 = 86_400;

/// Errors from ensuring a cached response.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The refresh fetch failed; the stored blob was left untouched.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The blob store could not be written.
    #[error("cache store error: {message}")]
    Store { message: String },
}

/// Cache key: one stop at one agency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub agency_id: i64,
    pub stop_id: i64,
}

impl CacheKey {
    pub fn new(agency_id: i64, stop_id: i64) -> Self {
        Self { agency_id, stop_id }
    }
}

impl fmt::Display for CacheKey {
    /// External key representation, also the cache file stem.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-schedule", self.agency_id, self.stop_id)
    }
}

/// A stored response: raw bytes plus the write time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub body: Vec<u8>,
    /// Unix timestamp when the blob was written.
    pub written_at_secs: u64,
}

/// Durable backing for cached responses.
///
/// Missing or corrupt entries read as absent; the cache treats absence the
/// same as staleness and refreshes.
pub trait BlobStore {
    fn read(&self, key: &CacheKey) -> Option<Blob>;
    fn write(&self, key: &CacheKey, body: &[u8], written_at_secs: u64) -> Result<(), CacheError>;
}

impl<S: BlobStore> BlobStore for &S {
    fn read(&self, key: &CacheKey) -> Option<Blob> {
        (*self).read(key)
    }

    fn write(&self, key: &CacheKey, body: &[u8], written_at_secs: u64) -> Result<(), CacheError> {
        (*self).write(key, body, written_at_secs)
    }
}

/// On-disk envelope for one cached response.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    /// Unix timestamp when the cache was written.
    written_at_secs: u64,
    /// Raw response bytes, base64-encoded.
    body_base64: String,
}

/// Blob store writing one JSON envelope file per key.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the envelope file for `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// The store's root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BlobStore for FsBlobStore {
    fn read(&self, key: &CacheKey) -> Option<Blob> {
        let contents = std::fs::read_to_string(self.path_for(key)).ok()?;
        let envelope: CachedResponse = serde_json::from_str(&contents).ok()?;
        let body = BASE64.decode(&envelope.body_base64).ok()?;

        Some(Blob {
            body,
            written_at_secs: envelope.written_at_secs,
        })
    }

    fn write(&self, key: &CacheKey, body: &[u8], written_at_secs: u64) -> Result<(), CacheError> {
        if !self.dir.as_os_str().is_empty() && !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| CacheError::Store {
                message: format!("failed to create cache directory: {e}"),
            })?;
        }

        let envelope = CachedResponse {
            written_at_secs,
            body_base64: BASE64.encode(body),
        };

        let json = serde_json::to_string_pretty(&envelope).map_err(|e| CacheError::Store {
            message: format!("failed to serialize cache envelope: {e}"),
        })?;

        std::fs::write(self.path_for(key), json).map_err(|e| CacheError::Store {
            message: format!("failed to write cache file: {e}"),
        })
    }
}

/// In-memory blob store, the test double.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Blob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing the cache (e.g. to age it).
    pub fn insert(&self, key: &CacheKey, body: impl Into<Vec<u8>>, written_at_secs: u64) {
        self.blobs.lock().unwrap().insert(
            key.to_string(),
            Blob {
                body: body.into(),
                written_at_secs,
            },
        );
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &CacheKey) -> Option<Blob> {
        self.blobs.lock().unwrap().get(&key.to_string()).cloned()
    }

    fn write(&self, key: &CacheKey, body: &[u8], written_at_secs: u64) -> Result<(), CacheError> {
        self.insert(key, body, written_at_secs);
        Ok(())
    }
}

/// TTL cache of raw API responses, keyed by `(agency_id, stop_id)`.
///
/// Refreshes are guarded by a per-key async lock, so concurrent `ensure`
/// calls for one key share a single fetch instead of racing writes.
pub struct ResponseCache<F, S> {
    fetcher: F,
    store: S,
    ttl_secs: u64,
    refresh_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<F: Fetch, S: BlobStore> ResponseCache<F, S> {
    /// Create a cache with the default TTL (24 hours).
    pub fn new(fetcher: F, store: S) -> Self {
        Self::with_ttl(fetcher, store, DEFAULT_TTL_SECS)
    }

    /// Create a cache with a custom TTL in seconds.
    pub fn with_ttl(fetcher: F, store: S, ttl_secs: u64) -> Self {
        Self {
            fetcher,
            store,
            ttl_secs,
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The configured TTL in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Return the cached response for `key`, refreshing it first if the
    /// entry is missing, empty, or older than the TTL.
    ///
    /// An entry aged exactly the TTL is still fresh. On fetch failure the
    /// stored blob is left untouched and the error propagates.
    pub async fn ensure(&self, key: &CacheKey) -> Result<Vec<u8>, CacheError> {
        let lock = self.refresh_lock(key);
        let _guard = lock.lock().await;

        let now = now_secs();

        if let Some(blob) = self.store.read(key)
            && !blob.body.is_empty()
            && now.saturating_sub(blob.written_at_secs) <= self.ttl_secs
        {
            debug!(%key, age_secs = now.saturating_sub(blob.written_at_secs), "schedule cache hit");
            return Ok(blob.body);
        }

        debug!(%key, "schedule cache stale or missing, fetching");
        let body = self.fetcher.fetch(key.agency_id, key.stop_id).await?;
        self.store.write(key, &body, now)?;

        Ok(body)
    }

    fn refresh_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.refresh_locks.lock().unwrap();
        locks.entry(key.to_string()).or_default().clone()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
