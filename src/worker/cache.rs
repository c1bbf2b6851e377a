use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{WorkerError, WorkerResult};

/// Status reported by opaque responses.
pub const OPAQUE_STATUS: u16 = 0;

/// A response as handed back to the page, either live or from a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    body: Bytes,
    opaque: bool,
    pub cached_at: Option<DateTime<Utc>>,
}

impl AssetResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: HeaderMap, body: Bytes) -> Self {
        AssetResponse {
            url: url.into(),
            status,
            headers,
            body,
            opaque: false,
            cached_at: None,
        }
    }

    /// Cross-origin response fetched without CORS. Storable and servable, but
    /// its status, headers and body are hidden from the worker.
    pub fn opaque(url: impl Into<String>, body: Bytes) -> Self {
        AssetResponse {
            url: url.into(),
            status: OPAQUE_STATUS,
            headers: HeaderMap::new(),
            body,
            opaque: true,
            cached_at: None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `None` for opaque responses.
    pub fn body(&self) -> Option<&Bytes> {
        match self.opaque {
            true => None,
            false => Some(&self.body),
        }
    }
}

/// Named caches of URL -> response, in the order they were created.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the cache named `name`, creating it if needed.
    async fn open(&self, name: &str) -> WorkerResult<()>;

    async fn put(&self, name: &str, response: AssetResponse) -> WorkerResult<()>;

    async fn keys(&self) -> WorkerResult<Vec<String>>;

    /// Returns whether a cache was deleted.
    async fn delete(&self, name: &str) -> WorkerResult<bool>;

    /// Look `url` up in every cache, oldest cache first.
    async fn match_any(&self, url: &str) -> WorkerResult<Option<AssetResponse>>;
}

type NamedCache = (String, HashMap<String, AssetResponse>);

/// Cache storage held in memory. Clones share the same caches.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    caches: Arc<RwLock<Vec<NamedCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        MemoryCacheStorage::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> WorkerResult<()> {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        if !caches.iter().any(|(n, _)| n == name) {
            caches.push((name.to_string(), HashMap::new()));
        }
        Ok(())
    }

    async fn put(&self, name: &str, mut response: AssetResponse) -> WorkerResult<()> {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let (_, entries) = caches
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| WorkerError::CacheUnavailable(format!("cache '{name}' is not open")))?;
        response.cached_at = Some(Utc::now());
        entries.insert(response.url.clone(), response);
        Ok(())
    }

    async fn keys(&self) -> WorkerResult<Vec<String>> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(caches.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn delete(&self, name: &str) -> WorkerResult<bool> {
        let mut caches = self.caches.write().unwrap_or_else(PoisonError::into_inner);
        let before = caches.len();
        caches.retain(|(n, _)| n != name);
        Ok(caches.len() != before)
    }

    async fn match_any(&self, url: &str) -> WorkerResult<Option<AssetResponse>> {
        let caches = self.caches.read().unwrap_or_else(PoisonError::into_inner);
        Ok(caches
            .iter()
            .find_map(|(_, entries)| entries.get(url))
            .cloned())
    }
}
