//! In-memory stand-ins for the network and cache storage.

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::cache::{AssetResponse, CacheStorage};
use super::network::{FetchRequest, Fetcher, RequestMode};
use crate::error::{WorkerError, WorkerResult};

/// Serves canned bodies by URL. Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeNetwork {
    routes: HashMap<String, (u16, &'static str)>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Self {
        FakeNetwork::default()
    }

    pub fn serve(mut self, url: &str, status: u16, body: &'static str) -> Self {
        self.routes.insert(url.to_string(), (status, body));
        self
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<AssetResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(WorkerError::Network("network unreachable".to_string()));
        }

        let url = request.url.as_str();
        let (status, body) = self
            .routes
            .get(url)
            .ok_or_else(|| WorkerError::Network(format!("could not resolve {url}")))?;
        let body = Bytes::from_static(body.as_bytes());

        Ok(match request.mode {
            RequestMode::Cors => AssetResponse::new(url, *status, HeaderMap::new(), body),
            RequestMode::NoCors => AssetResponse::opaque(url, body),
        })
    }
}

/// Cache storage that cannot be opened at all.
pub struct UnavailableCaches;

#[async_trait]
impl CacheStorage for UnavailableCaches {
    async fn open(&self, _name: &str) -> WorkerResult<()> {
        Err(WorkerError::CacheUnavailable("quota exceeded".to_string()))
    }

    async fn put(&self, _name: &str, _response: AssetResponse) -> WorkerResult<()> {
        Err(WorkerError::CacheUnavailable("quota exceeded".to_string()))
    }

    async fn keys(&self) -> WorkerResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn delete(&self, _name: &str) -> WorkerResult<bool> {
        Ok(false)
    }

    async fn match_any(&self, _url: &str) -> WorkerResult<Option<AssetResponse>> {
        Ok(None)
    }
}
