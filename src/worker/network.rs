use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use strum::Display;

use super::cache::AssetResponse;
use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum RequestMode {
    Cors,
    /// Cross-origin without CORS; the response comes back opaque.
    NoCors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn get(url: Url) -> Self {
        FetchRequest {
            url,
            mode: RequestMode::Cors,
        }
    }

    /// Resolve `asset` against `origin`. Assets hosted on another origin are
    /// requested in no-cors mode.
    pub fn for_asset(origin: &Url, asset: &str) -> WorkerResult<Self> {
        let url = origin
            .join(asset)
            .map_err(|_| WorkerError::InvalidUrl(asset.to_string()))?;
        let mode = match url.origin() == origin.origin() {
            true => RequestMode::Cors,
            false => RequestMode::NoCors,
        };
        Ok(FetchRequest { url, mode })
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<AssetResponse>;
}

/// Live network access.
pub struct HttpFetcher {
    http_client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> WorkerResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> WorkerResult<AssetResponse> {
        let response = self.http_client.get(request.url.clone()).send().await?;
        // Keyed by the requested URL, not the post-redirect one.
        let url = request.url.as_str();
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(match request.mode {
            RequestMode::Cors => AssetResponse::new(url, status, headers, body),
            RequestMode::NoCors => AssetResponse::opaque(url, body),
        })
    }
}
