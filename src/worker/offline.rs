use futures::future::join_all;
use reqwest::Url;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

use super::cache::{AssetResponse, CacheStorage};
use super::clients::Clients;
use super::lifecycle::{Transition, WorkerState};
use super::network::{FetchRequest, Fetcher, RequestMode};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// Outcome of populating the version cache.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    /// (asset, reason) for every asset that could not be cached.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub claimed: usize,
}

/// One version of the offline cache worker.
///
/// Serves page requests cache-first out of the assets cached at install time.
/// Network responses are never written back to the cache.
pub struct OfflineWorker {
    config: WorkerConfig,
    caches: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
    clients: Clients,
    state: Mutex<WorkerState>,
}

impl OfflineWorker {
    pub fn new(
        config: WorkerConfig,
        caches: Arc<dyn CacheStorage>,
        network: Arc<dyn Fetcher>,
        clients: Clients,
    ) -> Self {
        OfflineWorker {
            config,
            caches,
            network,
            clients,
            state: Mutex::new(WorkerState::Parsed),
        }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn cache_name(&self) -> String {
        self.config.cache_name()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, transition: Transition, action: &'static str) -> WorkerResult<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match state.next(transition) {
            Some(next) => {
                debug!("Worker {}: {} -> {}", self.config.version, *state, next);
                *state = next;
                Ok(())
            }
            None => Err(WorkerError::InvalidState {
                action,
                state: state.to_string(),
            }),
        }
    }

    /// Populate the version cache with the static asset list.
    ///
    /// Assets that fail are logged and skipped. Only failing to open the
    /// cache itself fails the install, which makes this worker redundant.
    /// An installed worker never waits: it is activated as soon as install
    /// returns.
    pub async fn install(&self) -> WorkerResult<InstallReport> {
        self.advance(Transition::InstallStarted, "install")?;
        info!("[Worker] Install event - {}", self.config.version);

        let cache_name = self.cache_name();
        if let Err(e) = self.caches.open(&cache_name).await {
            error!("[Worker] Caching failed during install: {e}");
            self.advance(Transition::InstallFailed, "install")?;
            return Err(e);
        }
        info!("[Worker] Opened cache: {}", cache_name);

        let origin = match Url::parse(&self.config.origin) {
            Ok(origin) => origin,
            Err(_) => {
                let e = WorkerError::InvalidUrl(self.config.origin.clone());
                error!("[Worker] Caching failed during install: {e}");
                self.advance(Transition::InstallFailed, "install")?;
                return Err(e);
            }
        };

        let attempts = self
            .config
            .assets
            .iter()
            .map(|asset| self.cache_asset(&cache_name, &origin, asset));
        let outcomes = join_all(attempts).await;

        let mut report = InstallReport {
            cache_name,
            ..Default::default()
        };
        for (asset, outcome) in self.config.assets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.cached.push(asset.clone()),
                Err(e) => {
                    warn!("[Worker] Failed to cache {}: {}", asset, e);
                    report.failed.push((asset.clone(), e.to_string()));
                }
            }
        }

        info!(
            "[Worker] All specified URLs attempted to cache ({} cached, {} failed).",
            report.cached.len(),
            report.failed.len()
        );
        self.advance(Transition::InstallFinished, "install")?;
        Ok(report)
    }

    async fn cache_asset(&self, cache_name: &str, origin: &Url, asset: &str) -> WorkerResult<()> {
        let request = FetchRequest::for_asset(origin, asset)?;
        let response = self.network.fetch(&request).await?;
        if request.mode == RequestMode::Cors && !response.is_success() {
            return Err(WorkerError::Status {
                url: request.url.to_string(),
                status: response.status,
            });
        }
        self.caches.put(cache_name, response).await
    }

    /// Evict caches left behind by other versions of this app, then take
    /// control of every open page.
    pub async fn activate(&self) -> WorkerResult<ActivateReport> {
        self.advance(Transition::ActivateStarted, "activate")?;
        info!("[Worker] Activate event - {}", self.config.version);

        let mut report = ActivateReport::default();
        match self.evict_stale_caches().await {
            Ok(deleted) => report.deleted = deleted,
            Err(e) => error!("[Worker] Cache cleanup failed during activate: {e}"),
        }

        info!("[Worker] Claiming clients");
        report.claimed = self.clients.claim(&self.config.version);

        self.advance(Transition::ActivateFinished, "activate")?;
        Ok(report)
    }

    async fn evict_stale_caches(&self) -> WorkerResult<Vec<String>> {
        let prefix = self.config.cache_name_prefix();
        let current = self.cache_name();

        let stale = self
            .caches
            .keys()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(&prefix) && *name != current)
            .collect::<Vec<_>>();

        let mut deleted = Vec::new();
        for name in stale {
            info!("[Worker] Deleting old cache: {}", name);
            if self.caches.delete(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Cache-first lookup, falling back to the live network.
    pub async fn fetch(&self, request: &FetchRequest) -> WorkerResult<AssetResponse> {
        let state = self.state();
        if !state.is_active() {
            return Err(WorkerError::InvalidState {
                action: "fetch",
                state: state.to_string(),
            });
        }

        if let Some(cached) = self.caches.match_any(request.url.as_str()).await? {
            debug!("[Worker] Found in cache: {}", request.url);
            return Ok(cached);
        }

        debug!("[Worker] Not in cache, fetching from network: {}", request.url);
        self.network.fetch(request).await.map_err(|e| {
            error!("[Worker] Fetch failed: {e}");
            e
        })
    }

    /// Mark this version as superseded by a newer active worker.
    pub fn retire(&self) -> WorkerResult<()> {
        self.advance(Transition::Replaced, "retire")
    }
}
