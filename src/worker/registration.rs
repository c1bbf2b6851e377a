use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use super::cache::AssetResponse;
use super::clients::Clients;
use super::network::{FetchRequest, Fetcher};
use super::offline::{ActivateReport, InstallReport, OfflineWorker};
use crate::error::WorkerResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub version: String,
    pub install: InstallReport,
    pub activate: ActivateReport,
}

/// Hosts the worker versions deployed for one scope.
///
/// The active worker keeps serving fetches while a newer version installs.
pub struct Registration {
    clients: Clients,
    network: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<OfflineWorker>>>,
}

impl Registration {
    pub fn new(clients: Clients, network: Arc<dyn Fetcher>) -> Self {
        Registration {
            clients,
            network,
            active: RwLock::new(None),
        }
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn active(&self) -> Option<Arc<OfflineWorker>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install `worker`, then activate it right away. The current worker
    /// keeps serving until the install succeeds.
    pub async fn register(&self, worker: Arc<OfflineWorker>) -> WorkerResult<Deployment> {
        let install = worker.install().await?;
        info!("[Registration] Worker {} skips waiting", worker.version());
        let activate = self.promote(worker.clone()).await?;

        Ok(Deployment {
            version: worker.version().to_string(),
            install,
            activate,
        })
    }

    async fn promote(&self, worker: Arc<OfflineWorker>) -> WorkerResult<ActivateReport> {
        let report = worker.activate().await?;

        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(worker.clone());
        if let Some(previous) = previous {
            info!(
                "[Registration] Worker {} replaced by {}",
                previous.version(),
                worker.version()
            );
            previous.retire()?;
        }
        Ok(report)
    }

    /// Route a page request through the active worker, or straight to the
    /// network when no worker controls the scope.
    pub async fn fetch(&self, request: &FetchRequest) -> WorkerResult<AssetResponse> {
        match self.active() {
            Some(worker) => worker.fetch(request).await,
            None => {
                warn!("[Registration] No active worker, fetching {} live", request.url);
                self.network.fetch(request).await
            }
        }
    }
}
