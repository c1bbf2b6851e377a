use highscore::cli::{Cli, Command};
use highscore::config::{LeaderboardConfig, Settings, StoreBinding, WorkerConfig};
use highscore::error::{AppError, AppResult};
use highscore::leaderboard::LeaderboardService;
use highscore::server;
use highscore::storage::{FileStore, KvStore, MemoryStore};
use highscore::worker::{Clients, HttpFetcher, MemoryCacheStorage, OfflineWorker, Registration};

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");

    match &cli.command {
        Command::Serve { .. } => serve(&settings).await?,
        Command::WarmCache { version, .. } => warm_cache(&settings, version.as_deref()).await?,
    }

    Ok(())
}

async fn serve(settings: &Settings) -> AppResult<()> {
    let addr = settings
        .bind_address
        .parse::<SocketAddr>()
        .map_err(|e| AppError::Other(format!("Invalid bind address '{}'. {e}", settings.bind_address)))?;

    let store: Option<Arc<dyn KvStore>> = match &settings.store {
        Some(StoreBinding::Memory) => Some(Arc::new(MemoryStore::new())),
        Some(StoreBinding::File(path)) => Some(Arc::new(FileStore::new(path))),
        None => None,
    };
    match &settings.store {
        Some(binding) => info!("Leaderboard store bound to {}", binding),
        None => warn!("No leaderboard store bound, every request will fail."),
    }

    let service = LeaderboardService::new(LeaderboardConfig::default(), store);
    server::serve(addr, service).await
}

async fn warm_cache(settings: &Settings, version: Option<&str>) -> AppResult<()> {
    let origin = settings
        .origin
        .clone()
        .ok_or_else(|| AppError::Other("An origin is required to warm the cache.".to_string()))?;

    let mut config = WorkerConfig::new(origin);
    if let Some(version) = version {
        config = config.with_version(version);
    }

    let network = Arc::new(HttpFetcher::new(settings.fetch_timeout())?);
    let caches = Arc::new(MemoryCacheStorage::new());
    let clients = Clients::new();
    let registration = Registration::new(clients.clone(), network.clone());
    let worker = Arc::new(OfflineWorker::new(config, caches.clone(), network, clients));

    info!("Installing offline cache {}", worker.cache_name());
    let deployment = registration.register(worker).await?;

    for asset in &deployment.install.cached {
        info!("cached   {}", asset);
    }
    for (asset, reason) in &deployment.install.failed {
        warn!("skipped  {} ({})", asset, reason);
    }
    info!(
        "Version {} ready: {}/{} assets cached.",
        deployment.version,
        deployment.install.cached.len(),
        deployment.install.cached.len() + deployment.install.failed.len()
    );
    Ok(())
}
