pub mod cache;
pub mod clients;
pub mod lifecycle;
pub mod network;
pub mod offline;
pub mod registration;
#[cfg(test)]
pub(crate) mod testing;

pub use cache::{AssetResponse, CacheStorage, MemoryCacheStorage};
pub use clients::{ClientId, Clients};
pub use lifecycle::WorkerState;
pub use network::{FetchRequest, Fetcher, HttpFetcher, RequestMode};
pub use offline::{ActivateReport, InstallReport, OfflineWorker};
pub use registration::{Deployment, Registration};
