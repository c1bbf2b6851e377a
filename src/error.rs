use http::StatusCode;
use thiserror::Error;

/// Custom Error and Result types to unify errors from all sources.
pub type StoreResult<T> = Result<T, StoreError>;
pub type ServiceResult<T> = Result<T, ServiceError>;
pub type WorkerResult<T> = Result<T, WorkerError>;
pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Conditional write on key '{0}' lost to a concurrent writer")]
    Conflict(String),
    #[error("Stored value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected score submissions. The messages are returned verbatim to the caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Invalid JSON body.")]
    InvalidJson,
    #[error(r#"Invalid score entry format. Required: {{ "name": string, "score": number }}"#)]
    InvalidFormat,
    #[error("Invalid name provided.")]
    InvalidName,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Leaderboard could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Gave up writing the leaderboard after {0} conflicting attempts")]
    Contention(usize),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Submission(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Cannot {action} a worker in state {state}")]
    InvalidState { action: &'static str, state: String },
    #[error("Cache storage unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Invalid asset URL '{0}'")]
    InvalidUrl(String),
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
}

impl From<reqwest::Error> for WorkerError {
    fn from(error: reqwest::Error) -> Self {
        WorkerError::Network(error.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] figment::Error),
    #[error("Server Error: {0}")]
    Server(#[from] hyper::Error),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error("{0}")]
    Other(String),
}
