use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::board::Leaderboard;
use super::entry::Submission;
use crate::config::LeaderboardConfig;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::storage::{get_json, KvStore, Precondition};

const STORE_NOT_BOUND: &str = "Leaderboard store not bound.";
const INTERNAL_ERROR: &str = "An internal server error occurred.";
const METHOD_NOT_ALLOWED: &str = "Method Not Allowed";

#[derive(Debug, Serialize)]
struct SubmitResponse<'a> {
    success: bool,
    leaderboard: &'a Leaderboard,
}

/// HTTP entry point for reading and submitting top scores.
#[derive(Clone)]
pub struct LeaderboardService {
    config: LeaderboardConfig,
    store: Option<Arc<dyn KvStore>>,
}

impl LeaderboardService {
    pub fn new(config: LeaderboardConfig, store: Option<Arc<dyn KvStore>>) -> Self {
        LeaderboardService { config, store }
    }

    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let Some(store) = self.store.as_deref() else {
            error!("No leaderboard store bound, refusing {} request", request.method());
            return plain_text(StatusCode::INTERNAL_SERVER_ERROR, STORE_NOT_BOUND);
        };

        let method = request.method().clone();
        let result = match method {
            Method::GET => self.scores(store).await,
            Method::POST => self.submit(store, request.body()).await,
            _ => {
                info!("Method {} not allowed", method);
                return method_not_allowed();
            }
        };

        match result {
            Ok(response) => response,
            Err(ServiceError::Submission(e)) => {
                warn!("Rejected score submission: {e}");
                plain_text(StatusCode::BAD_REQUEST, e.to_string())
            }
            Err(e) => {
                error!("Error processing request ({method}): {e}");
                plain_text(e.status_code(), INTERNAL_ERROR)
            }
        }
    }

    async fn scores(&self, store: &dyn KvStore) -> ServiceResult<Response<Bytes>> {
        info!("GET request received for scores");
        let (leaderboard, _) = self.current(store).await?;
        info!("Returning {} scores", leaderboard.len());
        json(&leaderboard)
    }

    async fn submit(&self, store: &dyn KvStore, body: &Bytes) -> ServiceResult<Response<Bytes>> {
        info!("POST request received to submit score");
        let submission = Submission::parse(body, self.config.max_name_len)?;
        info!("Received score entry: {:?}", submission.entry());

        // Merge against a fresh read on every attempt so a concurrent write is
        // never overwritten.
        for attempt in 1..=self.config.write_attempts {
            let (current, precondition) = self.current(store).await?;
            let merged = current.merge(submission.entry().clone(), self.config.max_scores);
            let value = serde_json::to_string(&merged)?;

            match store
                .put(&self.config.scores_key, value, precondition)
                .await
            {
                Ok(version) => {
                    info!("Stored {} scores at version {}", merged.len(), version);
                    return json(&SubmitResponse {
                        success: true,
                        leaderboard: &merged,
                    });
                }
                Err(StoreError::Conflict(key)) => {
                    warn!(
                        "Concurrent update of '{}' on attempt {}/{}",
                        key, attempt, self.config.write_attempts
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Contention(self.config.write_attempts))
    }

    async fn current(&self, store: &dyn KvStore) -> ServiceResult<(Leaderboard, Precondition)> {
        // A stored JSON `null` reads as an empty board.
        let stored = get_json::<Option<Leaderboard>>(store, &self.config.scores_key).await?;
        Ok(match stored {
            Some((leaderboard, versioned)) => (
                leaderboard.unwrap_or_default(),
                Precondition::unchanged_since(Some(&versioned)),
            ),
            None => (Leaderboard::new(), Precondition::Absent),
        })
    }
}

fn with_cors(mut response: Response<Bytes>) -> Response<Bytes> {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

fn json<T: Serialize>(body: &T) -> ServiceResult<Response<Bytes>> {
    let mut response = Response::new(Bytes::from(serde_json::to_vec(body)?));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Ok(with_cors(response))
}

fn plain_text(status: StatusCode, body: impl Into<Bytes>) -> Response<Bytes> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain;charset=UTF-8"),
    );
    response
}

fn method_not_allowed() -> Response<Bytes> {
    let mut response = plain_text(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
    response
}
