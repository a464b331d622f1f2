//! Long-running operation polling
//!
//! ARM answers slow PUTs and DELETEs with `201`/`202` and a polling URL in
//! `Azure-AsyncOperation` (preferred) or `Location`. Polling waits
//! `Retry-After` seconds between requests when the service sends it.

use crate::client::{ArmClient, ErrorDetail, check, error_from};
use crate::error::{AzureError, Result};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Terminal status of a long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Succeeded,
    Failed { code: String, message: String },
    Canceled,
}

impl OperationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationStatus::Succeeded)
    }

    /// `None` while the operation is still running
    fn from_status(status: &str, error: Option<ErrorDetail>) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "succeeded" => Some(OperationStatus::Succeeded),
            "canceled" | "cancelled" => Some(OperationStatus::Canceled),
            "failed" => {
                let error = error.unwrap_or(ErrorDetail {
                    code: String::new(),
                    message: String::new(),
                });
                Some(OperationStatus::Failed {
                    code: error.code,
                    message: error.message,
                })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Succeeded => write!(f, "Succeeded"),
            OperationStatus::Failed { code, message } => write!(f, "Failed ({}: {})", code, message),
            OperationStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Wait between polls when the service sends no `Retry-After`
    pub default_interval: Duration,
}

impl PollConfig {
    pub fn new(default_interval: Duration) -> Self {
        Self { default_interval }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    AsyncOperation(String),
    Location(String),
}

/// Handle on an operation the service may still be running
#[derive(Debug, Clone)]
pub struct LongRunningOperation {
    target: Option<PollTarget>,
    retry_after: Option<Duration>,
}

impl LongRunningOperation {
    pub fn completed() -> Self {
        Self {
            target: None,
            retry_after: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let target = header(ASYNC_OPERATION)
            .map(PollTarget::AsyncOperation)
            .or_else(|| header(LOCATION.as_str()).map(PollTarget::Location));

        Self {
            target,
            retry_after: retry_after(headers),
        }
    }

    pub(crate) fn from_response(response: &Response) -> Self {
        Self::from_headers(response.headers())
    }

    pub fn is_pending(&self) -> bool {
        self.target.is_some()
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[derive(Debug, Deserialize)]
struct AsyncOperationBody {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

impl ArmClient {
    /// Poll until the operation reaches a terminal status
    ///
    /// The only loop in this crate that repeats requests. Callers bound it with
    /// their operation deadline.
    pub async fn await_completion(&self, operation: LongRunningOperation) -> Result<OperationStatus> {
        let Some(target) = operation.target else {
            return Ok(OperationStatus::Succeeded);
        };
        let mut wait = operation.retry_after.unwrap_or(self.poll.default_interval);

        loop {
            tokio::time::sleep(wait).await;

            let url = match &target {
                PollTarget::AsyncOperation(url) | PollTarget::Location(url) => url,
            };
            tracing::debug!("Polling {}", url);
            let response = self.request(Method::GET, url).await?.send().await?;
            wait = retry_after(response.headers()).unwrap_or(self.poll.default_interval);

            match &target {
                PollTarget::AsyncOperation(_) => {
                    let response = check(response).await?;
                    let body: AsyncOperationBody = response.json().await?;
                    match OperationStatus::from_status(&body.status, body.error) {
                        Some(status) => return Ok(status),
                        None => tracing::debug!("Operation status: {}", body.status),
                    }
                }
                PollTarget::Location(_) => {
                    let status = response.status();
                    if status == StatusCode::ACCEPTED {
                        continue;
                    }
                    if status.is_success() {
                        return Ok(OperationStatus::Succeeded);
                    }
                    return match error_from(response).await {
                        AzureError::Api { code, message, .. } => {
                            Ok(OperationStatus::Failed { code, message })
                        }
                        other => Err(other),
                    };
                }
            }
        }
    }
}
