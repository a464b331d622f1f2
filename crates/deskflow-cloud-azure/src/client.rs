//! Azure Resource Manager HTTP client

use crate::auth::TokenCredential;
use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use crate::poller::{LongRunningOperation, OperationStatus, PollConfig};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authenticated GET/PUT/DELETE against the management endpoint
pub struct ArmClient {
    http: reqwest::Client,
    endpoint: String,
    credential: Arc<dyn TokenCredential>,
    pub(crate) poll: PollConfig,
}

impl ArmClient {
    pub fn new(endpoint: impl Into<String>, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential,
            poll: PollConfig::default(),
        }
    }

    pub fn from_config(config: &AzureConfig) -> Result<Self> {
        Ok(Self::new(&config.endpoint, config.credential()?)
            .with_poll_config(PollConfig::new(config.poll_interval)))
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn credential(&self) -> &Arc<dyn TokenCredential> {
        &self.credential
    }

    fn url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", self.endpoint, path, api_version)
    }

    pub(crate) async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let token = self.credential.token().await?;
        Ok(self.http.request(method, url).bearer_auth(token))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        let url = self.url(path, api_version);
        tracing::debug!("GET {}", url);

        let response = self.request(Method::GET, &url).await?.send().await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// PUT a resource, waiting for provisioning when the API answers asynchronously
    pub async fn put<B, T>(&self, path: &str, api_version: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path, api_version);
        tracing::debug!("PUT {}", url);

        let response = self
            .request(Method::PUT, &url)
            .await?
            .json(body)
            .send()
            .await?;
        let response = check(response).await?;

        let status = response.status();
        let operation = LongRunningOperation::from_response(&response);
        if status == StatusCode::ACCEPTED || (status == StatusCode::CREATED && operation.is_pending()) {
            match self.await_completion(operation).await? {
                OperationStatus::Succeeded => {}
                OperationStatus::Failed { code, message } => {
                    return Err(AzureError::Operation(format!(
                        "provisioning failed: {}: {}",
                        code, message
                    )));
                }
                OperationStatus::Canceled => {
                    return Err(AzureError::Operation("provisioning was canceled".to_string()));
                }
            }
            return self.get(path, api_version).await;
        }

        Ok(response.json().await?)
    }

    /// Issue a DELETE; the returned operation still has to be awaited
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<LongRunningOperation> {
        let url = self.url(path, api_version);
        tracing::debug!("DELETE {}", url);

        let response = self.request(Method::DELETE, &url).await?.send().await?;
        let response = check(response).await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(LongRunningOperation::completed());
        }
        Ok(LongRunningOperation::from_response(&response))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Pass successful responses through, turn the rest into [`AzureError::Api`]
pub(crate) async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    Err(error_from(response).await)
}

pub(crate) async fn error_from(response: Response) -> AzureError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => AzureError::Api {
            status: status.as_u16(),
            code: parsed.error.code,
            message: parsed.error.message,
        },
        Err(_) => AzureError::Api {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: body,
        },
    }
}
