//! Azure provider error types

use deskflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{code}: {message} (HTTP {status})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Long-running operation error: {0}")]
    Operation(String),

    #[error("Acceptance check failed: {0}")]
    Check(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cloud error: {0}")]
    Cloud(#[from] CloudError),
}

impl AzureError {
    /// HTTP status of an API error response
    pub fn status(&self) -> Option<u16> {
        match self {
            AzureError::Api { status, .. } => Some(*status),
            AzureError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<AzureError> for CloudError {
    fn from(e: AzureError) -> Self {
        match e {
            AzureError::Cloud(inner) => inner,
            AzureError::Authentication(msg) => CloudError::AuthenticationFailed(msg),
            AzureError::MissingEnvVar(var) => {
                CloudError::InvalidConfig(format!("{} is not set", var))
            }
            AzureError::InvalidConfig(msg) => CloudError::InvalidConfig(msg),
            other => CloudError::remote("Azure Resource Manager request failed", other),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
