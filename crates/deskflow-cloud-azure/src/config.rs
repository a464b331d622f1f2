//! Provider configuration from the `ARM_*` environment

use crate::auth::{ClientSecretCredential, DEFAULT_AUTHORITY_HOST, StaticToken, TokenCredential};
use crate::error::{AzureError, Result};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub subscription_id: String,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Pre-issued bearer token, used instead of the client secret when set
    pub access_token: Option<String>,
    pub endpoint: String,
    pub authority_host: String,
    pub poll_interval: Duration,
}

impl AzureConfig {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            access_token: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Read `ARM_SUBSCRIPTION_ID`, `ARM_TENANT_ID`, `ARM_CLIENT_ID`,
    /// `ARM_CLIENT_SECRET`, `ARM_ACCESS_TOKEN`, `ARM_ENDPOINT` and `ARM_AUTHORITY_HOST`
    pub fn from_env() -> Result<Self> {
        let subscription_id = env("ARM_SUBSCRIPTION_ID")
            .ok_or_else(|| AzureError::MissingEnvVar("ARM_SUBSCRIPTION_ID".to_string()))?;

        let mut config = Self::new(subscription_id);
        config.tenant_id = env("ARM_TENANT_ID");
        config.client_id = env("ARM_CLIENT_ID");
        config.client_secret = env("ARM_CLIENT_SECRET");
        config.access_token = env("ARM_ACCESS_TOKEN");
        if let Some(endpoint) = env("ARM_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Some(authority) = env("ARM_AUTHORITY_HOST") {
            config.authority_host = authority;
        }
        Ok(config.normalized())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self.normalized()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn normalized(mut self) -> Self {
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
        self.authority_host = self.authority_host.trim_end_matches('/').to_string();
        self
    }

    /// Build the credential this configuration describes
    pub fn credential(&self) -> Result<Arc<dyn TokenCredential>> {
        if let Some(token) = &self.access_token {
            return Ok(Arc::new(StaticToken::new(token.clone())));
        }

        let require = |value: &Option<String>, var: &str| {
            value
                .clone()
                .ok_or_else(|| AzureError::MissingEnvVar(var.to_string()))
        };
        let tenant_id = require(&self.tenant_id, "ARM_TENANT_ID")?;
        let client_id = require(&self.client_id, "ARM_CLIENT_ID")?;
        let client_secret = require(&self.client_secret, "ARM_CLIENT_SECRET")?;

        Ok(Arc::new(
            ClientSecretCredential::new(tenant_id, client_id, client_secret)
                .with_authority_host(&self.authority_host)
                .with_scope(format!("{}/.default", self.endpoint)),
        ))
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
