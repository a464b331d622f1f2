//! Azure provider implementation

use crate::api::ArmResourceClient;
use crate::auth::{MissingCredential, TokenCredential};
use crate::client::ArmClient;
use crate::config::AzureConfig;
use crate::error::Result;
use crate::models::{ApplicationGroup, Workspace};
use crate::poller::PollConfig;
use crate::resources::{ApplicationGroupHandler, WorkspaceHandler, application_group, workspace};
use async_trait::async_trait;
use deskflow_cloud::{AuthStatus, CloudProvider, ResourceHandler};
use std::sync::Arc;

/// Azure provider
pub struct AzureProvider {
    client: Arc<ArmClient>,
    subscription_id: String,
    workspaces: Arc<WorkspaceHandler>,
    application_groups: Arc<ApplicationGroupHandler>,
}

impl AzureProvider {
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let client = ArmClient::from_config(config)?;
        Ok(Self::with_client(Arc::new(client), &config.subscription_id))
    }

    /// Like [`new`](Self::new), but missing credentials only fail the first
    /// remote call. Enough for validating and planning.
    pub fn deferred_auth(config: &AzureConfig) -> Self {
        let credential: Arc<dyn TokenCredential> = match config.credential() {
            Ok(credential) => credential,
            Err(e) => Arc::new(MissingCredential::new(e.to_string())),
        };
        let client = ArmClient::new(&config.endpoint, credential)
            .with_poll_config(PollConfig::new(config.poll_interval));
        Self::with_client(Arc::new(client), &config.subscription_id)
    }

    /// Provider over an existing client (e.g., one pointed at a mock endpoint)
    pub fn with_client(client: Arc<ArmClient>, subscription_id: impl Into<String>) -> Self {
        let subscription_id = subscription_id.into();
        let workspaces = WorkspaceHandler::new(Arc::new(ArmResourceClient::<Workspace>::new(
            client.clone(),
            &subscription_id,
        )));
        let application_groups = ApplicationGroupHandler::new(Arc::new(ArmResourceClient::<ApplicationGroup>::new(
            client.clone(),
            &subscription_id,
        )));

        Self {
            client,
            subscription_id,
            workspaces: Arc::new(workspaces),
            application_groups: Arc::new(application_groups),
        }
    }

    pub fn client(&self) -> &Arc<ArmClient> {
        &self.client
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }
}

#[async_trait]
impl CloudProvider for AzureProvider {
    fn name(&self) -> &str {
        "azurerm"
    }

    fn display_name(&self) -> &str {
        "Azure Virtual Desktop"
    }

    async fn check_auth(&self) -> deskflow_cloud::Result<AuthStatus> {
        match self.client.credential().token().await {
            Ok(_) => Ok(AuthStatus::ok(format!(
                "subscription {}",
                self.subscription_id
            ))),
            Err(e) => Ok(AuthStatus::failed(format!(
                "アクセストークンを取得できません: {}",
                e
            ))),
        }
    }

    fn resource_types(&self) -> Vec<&'static str> {
        vec![workspace::TYPE_NAME, application_group::TYPE_NAME]
    }

    fn handler(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>> {
        match resource_type {
            workspace::TYPE_NAME => Some(self.workspaces.clone()),
            application_group::TYPE_NAME => Some(self.application_groups.clone()),
            _ => None,
        }
    }
}
