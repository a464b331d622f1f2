//! Provider and resource handler traits

use crate::error::{CloudError, Result};
use crate::schema::ResourceSchema;
use crate::state::DeclarativeState;
use crate::timeouts::{OperationContext, Timeouts};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// CRUD lifecycle for one resource kind
///
/// Handlers hold their API client (injected at construction) and receive the
/// deadline for each call through [`OperationContext`]. They keep no state
/// between calls.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Resource type name (e.g., "azurerm_virtual_desktop_workspace")
    fn type_name(&self) -> &'static str;

    /// Human readable kind used in messages (e.g., "Virtual Desktop Workspace")
    fn display_name(&self) -> &'static str;

    fn schema(&self) -> &ResourceSchema;

    /// Check that `id` is a well-formed identifier for this kind
    fn validate_id(&self, id: &str) -> Result<()>;

    /// Create the resource described by `state`, failing if it already exists
    async fn create(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()>;

    /// Push the configuration in `state` to an existing resource
    async fn update(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()>;

    /// Refresh `state` from the remote resource, clearing it if the resource is gone
    async fn read(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()>;

    /// Delete the resource and wait for the deletion to finish
    async fn delete(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()>;

    async fn exists(&self, ctx: &OperationContext, id: &str) -> Result<bool>;

    /// Build state for an existing resource identified by `id`
    async fn import(&self, ctx: &OperationContext, id: &str) -> Result<DeclarativeState> {
        self.validate_id(id)?;

        let mut state = DeclarativeState::with_id(id);
        self.read(ctx, &mut state).await?;

        if state.is_absent() {
            return Err(CloudError::NotFound(format!(
                "cannot import non-existent {} {:?}",
                self.display_name(),
                id
            )));
        }
        Ok(state)
    }
}

/// A cloud provider exposing a set of resource handlers
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "azurerm")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Resource types this provider can manage
    fn resource_types(&self) -> Vec<&'static str>;

    fn handler(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>>;

    fn require_handler(&self, resource_type: &str) -> Result<Arc<dyn ResourceHandler>> {
        self.handler(resource_type)
            .ok_or_else(|| CloudError::UnknownResourceType(resource_type.to_string()))
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/subscription information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// Desired resources, indexed by address
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, rejecting duplicate addresses
    pub fn add(&mut self, resource: ResourceConfig) -> Result<()> {
        let address = resource.address();
        if self.resources.contains_key(&address) {
            return Err(CloudError::Manifest(format!(
                "resource {} is declared more than once",
                address
            )));
        }
        self.resources.insert(address, resource);
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&ResourceConfig> {
        self.resources.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceConfig> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceConfig> {
        self.resources
            .values()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }
}

/// Desired configuration of one resource
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Resource type (e.g., "azurerm_virtual_desktop_workspace")
    pub resource_type: String,

    /// Local name, unique per type
    pub name: String,

    pub config: DeclarativeState,

    pub timeouts: Timeouts,
}

impl ResourceConfig {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        config: DeclarativeState,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            config,
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Full resource address (`type.name`)
    pub fn address(&self) -> String {
        address(&self.resource_type, &self.name)
    }
}

pub fn address(resource_type: &str, name: &str) -> String {
    format!("{}.{}", resource_type, name)
}

/// Split an address back into `(type, name)`
pub fn split_address(address: &str) -> Result<(&str, &str)> {
    address
        .rsplit_once('.')
        .filter(|(t, n)| !t.is_empty() && !n.is_empty())
        .ok_or_else(|| {
            CloudError::InvalidConfig(format!(
                "resource address must look like <type>.<name>, got {:?}",
                address
            ))
        })
}
