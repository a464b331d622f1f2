//! Azure Virtual Desktop provider for deskflow
//!
//! This crate implements the CloudProvider trait for Azure Resource Manager,
//! enabling deskflow to manage Virtual Desktop workspaces and application
//! groups.
//!
//! # Resources
//!
//! - `azurerm_virtual_desktop_workspace`
//! - `azurerm_virtual_desktop_application_group`
//!
//! # Requirements
//!
//! - `ARM_SUBSCRIPTION_ID`
//! - Either `ARM_TENANT_ID`, `ARM_CLIENT_ID` and `ARM_CLIENT_SECRET` for a
//!   service principal, or a pre-issued `ARM_ACCESS_TOKEN`
//!
//! # Example
//!
//! ```ignore
//! use deskflow_cloud::CloudProvider;
//! use deskflow_cloud_azure::{AzureConfig, AzureProvider};
//!
//! let provider = AzureProvider::new(&AzureConfig::from_env()?)?;
//!
//! let auth = provider.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod acceptance;
pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod location;
pub mod models;
pub mod poller;
pub mod provider;
pub mod resources;
pub mod tags;
pub mod validate;

pub use api::{ArmResource, ArmResourceClient, ResourceApi};
pub use auth::{ClientSecretCredential, MissingCredential, StaticToken, TokenCredential};
pub use client::ArmClient;
pub use config::AzureConfig;
pub use error::{AzureError, Result};
pub use id::{ApplicationGroupId, ArmId, HostPoolId, WorkspaceId};
pub use models::{ApplicationGroup, ApplicationGroupType, Workspace};
pub use poller::{LongRunningOperation, OperationStatus, PollConfig};
pub use provider::AzureProvider;
pub use resources::{
    ApplicationGroupConfig, ApplicationGroupHandler, ArmHandler, WorkspaceConfig, WorkspaceHandler,
};
