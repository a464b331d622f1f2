//! deskflow resource lifecycle core
//!
//! This crate provides the provider-agnostic pieces of deskflow: declarative
//! state, schema descriptors, the resource handler traits, per-operation
//! deadlines and a thin plan/apply orchestrator driven by a KDL manifest.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   desk CLI                       │
//! │          (plan / apply / import / destroy)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                deskflow-cloud                    │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   trait CloudProvider / ResourceHandler   │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐ ┌────────────┐ ┌──────────┐  │
//! │  │ KDL manifest │ │ Plan/Apply │ │  State   │  │
//! │  └──────────────┘ └────────────┘ └──────────┘  │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │             deskflow-cloud-azure                 │
//! │   workspaces / application groups over ARM       │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod apply;
pub mod error;
pub mod manifest;
pub mod provider;
pub mod schema;
pub mod state;
pub mod timeouts;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use action::{Action, ActionType, ApplyResult, Plan, PlanSummary};
pub use apply::Applier;
pub use error::{CloudError, Result};
pub use manifest::{parse_manifest, parse_manifest_file, parse_manifest_with};
pub use provider::{AuthStatus, CloudProvider, ResourceConfig, ResourceHandler, ResourceSet};
pub use schema::{Attribute, AttributeType, Diagnostic, ResourceSchema};
pub use state::{
    AttributeValue, DeclarativeState, GlobalState, LifecycleStatus, StateLock, StateManager,
    TrackedResource,
};
pub use timeouts::{Operation, OperationContext, Timeouts};
