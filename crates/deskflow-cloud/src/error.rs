//! Resource lifecycle error types

use thiserror::Error;

/// Errors surfaced by resource handlers and the orchestrator
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Malformed resource ID: {0}")]
    MalformedId(String),

    #[error(
        "A resource with the ID \"{id}\" already exists - to be managed by deskflow this resource needs to be imported into the state. Please see the documentation for \"{resource_type}\" for more information."
    )]
    AlreadyExists { resource_type: String, id: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("KDL parse error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    /// Wrap a lower-level failure with a message naming the resource involved
    pub fn remote(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Remote {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, CloudError::AlreadyExists { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
