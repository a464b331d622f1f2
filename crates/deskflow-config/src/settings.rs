//! Provider settings (`settings.yaml`)
//!
//! ```yaml
//! subscription_id: 00000000-0000-0000-0000-000000000000
//! tenant_id: 11111111-1111-1111-1111-111111111111
//! client_id: 22222222-2222-2222-2222-222222222222
//! endpoint: https://management.azure.com
//! poll_interval: 10s
//! timeouts:
//!   create: 30m
//!   delete: 90m
//! ```
//!
//! Secrets are never read from this file; `ARM_CLIENT_SECRET` and
//! `ARM_ACCESS_TOKEN` come from the environment only.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE: &str = "settings.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Resource Manager endpoint (sovereign clouds, test doubles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_host: Option<String>,

    /// Wait between polls of long-running operations
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub poll_interval: Option<Duration>,

    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

/// Default deadlines overriding the built-in ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutSettings {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub create: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub read: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub update: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub delete: Option<Duration>,
}

impl ProviderSettings {
    /// Settings file in effect for the current directory
    ///
    /// `DESK_SETTINGS_PATH`, then `./.deskflow/settings.yaml`, then the
    /// global config directory. `None` when none exists.
    pub fn find() -> Result<Option<PathBuf>> {
        if let Ok(path) = std::env::var("DESK_SETTINGS_PATH") {
            return Ok(Some(PathBuf::from(path)));
        }

        let project = std::env::current_dir()?.join(".deskflow").join(SETTINGS_FILE);
        if project.exists() {
            return Ok(Some(project));
        }

        let global = crate::get_config_dir()?.join(SETTINGS_FILE);
        Ok(global.exists().then_some(global))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load the settings file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let settings = match Self::find()? {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.with_env_overrides()
    }

    /// `ARM_SUBSCRIPTION_ID`, `ARM_TENANT_ID`, `ARM_CLIENT_ID`, `ARM_ENDPOINT`,
    /// `ARM_AUTHORITY_HOST` and `DESK_POLL_INTERVAL` take precedence over the file
    pub fn with_env_overrides(mut self) -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        if let Some(v) = env("ARM_SUBSCRIPTION_ID") {
            self.subscription_id = Some(v);
        }
        if let Some(v) = env("ARM_TENANT_ID") {
            self.tenant_id = Some(v);
        }
        if let Some(v) = env("ARM_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = env("ARM_ENDPOINT") {
            self.endpoint = Some(v);
        }
        if let Some(v) = env("ARM_AUTHORITY_HOST") {
            self.authority_host = Some(v);
        }
        if let Some(v) = env("DESK_POLL_INTERVAL") {
            let interval = humantime::parse_duration(&v).map_err(|e| {
                ConfigError::InvalidSetting(format!("DESK_POLL_INTERVAL={}: {}", v, e))
            })?;
            self.poll_interval = Some(interval);
        }
        Ok(self)
    }
}
