//! Declarative state and the local state file
//!
//! [`DeclarativeState`] is what handlers read from and write back into.
//! [`StateManager`] persists the orchestrator's view of every tracked resource
//! to `.deskflow/state.json`.

use crate::error::{CloudError, Result};
use crate::timeouts::Timeouts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".deskflow";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttributeValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            AttributeValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::String(_) => "string",
            AttributeValue::List(_) => "list",
            AttributeValue::Map(_) => "map",
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(l: Vec<String>) -> Self {
        AttributeValue::List(l)
    }
}

impl From<BTreeMap<String, String>> for AttributeValue {
    fn from(m: BTreeMap<String, String>) -> Self {
        AttributeValue::Map(m)
    }
}

/// Desired configuration plus last observed remote attributes for one resource
///
/// A state without an ID describes a resource that does not exist (yet).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarativeState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl DeclarativeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// True once the resource has been cleared (or was never created)
    pub fn is_absent(&self) -> bool {
        self.id().is_none()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    /// Non-empty string attribute, `None` for missing or empty
    pub fn get_optional_str(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|s| !s.is_empty())
    }

    pub fn get_map(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        self.get(key).and_then(|v| v.as_map())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Set a string attribute, removing it when `value` is `None` or empty
    pub fn set_optional(&mut self, key: impl Into<String>, value: Option<&str>) {
        let key = key.into();
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                self.attributes.insert(key, AttributeValue::String(v.to_string()));
            }
            None => {
                self.attributes.remove(&key);
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }

    /// Drop the ID and every attribute, marking the resource absent
    pub fn clear(&mut self) {
        self.id = None;
        self.attributes.clear();
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    /// Flattened `key`, `key.#`/`key.N` and `key.%`/`key.name` view of the state
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        if let Some(id) = self.id() {
            flat.insert("id".to_string(), id.to_string());
        }
        for (key, value) in &self.attributes {
            match value {
                AttributeValue::String(s) => {
                    flat.insert(key.clone(), s.clone());
                }
                AttributeValue::List(items) => {
                    flat.insert(format!("{}.#", key), items.len().to_string());
                    for (i, item) in items.iter().enumerate() {
                        flat.insert(format!("{}.{}", key, i), item.clone());
                    }
                }
                AttributeValue::Map(entries) => {
                    flat.insert(format!("{}.%", key), entries.len().to_string());
                    for (k, v) in entries {
                        flat.insert(format!("{}.{}", key, k), v.clone());
                    }
                }
            }
        }
        flat
    }
}

/// Lifecycle of a tracked resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    Unknown,
    Creating,
    Present,
    Updating,
    Deleting,
    Absent,
}

impl LifecycleStatus {
    pub fn can_transition_to(self, next: LifecycleStatus) -> bool {
        use LifecycleStatus::*;
        matches!(
            (self, next),
            (Unknown, Creating)
                | (Unknown, Present)
                | (Absent, Creating)
                | (Creating, Present)
                | (Creating, Absent)
                | (Present, Updating)
                | (Present, Deleting)
                | (Present, Absent)
                | (Present, Present)
                | (Updating, Present)
                | (Updating, Absent)
                | (Deleting, Absent)
                | (Deleting, Present)
        )
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleStatus::Unknown => write!(f, "unknown"),
            LifecycleStatus::Creating => write!(f, "creating"),
            LifecycleStatus::Present => write!(f, "present"),
            LifecycleStatus::Updating => write!(f, "updating"),
            LifecycleStatus::Deleting => write!(f, "deleting"),
            LifecycleStatus::Absent => write!(f, "absent"),
        }
    }
}

/// One entry in the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedResource {
    /// Resource type (e.g., "azurerm_virtual_desktop_workspace")
    pub resource_type: String,

    pub status: LifecycleStatus,

    pub state: DeclarativeState,

    #[serde(default)]
    pub timeouts: Timeouts,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TrackedResource {
    pub fn new(resource_type: impl Into<String>, state: DeclarativeState) -> Self {
        let now = Utc::now();
        Self {
            resource_type: resource_type.into(),
            status: LifecycleStatus::Unknown,
            state,
            timeouts: Timeouts::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn transition(&mut self, next: LifecycleStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CloudError::StateError(format!(
                "invalid lifecycle transition for {}: {} -> {}",
                self.resource_type, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Every tracked resource, keyed by address (`type.name`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,

    pub updated_at: DateTime<Utc>,

    pub resources: BTreeMap<String, TrackedResource>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_resource(&mut self, address: String, resource: TrackedResource) {
        self.resources.insert(address, resource);
        self.updated_at = Utc::now();
    }

    pub fn remove_resource(&mut self, address: &str) -> Option<TrackedResource> {
        let result = self.resources.remove(address);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_resource(&self, address: &str) -> Option<&TrackedResource> {
        self.resources.get(address)
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TrackedResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }
}

/// Reads and writes the state file under a project root
pub struct StateManager {
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the state, returning an empty one when no file exists yet
    pub async fn load(&self) -> Result<GlobalState> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(GlobalState::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: GlobalState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} resources", state.resources.len());
        Ok(())
    }

    /// Take the exclusive lock; a lock older than one hour is considered stale
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::LockError(format!(
                    "State is locked by {} (pid {}) since {}",
                    lock_info.holder, lock_info.pid, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn workspace_state() -> DeclarativeState {
        DeclarativeState::with_id(
            "/subscriptions/0000/resourceGroups/acctestRG-123/providers/Microsoft.DesktopVirtualization/workspaces/acctws123",
        )
        .with_attribute("name", "acctws123")
        .with_attribute("location", "westus2")
        .with_attribute("tags", BTreeMap::new())
    }

    #[test]
    fn test_clear_marks_absent() {
        let mut state = workspace_state();
        assert!(!state.is_absent());

        state.clear();
        assert!(state.is_absent());
        assert!(state.attributes().is_empty());
    }

    #[test]
    fn test_empty_id_is_absent() {
        let state = DeclarativeState::with_id("");
        assert!(state.is_absent());
    }

    #[test]
    fn test_set_optional_removes_empty() {
        let mut state = DeclarativeState::new().with_attribute("description", "old");
        state.set_optional("description", Some(""));
        assert!(state.get("description").is_none());

        state.set_optional("friendly_name", Some("Friendly"));
        assert_eq!(state.get_str("friendly_name"), Some("Friendly"));
    }

    #[test]
    fn test_flatten_counts_maps_and_lists() {
        let mut tags = BTreeMap::new();
        tags.insert("env".to_string(), "dev".to_string());
        let state = workspace_state()
            .with_attribute("tags", tags)
            .with_attribute("refs", vec!["a".to_string(), "b".to_string()]);

        let flat = state.flatten();
        assert_eq!(flat.get("tags.%").map(String::as_str), Some("1"));
        assert_eq!(flat.get("tags.env").map(String::as_str), Some("dev"));
        assert_eq!(flat.get("refs.#").map(String::as_str), Some("2"));
        assert_eq!(flat.get("refs.1").map(String::as_str), Some("b"));
        assert!(flat.contains_key("id"));
    }

    #[test]
    fn test_flatten_empty_tags() {
        let flat = workspace_state().flatten();
        assert_eq!(flat.get("tags.%").map(String::as_str), Some("0"));
    }

    #[test]
    fn test_lifecycle_transitions() {
        use LifecycleStatus::*;
        assert!(Unknown.can_transition_to(Creating));
        assert!(Creating.can_transition_to(Present));
        assert!(Present.can_transition_to(Updating));
        assert!(Updating.can_transition_to(Present));
        assert!(Present.can_transition_to(Deleting));
        assert!(Deleting.can_transition_to(Absent));

        assert!(!Unknown.can_transition_to(Deleting));
        assert!(!Absent.can_transition_to(Present));
        assert!(!Creating.can_transition_to(Updating));
    }

    #[test]
    fn test_tracked_resource_rejects_invalid_transition() {
        let mut tracked = TrackedResource::new("azurerm_virtual_desktop_workspace", workspace_state());
        assert!(tracked.transition(LifecycleStatus::Deleting).is_err());
        assert_eq!(tracked.status, LifecycleStatus::Unknown);

        tracked.transition(LifecycleStatus::Creating).unwrap();
        tracked.transition(LifecycleStatus::Present).unwrap();
        assert_eq!(tracked.status, LifecycleStatus::Present);
    }

    #[test]
    fn test_declarative_state_json_shape() {
        let json = serde_json::to_value(workspace_state()).unwrap();
        assert_eq!(json["attributes"]["name"], "acctws123");
        assert!(json["attributes"]["tags"].is_object());

        let back: DeclarativeState = serde_json::from_value(json).unwrap();
        assert_eq!(back, workspace_state());
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        let mut tracked = TrackedResource::new("azurerm_virtual_desktop_workspace", workspace_state());
        tracked.transition(LifecycleStatus::Present).unwrap();
        state.set_resource("azurerm_virtual_desktop_workspace.test".to_string(), tracked);

        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.resources.len(), 1);
        let tracked = loaded
            .get_resource("azurerm_virtual_desktop_workspace.test")
            .unwrap();
        assert_eq!(tracked.status, LifecycleStatus::Present);
        assert_eq!(tracked.state.get_str("name"), Some("acctws123"));
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        manager.save(&GlobalState::new()).await.unwrap();

        assert!(temp_dir.path().join(".deskflow/state.json.backup").exists());
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.resources.is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock().await.unwrap();
        assert!(matches!(
            manager.acquire_lock().await,
            Err(CloudError::LockError(_))
        ));

        lock.release().await.unwrap();
        let again = manager.acquire_lock().await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".deskflow/lock.json").exists());
    }
}
