//! Planned actions and their results

use crate::error::Result;
use crate::provider::{CloudProvider, ResourceSet};
use crate::state::{GlobalState, LifecycleStatus};
use serde::{Deserialize, Serialize};

/// Represents a planned action for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Unique identifier for the action
    pub id: String,

    pub action_type: ActionType,

    /// Resource type (e.g., "azurerm_virtual_desktop_workspace")
    pub resource_type: String,

    /// Resource address (`type.name`)
    pub address: String,

    pub description: String,

    /// Attributes whose change triggered the action
    pub changes: Vec<String>,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    /// Apply updatable attributes in place
    Update,
    /// Delete then create, because a force-new attribute changed
    Replace,
    Delete,
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

impl Action {
    fn new(action_type: ActionType, resource_type: &str, address: &str, changes: Vec<String>) -> Self {
        let description = match action_type {
            ActionType::Create => format!("{} will be created", address),
            ActionType::Update => format!("{} will be updated in-place ({})", address, changes.join(", ")),
            ActionType::Replace => format!(
                "{} must be replaced ({} forces replacement)",
                address,
                changes.join(", ")
            ),
            ActionType::Delete => format!("{} will be destroyed", address),
            ActionType::NoOp => format!("{} is up to date", address),
        };
        Self {
            id: format!("{}-{}", action_type, address),
            action_type,
            resource_type: resource_type.to_string(),
            address: address.to_string(),
            description,
            changes,
        }
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub succeeded: Vec<ActionResult>,

    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, action_id: String, message: String) {
        self.succeeded.push(ActionResult {
            action_id,
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, action_id: String, error: String) {
        self.failed.push(ActionResult {
            action_id,
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

impl Default for ApplyResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: String,

    pub success: bool,

    pub message: String,

    pub error: Option<String>,
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,

    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Diff the desired resources against what the state file tracks.
    ///
    /// Every desired configuration is validated against its schema first;
    /// tracked resources that are no longer declared are scheduled for deletion.
    pub fn compute(
        provider: &dyn CloudProvider,
        desired: &ResourceSet,
        current: &GlobalState,
    ) -> Result<Self> {
        let mut actions = Vec::new();

        for resource in desired.iter() {
            let handler = provider.require_handler(&resource.resource_type)?;
            let schema = handler.schema();
            schema.check(&resource.config)?;

            let address = resource.address();
            let tracked = current
                .get_resource(&address)
                .filter(|t| t.status != LifecycleStatus::Absent && !t.state.is_absent());

            let action = match tracked {
                None => Action::new(ActionType::Create, &resource.resource_type, &address, Vec::new()),
                Some(tracked) => {
                    let force_new = schema.force_new_changes(&tracked.state, &resource.config);
                    if !force_new.is_empty() {
                        Action::new(
                            ActionType::Replace,
                            &resource.resource_type,
                            &address,
                            force_new.into_iter().map(String::from).collect(),
                        )
                    } else {
                        let in_place = schema.in_place_changes(&tracked.state, &resource.config);
                        let action_type = if in_place.is_empty() {
                            ActionType::NoOp
                        } else {
                            ActionType::Update
                        };
                        Action::new(
                            action_type,
                            &resource.resource_type,
                            &address,
                            in_place.into_iter().map(String::from).collect(),
                        )
                    }
                }
            };
            actions.push(action);
        }

        for (address, tracked) in &current.resources {
            if desired.get(address).is_none() {
                actions.push(Action::new(
                    ActionType::Delete,
                    &tracked.resource_type,
                    address,
                    Vec::new(),
                ));
            }
        }

        Ok(Self::new(actions))
    }

    /// Plan destroying every tracked resource
    pub fn destroy_all(current: &GlobalState) -> Self {
        let actions = current
            .resources
            .iter()
            .map(|(address, tracked)| {
                Action::new(ActionType::Delete, &tracked.resource_type, address, Vec::new())
            })
            .collect();
        Self::new(actions)
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}
