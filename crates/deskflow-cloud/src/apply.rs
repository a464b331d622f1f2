//! Sequential execution of plans against a provider

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::error::{CloudError, Result};
use crate::provider::{CloudProvider, ResourceConfig, ResourceSet, split_address};
use crate::state::{GlobalState, LifecycleStatus, TrackedResource};
use crate::timeouts::{Operation, OperationContext, Timeouts};

/// Drives resource handlers one action at a time and records the outcome in
/// the state. A failed action leaves its entry exactly as it was.
pub struct Applier<'a> {
    provider: &'a dyn CloudProvider,
}

impl<'a> Applier<'a> {
    pub fn new(provider: &'a dyn CloudProvider) -> Self {
        Self { provider }
    }

    pub async fn apply(
        &self,
        plan: &Plan,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> ApplyResult {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for action in &plan.actions {
            if action.action_type == ActionType::NoOp {
                continue;
            }

            tracing::info!("{}", action.description);
            match self.apply_action(action, desired, state).await {
                Ok(message) => result.add_success(action.id.clone(), message),
                Err(e) => {
                    tracing::error!("{} failed: {}", action.address, e);
                    result.add_failure(action.id.clone(), e.to_string());
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn apply_action(
        &self,
        action: &Action,
        desired: &ResourceSet,
        state: &mut GlobalState,
    ) -> Result<String> {
        let wanted = || {
            desired.get(&action.address).ok_or_else(|| {
                CloudError::Manifest(format!("{} is not declared", action.address))
            })
        };

        match action.action_type {
            ActionType::Create => {
                let id = self.create(wanted()?, state).await?;
                Ok(format!("{} created: {}", action.address, id))
            }
            ActionType::Update => {
                self.update(wanted()?, state).await?;
                Ok(format!("{} updated", action.address))
            }
            ActionType::Replace => {
                let resource = wanted()?;
                self.destroy(&action.address, state).await?;
                let id = self.create(resource, state).await?;
                Ok(format!("{} replaced: {}", action.address, id))
            }
            ActionType::Delete => {
                self.destroy(&action.address, state).await?;
                Ok(format!("{} destroyed", action.address))
            }
            ActionType::NoOp => Ok(String::new()),
        }
    }

    async fn create(&self, resource: &ResourceConfig, state: &mut GlobalState) -> Result<String> {
        let handler = self.provider.require_handler(&resource.resource_type)?;

        let mut tracked = TrackedResource::new(&resource.resource_type, resource.config.clone())
            .with_timeouts(resource.timeouts);
        tracked.transition(LifecycleStatus::Creating)?;

        let ctx = OperationContext::for_operation(&resource.timeouts, Operation::Create);
        let mut working = resource.config.clone();
        handler.create(&ctx, &mut working).await?;

        let id = working.id().unwrap_or_default().to_string();
        tracked.state = working;
        tracked.transition(LifecycleStatus::Present)?;
        state.set_resource(resource.address(), tracked);
        Ok(id)
    }

    async fn update(&self, resource: &ResourceConfig, state: &mut GlobalState) -> Result<()> {
        let address = resource.address();
        let handler = self.provider.require_handler(&resource.resource_type)?;
        let mut tracked = state
            .get_resource(&address)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("{} is not in the state", address)))?;
        tracked.transition(LifecycleStatus::Updating)?;

        let mut working = resource.config.clone();
        if let Some(id) = tracked.state.id() {
            working.set_id(id);
        }

        let ctx = OperationContext::for_operation(&resource.timeouts, Operation::Update);
        handler.update(&ctx, &mut working).await?;

        if working.is_absent() {
            tracing::warn!("{} disappeared during update, removing from state", address);
            state.remove_resource(&address);
            return Ok(());
        }

        tracked.state = working;
        tracked.timeouts = resource.timeouts;
        tracked.transition(LifecycleStatus::Present)?;
        state.set_resource(address, tracked);
        Ok(())
    }

    /// Delete a tracked resource and drop it from the state
    pub async fn destroy(&self, address: &str, state: &mut GlobalState) -> Result<()> {
        let mut tracked = state
            .get_resource(address)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("{} is not in the state", address)))?;
        let handler = self.provider.require_handler(&tracked.resource_type)?;

        if tracked.state.is_absent() {
            state.remove_resource(address);
            return Ok(());
        }

        tracked.transition(LifecycleStatus::Deleting)?;
        let ctx = OperationContext::for_operation(&tracked.timeouts, Operation::Delete);
        let mut working = tracked.state.clone();
        handler.delete(&ctx, &mut working).await?;

        tracked.transition(LifecycleStatus::Absent)?;
        state.remove_resource(address);
        Ok(())
    }

    /// Re-read every tracked resource, dropping the ones that no longer exist
    pub async fn refresh(&self, state: &mut GlobalState) -> ApplyResult {
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();
        let addresses: Vec<String> = state.resources.keys().cloned().collect();

        for address in addresses {
            let action_id = format!("refresh-{}", address);
            match self.refresh_one(&address, state).await {
                Ok(true) => result.add_success(action_id, format!("{} refreshed", address)),
                Ok(false) => result.add_success(
                    action_id,
                    format!("{} no longer exists, removed from state", address),
                ),
                Err(e) => result.add_failure(action_id, e.to_string()),
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    async fn refresh_one(&self, address: &str, state: &mut GlobalState) -> Result<bool> {
        let Some(mut tracked) = state.get_resource(address).cloned() else {
            return Ok(false);
        };
        let handler = self.provider.require_handler(&tracked.resource_type)?;
        let ctx = OperationContext::for_operation(&tracked.timeouts, Operation::Read);

        let mut working = tracked.state.clone();
        handler.read(&ctx, &mut working).await?;

        if working.is_absent() {
            tracing::warn!("{} was not found - removing from state", address);
            state.remove_resource(address);
            return Ok(false);
        }

        tracked.state = working;
        tracked.transition(LifecycleStatus::Present)?;
        state.set_resource(address.to_string(), tracked);
        Ok(true)
    }

    /// Adopt an existing remote resource under `address`
    pub async fn import(
        &self,
        address: &str,
        id: &str,
        timeouts: Timeouts,
        state: &mut GlobalState,
    ) -> Result<()> {
        let (resource_type, _) = split_address(address)?;
        if state.get_resource(address).is_some() {
            return Err(CloudError::StateError(format!(
                "{} is already managed; remove it from the state before importing",
                address
            )));
        }

        let handler = self.provider.require_handler(resource_type)?;
        let ctx = OperationContext::for_operation(&timeouts, Operation::Read);
        let imported = handler.import(&ctx, id).await?;

        let mut tracked = TrackedResource::new(resource_type, imported).with_timeouts(timeouts);
        tracked.transition(LifecycleStatus::Present)?;
        state.set_resource(address.to_string(), tracked);
        Ok(())
    }
}
