//! Acceptance test harness
//!
//! Runs manifests through the planner and applier against a live (or
//! emulated) management endpoint, the same way `desk apply` does, then checks
//! the results with direct API calls. Every run provisions its own resource
//! group and tears everything down again, including when a step fails.
//!
//! ```ignore
//! let data = TestData::new();
//! let harness = AcceptanceTest::new(&provider, data.clone());
//! harness
//!     .run(vec![TestStep::new(manifest).check(Check::exists("azurerm_virtual_desktop_workspace.test"))])
//!     .await?;
//! ```

use crate::error::{AzureError, Result};
use crate::provider::AzureProvider;
use deskflow_cloud::{
    Applier, CloudProvider, GlobalState, Operation, OperationContext, Plan, ResourceSet,
    Timeouts, parse_manifest,
};
use rand::Rng;
use regex::Regex;

/// API version used for the resource groups the harness creates
pub const RESOURCE_GROUP_API_VERSION: &str = "2019-10-01";

pub const DEFAULT_LOCATION: &str = "westus2";

/// Names and location shared by the resources of one test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestData {
    pub random_integer: u32,
    pub location: String,
}

impl TestData {
    /// Random suffix, location from `ARM_TEST_LOCATION` (default `westus2`)
    pub fn new() -> Self {
        let location =
            std::env::var("ARM_TEST_LOCATION").unwrap_or_else(|_| DEFAULT_LOCATION.to_string());
        Self::with_values(rand::thread_rng().gen_range(100_000..1_000_000), location)
    }

    pub fn with_values(random_integer: u32, location: impl Into<String>) -> Self {
        Self {
            random_integer,
            location: location.into(),
        }
    }

    pub fn resource_group_name(&self) -> String {
        format!("acctestRG-{}", self.random_integer)
    }

    /// `{prefix}{random_integer}`, e.g. `acctws123456`
    pub fn name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.random_integer)
    }
}

impl Default for TestData {
    fn default() -> Self {
        Self::new()
    }
}

/// Assertion made after a step has been applied
#[derive(Debug, Clone)]
pub enum Check {
    /// The tracked resource exists remotely
    Exists(String),
    /// Flattened state attribute equals a value (`tags.%`, `location`, ...)
    Attribute {
        address: String,
        key: String,
        value: String,
    },
    /// Flattened state attribute is present and non-empty
    AttributeSet { address: String, key: String },
}

impl Check {
    pub fn exists(address: impl Into<String>) -> Self {
        Check::Exists(address.into())
    }

    pub fn attribute(
        address: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Check::Attribute {
            address: address.into(),
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn attribute_set(address: impl Into<String>, key: impl Into<String>) -> Self {
        Check::AttributeSet {
            address: address.into(),
            key: key.into(),
        }
    }
}

/// One manifest to apply, followed by checks or an expected failure
#[derive(Debug, Clone)]
pub struct TestStep {
    pub manifest: String,
    pub checks: Vec<Check>,
    pub expect_error: Option<Regex>,
}

impl TestStep {
    pub fn new(manifest: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            checks: Vec::new(),
            expect_error: None,
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Expect the apply to fail with an error matching `pattern`
    pub fn expect_error(mut self, pattern: Regex) -> Self {
        self.expect_error = Some(pattern);
        self
    }
}

/// Error raised when a resource that is not in the state already exists remotely
pub fn requires_import_error() -> Regex {
    Regex::new(r"A resource with the ID .+ already exists").expect("valid pattern")
}

pub struct AcceptanceTest<'a> {
    provider: &'a AzureProvider,
    data: TestData,
    timeouts: Timeouts,
}

impl<'a> AcceptanceTest<'a> {
    pub fn new(provider: &'a AzureProvider, data: TestData) -> Self {
        Self {
            provider,
            data,
            timeouts: Timeouts::default(),
        }
    }

    pub fn data(&self) -> &TestData {
        &self.data
    }

    fn resource_group_path(&self) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}",
            self.provider.subscription_id(),
            self.data.resource_group_name()
        )
    }

    /// Run every step in order, then destroy what they created
    pub async fn run(&self, steps: Vec<TestStep>) -> Result<()> {
        self.create_resource_group().await?;

        let mut state = GlobalState::new();
        let outcome = self.run_steps(&steps, &mut state).await;
        let teardown = self.teardown(&mut state).await;

        let deleted = self.delete_resource_group().await;
        outcome.and(teardown).and(deleted)
    }

    async fn run_steps(&self, steps: &[TestStep], state: &mut GlobalState) -> Result<()> {
        for (i, step) in steps.iter().enumerate() {
            let number = i + 1;
            tracing::info!("Acceptance step {}", number);

            let desired = parse_manifest(&step.manifest)?;
            let plan = Plan::compute(self.provider, &desired, state)?;
            let result = Applier::new(self.provider).apply(&plan, &desired, state).await;
            let errors: Vec<String> = result.failed.into_iter().filter_map(|r| r.error).collect();

            match &step.expect_error {
                Some(pattern) => {
                    if !errors.iter().any(|e| pattern.is_match(e)) {
                        return Err(AzureError::Check(format!(
                            "step {}: expected an error matching {:?}, got {:?}",
                            number,
                            pattern.as_str(),
                            errors
                        )));
                    }
                    continue;
                }
                None if !errors.is_empty() => {
                    return Err(AzureError::Check(format!(
                        "step {}: apply failed: {}",
                        number,
                        errors.join("; ")
                    )));
                }
                None => {}
            }

            for check in &step.checks {
                self.verify(check, state)
                    .await
                    .map_err(|e| AzureError::Check(format!("step {}: {}", number, e)))?;
            }
        }
        Ok(())
    }

    async fn verify(&self, check: &Check, state: &GlobalState) -> Result<()> {
        match check {
            Check::Exists(address) => {
                let (resource_type, id) = tracked_id(state, address)?;
                let handler = self.provider.require_handler(&resource_type)?;
                let ctx = OperationContext::for_operation(&self.timeouts, Operation::Read);
                if !handler.exists(&ctx, &id).await? {
                    return Err(AzureError::Check(format!("{} ({}) does not exist", address, id)));
                }
                Ok(())
            }
            Check::Attribute {
                address,
                key,
                value,
            } => {
                let actual = flattened(state, address, key)?;
                if actual.as_deref() != Some(value.as_str()) {
                    return Err(AzureError::Check(format!(
                        "{}: expected {} = {:?}, got {:?}",
                        address, key, value, actual
                    )));
                }
                Ok(())
            }
            Check::AttributeSet { address, key } => {
                match flattened(state, address, key)? {
                    Some(v) if !v.is_empty() => Ok(()),
                    _ => Err(AzureError::Check(format!("{}: {} is not set", address, key))),
                }
            }
        }
    }

    /// Destroy every tracked resource and confirm each is gone remotely
    async fn teardown(&self, state: &mut GlobalState) -> Result<()> {
        let created: Vec<(String, String, String)> = state
            .resources
            .iter()
            .filter_map(|(address, tracked)| {
                tracked
                    .state
                    .id()
                    .map(|id| (address.clone(), tracked.resource_type.clone(), id.to_string()))
            })
            .collect();

        let plan = Plan::destroy_all(state);
        let result = Applier::new(self.provider).apply(&plan, &ResourceSet::new(), state).await;
        if !result.is_success() {
            let errors: Vec<String> = result.failed.into_iter().filter_map(|r| r.error).collect();
            return Err(AzureError::Check(format!("destroy failed: {}", errors.join("; "))));
        }

        let ctx = OperationContext::for_operation(&self.timeouts, Operation::Read);
        for (address, resource_type, id) in created {
            let handler = self.provider.require_handler(&resource_type)?;
            if handler.exists(&ctx, &id).await? {
                return Err(AzureError::Check(format!(
                    "{} ({}) still exists after destroy",
                    address, id
                )));
            }
        }
        Ok(())
    }

    async fn create_resource_group(&self) -> Result<()> {
        let path = self.resource_group_path();
        tracing::info!("Creating resource group {}", self.data.resource_group_name());
        let body = serde_json::json!({ "location": self.data.location });
        let _: serde_json::Value = self
            .provider
            .client()
            .put(&path, RESOURCE_GROUP_API_VERSION, &body)
            .await?;
        Ok(())
    }

    async fn delete_resource_group(&self) -> Result<()> {
        let client = self.provider.client();
        let path = self.resource_group_path();
        tracing::info!("Deleting resource group {}", self.data.resource_group_name());

        let operation = match client.delete(&path, RESOURCE_GROUP_API_VERSION).await {
            Ok(operation) => operation,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        let status = client.await_completion(operation).await?;
        if !status.is_success() {
            return Err(AzureError::Operation(format!(
                "deleting resource group {}: {}",
                self.data.resource_group_name(),
                status
            )));
        }
        Ok(())
    }
}

fn tracked_id(state: &GlobalState, address: &str) -> Result<(String, String)> {
    let tracked = state
        .get_resource(address)
        .ok_or_else(|| AzureError::Check(format!("{} is not in the state", address)))?;
    let id = tracked
        .state
        .id()
        .ok_or_else(|| AzureError::Check(format!("{} has no ID", address)))?;
    Ok((tracked.resource_type.clone(), id.to_string()))
}

fn flattened(state: &GlobalState, address: &str, key: &str) -> Result<Option<String>> {
    let tracked = state
        .get_resource(address)
        .ok_or_else(|| AzureError::Check(format!("{} is not in the state", address)))?;
    Ok(tracked.state.flatten().remove(key))
}
