//! `azurerm_virtual_desktop_application_group`

use super::{ArmHandler, BaseConfig, KindConfig, ResourceKind, required};
use crate::id::{ArmId, HostPoolId};
use crate::models::{ApplicationGroup, ApplicationGroupProperties, ApplicationGroupType};
use crate::{location, tags, validate};
use deskflow_cloud::schema::validation::{from_fn, string_in_slice, string_len_between};
use deskflow_cloud::{Attribute, DeclarativeState, ResourceSchema, Result, Timeouts};
use std::collections::BTreeMap;

pub const TYPE_NAME: &str = "azurerm_virtual_desktop_application_group";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationGroupConfig {
    pub base: BaseConfig,
    pub group_type: ApplicationGroupType,
    pub host_pool_id: HostPoolId,
}

impl KindConfig for ApplicationGroupConfig {
    fn from_state(state: &DeclarativeState) -> Result<Self> {
        Ok(Self {
            base: BaseConfig::from_state(state)?,
            group_type: required(state, "type")?.parse()?,
            host_pool_id: HostPoolId::parse(&required(state, "host_pool_id")?)?,
        })
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }
}

fn host_pool_id(value: &str) -> std::result::Result<(), String> {
    HostPoolId::parse(value).map(|_| ()).map_err(|e| e.to_string())
}

/// Canonical segment casing, so `resourcegroups/.../hostpools/...` does not diff
fn canonical_host_pool_id(value: &str) -> String {
    HostPoolId::parse(value)
        .map(|id| id.to_string())
        .unwrap_or_else(|_| value.to_string())
}

pub struct ApplicationGroupKind;

impl ResourceKind for ApplicationGroupKind {
    const TYPE_NAME: &'static str = TYPE_NAME;

    type Model = ApplicationGroup;
    type Config = ApplicationGroupConfig;

    fn schema() -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_timeouts(Timeouts::default())
            .with_attribute(validate::name_schema())
            .with_attribute(location::schema())
            .with_attribute(validate::resource_group_schema())
            .with_attribute(
                Attribute::required_string("type")
                    .force_new()
                    .validate_with(string_in_slice(ApplicationGroupType::ALL, false))
                    .describe("Desktop or RemoteApp"),
            )
            .with_attribute(
                Attribute::required_string("host_pool_id")
                    .normalize_with(canonical_host_pool_id)
                    .validate_with(from_fn(host_pool_id))
                    .describe("Host pool the group publishes from"),
            )
            .with_attribute(
                Attribute::optional_string("friendly_name").validate_with(string_len_between(1, 64)),
            )
            .with_attribute(
                Attribute::optional_string("description")
                    .validate_with(string_len_between(1, 512)),
            )
            .with_attribute(tags::schema())
    }

    fn to_model(config: &ApplicationGroupConfig) -> ApplicationGroup {
        let base = &config.base;
        ApplicationGroup {
            location: Some(base.location.clone()),
            tags: Some(base.tags.clone()),
            properties: ApplicationGroupProperties {
                friendly_name: base.friendly_name.clone(),
                description: base.description.clone(),
                application_group_type: Some(config.group_type),
                host_pool_arm_path: Some(config.host_pool_id.to_string()),
                workspace_arm_path: None,
            },
            ..Default::default()
        }
    }

    fn location(model: &ApplicationGroup) -> Option<&str> {
        model.location.as_deref()
    }

    fn tags(model: &ApplicationGroup) -> Option<&BTreeMap<String, String>> {
        model.tags.as_ref()
    }

    fn write_state(model: &ApplicationGroup, state: &mut DeclarativeState) {
        let props = &model.properties;
        state.set_optional("friendly_name", props.friendly_name.as_deref());
        state.set_optional("description", props.description.as_deref());
        if let Some(group_type) = props.application_group_type {
            state.set("type", group_type.as_str());
        }
        if let Some(path) = props.host_pool_arm_path.as_deref() {
            // the service echoes the path with its own casing
            state.set("host_pool_id", canonical_host_pool_id(path));
        }
    }
}

pub type ApplicationGroupHandler = ArmHandler<ApplicationGroupKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceApi;
    use crate::api::fake::FakeApi;
    use crate::id::ApplicationGroupId;
    use crate::resources::test_support::ctx;
    use deskflow_cloud::{CloudError, Operation, ResourceHandler};
    use std::sync::Arc;

    fn setup() -> (Arc<FakeApi<ApplicationGroup>>, ApplicationGroupHandler) {
        let api = Arc::new(FakeApi::new());
        let handler = ApplicationGroupHandler::new(api.clone());
        (api, handler)
    }

    fn pool(api: &FakeApi<ApplicationGroup>) -> HostPoolId {
        HostPoolId::new(api.subscription_id(), "acctestRG-2", "acctesthp2")
    }

    fn lower_case_path(id: &HostPoolId) -> String {
        id.to_string()
            .replace("resourceGroups", "resourcegroups")
            .replace("hostPools", "hostpools")
    }

    fn config(api: &FakeApi<ApplicationGroup>, group_type: &str) -> DeclarativeState {
        DeclarativeState::new()
            .with_attribute("name", "acctag2")
            .with_attribute("resource_group_name", "acctestRG-2")
            .with_attribute("location", "westus2")
            .with_attribute("type", group_type)
            .with_attribute("host_pool_id", pool(api).to_string())
    }

    #[tokio::test]
    async fn test_create_sends_group_type_and_host_pool() {
        let (api, handler) = setup();
        let mut state = config(&api, "RemoteApp").with_attribute("description", "apps");

        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();

        let id = ApplicationGroupId::parse(state.id().unwrap()).unwrap();
        assert_eq!(id.name, "acctag2");

        let stored = api.stored(&id).unwrap();
        assert_eq!(
            stored.properties.application_group_type,
            Some(ApplicationGroupType::RemoteApp)
        );
        assert_eq!(
            stored.properties.host_pool_arm_path,
            Some(pool(&api).to_string())
        );
        assert_eq!(state.get_str("type"), Some("RemoteApp"));
        assert_eq!(state.get_str("description"), Some("apps"));
    }

    #[tokio::test]
    async fn test_read_canonicalizes_host_pool_path() {
        let (api, handler) = setup();
        let id = ApplicationGroupId::new(api.subscription_id(), "acctestRG-2", "acctag2");
        let lower = lower_case_path(&pool(&api));
        api.insert(
            &id,
            ApplicationGroup {
                location: Some("westus2".into()),
                properties: ApplicationGroupProperties {
                    application_group_type: Some(ApplicationGroupType::Desktop),
                    host_pool_arm_path: Some(lower),
                    ..Default::default()
                },
                ..Default::default()
            },
        );

        let mut state = DeclarativeState::with_id(id.to_string());
        handler.read(&ctx(Operation::Read), &mut state).await.unwrap();

        assert_eq!(state.get_str("host_pool_id"), Some(pool(&api).to_string().as_str()));
        assert_eq!(state.get_str("type"), Some("Desktop"));
    }

    #[tokio::test]
    async fn test_invalid_type_and_host_pool_are_rejected() {
        let (api, handler) = setup();
        let mut state = config(&api, "desktop");
        state.set("host_pool_id", "/subscriptions/s/resourceGroups/rg");

        let err = handler
            .create(&ctx(Operation::Create), &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Validation(_)));
        let message = err.to_string();
        assert!(message.contains("type"));
        assert!(message.contains("host_pool_id"));
        assert_eq!(api.len(), 0);
    }

    #[tokio::test]
    async fn test_collision_names_the_application_group_type() {
        let (api, handler) = setup();
        let id = ApplicationGroupId::new(api.subscription_id(), "acctestRG-2", "acctag2");
        api.insert(&id, ApplicationGroup::default());

        let err = handler
            .create(&ctx(Operation::Create), &mut config(&api, "Desktop"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        assert!(err.to_string().contains(TYPE_NAME));
    }

    #[test]
    fn test_type_change_forces_replacement() {
        let (api, handler) = setup();
        let prior = config(&api, "Desktop");
        let desired = config(&api, "RemoteApp").with_attribute("friendly_name", "Apps");

        let schema = handler.schema();
        assert_eq!(schema.force_new_changes(&prior, &desired), vec!["type"]);
        assert_eq!(schema.in_place_changes(&prior, &desired), vec!["friendly_name"]);

        // moving to another host pool is an in-place update
        let moved = config(&api, "Desktop").with_attribute(
            "host_pool_id",
            HostPoolId::new(api.subscription_id(), "acctestRG-2", "otherhp").to_string(),
        );
        assert!(schema.force_new_changes(&prior, &moved).is_empty());
        assert_eq!(schema.in_place_changes(&prior, &moved), vec!["host_pool_id"]);
    }

    #[tokio::test]
    async fn test_lower_case_host_pool_path_is_stable_after_create() {
        let (api, handler) = setup();
        let desired = config(&api, "Desktop").with_attribute("host_pool_id", lower_case_path(&pool(&api)));

        let mut state = desired.clone();
        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();
        handler.read(&ctx(Operation::Read), &mut state).await.unwrap();

        assert_eq!(state.get_str("host_pool_id"), Some(pool(&api).to_string().as_str()));
        assert!(handler.schema().changed_attributes(&state, &desired).is_empty());
    }
}
