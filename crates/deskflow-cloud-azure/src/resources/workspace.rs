//! `azurerm_virtual_desktop_workspace`

use super::{ArmHandler, BaseConfig, KindConfig, ResourceKind};
use crate::models::{Workspace, WorkspaceProperties};
use crate::{location, tags, validate};
use deskflow_cloud::schema::validation::string_len_between;
use deskflow_cloud::{Attribute, DeclarativeState, ResourceSchema, Result, Timeouts};
use std::collections::BTreeMap;

pub const TYPE_NAME: &str = "azurerm_virtual_desktop_workspace";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceConfig {
    pub base: BaseConfig,
}

impl KindConfig for WorkspaceConfig {
    fn from_state(state: &DeclarativeState) -> Result<Self> {
        Ok(Self {
            base: BaseConfig::from_state(state)?,
        })
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }
}

pub struct WorkspaceKind;

impl ResourceKind for WorkspaceKind {
    const TYPE_NAME: &'static str = TYPE_NAME;

    type Model = Workspace;
    type Config = WorkspaceConfig;

    fn schema() -> ResourceSchema {
        ResourceSchema::new(TYPE_NAME)
            .with_timeouts(Timeouts::default())
            .with_attribute(validate::name_schema())
            .with_attribute(location::schema())
            .with_attribute(validate::resource_group_schema())
            .with_attribute(
                Attribute::optional_string("friendly_name")
                    .validate_with(string_len_between(1, 64))
                    .describe("Name shown to users in the Remote Desktop client"),
            )
            .with_attribute(
                Attribute::optional_string("description")
                    .validate_with(string_len_between(1, 512)),
            )
            .with_attribute(tags::schema())
    }

    fn to_model(config: &WorkspaceConfig) -> Workspace {
        let base = &config.base;
        Workspace {
            location: Some(base.location.clone()),
            tags: Some(base.tags.clone()),
            properties: WorkspaceProperties {
                friendly_name: base.friendly_name.clone(),
                description: base.description.clone(),
                application_group_references: None,
            },
            ..Default::default()
        }
    }

    fn location(model: &Workspace) -> Option<&str> {
        model.location.as_deref()
    }

    fn tags(model: &Workspace) -> Option<&BTreeMap<String, String>> {
        model.tags.as_ref()
    }

    fn write_state(model: &Workspace, state: &mut DeclarativeState) {
        state.set_optional("friendly_name", model.properties.friendly_name.as_deref());
        state.set_optional("description", model.properties.description.as_deref());
    }
}

pub type WorkspaceHandler = ArmHandler<WorkspaceKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ResourceApi;
    use crate::api::fake::FakeApi;
    use crate::error::AzureError;
    use crate::id::{ArmId, WorkspaceId};
    use crate::poller::OperationStatus;
    use crate::resources::test_support::ctx;
    use deskflow_cloud::{CloudError, Operation, OperationContext, ResourceHandler};
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<FakeApi<Workspace>>, WorkspaceHandler) {
        let api = Arc::new(FakeApi::new());
        let handler = WorkspaceHandler::new(api.clone());
        (api, handler)
    }

    fn config(name: &str) -> DeclarativeState {
        DeclarativeState::new()
            .with_attribute("name", name)
            .with_attribute("resource_group_name", "acctestRG-1")
            .with_attribute("location", "West US 2")
    }

    fn id(api: &FakeApi<Workspace>, name: &str) -> WorkspaceId {
        WorkspaceId::new(api.subscription_id(), "acctestRG-1", name)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (api, handler) = setup();
        let mut state = config("acctws1").with_attribute("friendly_name", "Team");

        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();

        let expected = id(&api, "acctws1");
        assert_eq!(state.id(), Some(expected.to_string().as_str()));
        assert_eq!(state.get_str("location"), Some("westus2"));
        assert_eq!(state.get_str("friendly_name"), Some("Team"));

        let flat = state.flatten();
        assert_eq!(flat.get("tags.%").map(String::as_str), Some("0"));
        assert_eq!(flat.get("resource_group_name").map(String::as_str), Some("acctestRG-1"));

        let stored = api.stored(&expected).unwrap();
        assert_eq!(stored.location.as_deref(), Some("westus2"));
    }

    #[tokio::test]
    async fn test_create_refuses_existing_resource() {
        let (api, handler) = setup();
        let existing_id = id(&api, "acctws1");
        api.insert(
            &existing_id,
            Workspace {
                location: Some("eastus".into()),
                ..Default::default()
            },
        );

        let mut state = config("acctws1");
        let err = handler
            .create(&ctx(Operation::Create), &mut state)
            .await
            .unwrap_err();

        match err {
            CloudError::AlreadyExists { resource_type, id } => {
                assert_eq!(resource_type, TYPE_NAME);
                assert_eq!(id, existing_id.to_string());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(state.is_absent());
        assert_eq!(
            api.stored(&existing_id).unwrap().location.as_deref(),
            Some("eastus")
        );
    }

    #[tokio::test]
    async fn test_create_probe_failure_is_reported() {
        let (api, handler) = setup();
        api.fail_next_get(AzureError::Api {
            status: 403,
            code: "AuthorizationFailed".into(),
            message: "no access".into(),
        });

        let err = handler
            .create(&ctx(Operation::Create), &mut config("acctws1"))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Remote { .. }));
        assert!(err.to_string().contains("checking for presence of existing"));
        assert_eq!(api.len(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_configuration() {
        let (api, handler) = setup();
        let mut state = config("bad--name").with_attribute("friendly_name", "x".repeat(65));

        let err = handler
            .create(&ctx(Operation::Create), &mut state)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Validation(_)));
        let message = err.to_string();
        assert!(message.contains("name"));
        assert!(message.contains("friendly_name"));
        assert_eq!(api.len(), 0);
    }

    #[tokio::test]
    async fn test_update_changes_friendly_name() {
        let (api, handler) = setup();
        let mut state = config("acctws1");
        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();

        state.set("friendly_name", "Renamed");
        state.set("tags", BTreeMap::from([("env".to_string(), "dev".to_string())]));
        handler.update(&ctx(Operation::Update), &mut state).await.unwrap();

        let stored = api.stored(&id(&api, "acctws1")).unwrap();
        assert_eq!(stored.properties.friendly_name.as_deref(), Some("Renamed"));
        assert_eq!(state.flatten().get("tags.env").map(String::as_str), Some("dev"));
    }

    #[tokio::test]
    async fn test_read_clears_vanished_resource() {
        let (api, handler) = setup();
        let mut state = config("acctws1");
        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();

        api.remove(&id(&api, "acctws1"));
        handler.read(&ctx(Operation::Read), &mut state).await.unwrap();

        assert!(state.is_absent());
        assert!(state.attributes().is_empty());
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_id() {
        let (_, handler) = setup();
        let mut state = DeclarativeState::with_id("/subscriptions/s/resourceGroups/rg");

        let err = handler.read(&ctx(Operation::Read), &mut state).await.unwrap_err();
        assert!(matches!(err, CloudError::MalformedId(_)));
    }

    #[tokio::test]
    async fn test_delete_then_exists() {
        let (api, handler) = setup();
        let mut state = config("acctws1");
        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();
        let raw_id = state.id().unwrap().to_string();

        assert!(handler.exists(&ctx(Operation::Read), &raw_id).await.unwrap());
        handler.delete(&ctx(Operation::Delete), &mut state).await.unwrap();

        assert!(state.is_absent());
        assert_eq!(api.len(), 0);
        assert!(!handler.exists(&ctx(Operation::Read), &raw_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_of_missing_resource_succeeds() {
        let (api, handler) = setup();
        let mut state = DeclarativeState::with_id(id(&api, "gone").to_string());

        handler.delete(&ctx(Operation::Delete), &mut state).await.unwrap();
        assert!(state.is_absent());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_state() {
        let (api, handler) = setup();
        let mut state = config("acctws1");
        handler.create(&ctx(Operation::Create), &mut state).await.unwrap();

        api.finish_deletes_with(OperationStatus::Failed {
            code: "Conflict".into(),
            message: "application groups still reference the workspace".into(),
        });
        let err = handler
            .delete(&ctx(Operation::Delete), &mut state)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("deleting Virtual Desktop Workspace"));
        assert!(!state.is_absent());
        assert_eq!(api.len(), 1);
    }

    #[tokio::test]
    async fn test_import_reads_existing() {
        let (api, handler) = setup();
        let existing = id(&api, "acctws1");
        api.insert(
            &existing,
            Workspace {
                location: Some("westeurope".into()),
                tags: Some(BTreeMap::from([("team".to_string(), "vdi".to_string())])),
                ..Default::default()
            },
        );

        let state = handler
            .import(&ctx(Operation::Read), &existing.to_string())
            .await
            .unwrap();
        assert_eq!(state.get_str("name"), Some("acctws1"));
        assert_eq!(state.get_str("location"), Some("westeurope"));
        assert_eq!(state.flatten().get("tags.team").map(String::as_str), Some("vdi"));

        let missing = handler
            .import(&ctx(Operation::Read), &id(&api, "other").to_string())
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_validate_id() {
        let (_, handler) = setup();
        let ws = WorkspaceId::new("s", "rg", "ws");
        assert!(handler.validate_id(&ws.to_string()).is_ok());

        let group = crate::id::ApplicationGroupId::new("s", "rg", "ag");
        assert!(handler.validate_id(&group.to_string()).is_err());
    }

    /// Never answers
    struct HangingApi;

    #[async_trait::async_trait]
    impl ResourceApi<Workspace> for HangingApi {
        fn subscription_id(&self) -> &str {
            "sub"
        }

        async fn get(&self, _id: &WorkspaceId) -> crate::error::Result<Workspace> {
            std::future::pending().await
        }

        async fn create_or_update(
            &self,
            _id: &WorkspaceId,
            _model: &Workspace,
        ) -> crate::error::Result<Workspace> {
            std::future::pending().await
        }

        async fn delete(&self, _id: &WorkspaceId) -> crate::error::Result<OperationStatus> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_api_hits_deadline() {
        let handler = WorkspaceHandler::new(Arc::new(HangingApi));
        let ctx = OperationContext::new(Operation::Create, Duration::from_secs(30 * 60));

        let err = handler
            .create(&ctx, &mut config("acctws1"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Timeout(_)));
        assert!(err.to_string().contains("creating Virtual Desktop Workspace"));
    }
}
