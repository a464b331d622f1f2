//! Resource handlers
//!
//! Both Virtual Desktop kinds share one lifecycle, implemented once by
//! [`ArmHandler`]. A [`ResourceKind`] supplies the schema, the typed
//! configuration and the mapping between that configuration, the wire model
//! and the declarative state.

pub mod application_group;
pub mod workspace;

pub use application_group::{ApplicationGroupConfig, ApplicationGroupHandler, ApplicationGroupKind};
pub use workspace::{WorkspaceConfig, WorkspaceHandler, WorkspaceKind};

use crate::api::{ArmResource, ResourceApi};
use crate::id::ArmId;
use crate::location;
use crate::poller::OperationStatus;
use crate::tags;
use async_trait::async_trait;
use deskflow_cloud::{
    CloudError, DeclarativeState, OperationContext, ResourceHandler, ResourceSchema, Result,
};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

type IdOf<K> = <<K as ResourceKind>::Model as ArmResource>::Id;

/// Fields every Virtual Desktop resource is declared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseConfig {
    pub name: String,
    pub resource_group_name: String,
    /// Already normalized
    pub location: String,
    pub tags: BTreeMap<String, String>,
    pub friendly_name: Option<String>,
    pub description: Option<String>,
}

impl BaseConfig {
    pub fn from_state(state: &DeclarativeState) -> Result<Self> {
        Ok(Self {
            name: required(state, "name")?,
            resource_group_name: required(state, "resource_group_name")?,
            location: location::normalize(&required(state, "location")?),
            tags: tags::expand(state),
            friendly_name: state.get_optional_str("friendly_name").map(String::from),
            description: state.get_optional_str("description").map(String::from),
        })
    }
}

pub(crate) fn required(state: &DeclarativeState, key: &str) -> Result<String> {
    state
        .get_optional_str(key)
        .map(String::from)
        .ok_or_else(|| CloudError::Validation(format!("`{}` is required", key)))
}

/// Typed configuration of one kind
pub trait KindConfig: Sized + Send + Sync {
    fn from_state(state: &DeclarativeState) -> Result<Self>;

    fn base(&self) -> &BaseConfig;
}

/// Static description of a resource kind
pub trait ResourceKind: Send + Sync + 'static {
    /// Resource type name in manifests (e.g., "azurerm_virtual_desktop_workspace")
    const TYPE_NAME: &'static str;

    type Model: ArmResource;
    type Config: KindConfig;

    fn schema() -> ResourceSchema;

    /// Request payload for `config`
    fn to_model(config: &Self::Config) -> Self::Model;

    fn location(model: &Self::Model) -> Option<&str>;

    fn tags(model: &Self::Model) -> Option<&BTreeMap<String, String>>;

    /// Copy the kind-specific attributes the API returned into `state`
    fn write_state(model: &Self::Model, state: &mut DeclarativeState);
}

/// CRUD handler for any [`ResourceKind`] backed by a [`ResourceApi`]
pub struct ArmHandler<K: ResourceKind> {
    api: Arc<dyn ResourceApi<K::Model>>,
    schema: ResourceSchema,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> ArmHandler<K> {
    pub fn new(api: Arc<dyn ResourceApi<K::Model>>) -> Self {
        Self {
            api,
            schema: K::schema(),
            _kind: PhantomData,
        }
    }

    /// `Virtual Desktop Workspace "ws" (Resource Group "rg")`
    fn describe(id: &IdOf<K>) -> String {
        format!(
            "{} {:?} (Resource Group {:?})",
            <IdOf<K> as ArmId>::KIND,
            id.name(),
            id.resource_group()
        )
    }

    fn id_from_state(state: &DeclarativeState) -> Result<IdOf<K>> {
        let raw = state.id().ok_or_else(|| {
            CloudError::StateError(format!("{} has no ID in state", <IdOf<K> as ArmId>::KIND))
        })?;
        <IdOf<K> as ArmId>::parse(raw)
    }

    /// Fail with `AlreadyExists` if something already lives at `id`
    async fn ensure_absent(&self, id: &IdOf<K>) -> Result<()> {
        match self.api.get(id).await {
            Ok(existing) => match existing.id().filter(|i| !i.is_empty()) {
                Some(existing_id) => Err(CloudError::AlreadyExists {
                    resource_type: K::TYPE_NAME.to_string(),
                    id: existing_id.to_string(),
                }),
                None => Ok(()),
            },
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(CloudError::remote(
                format!("checking for presence of existing {}", Self::describe(id)),
                e,
            )),
        }
    }

    /// PUT the configuration, then record the canonical ID and observed attributes
    async fn upsert(&self, id: &IdOf<K>, config: &K::Config, state: &mut DeclarativeState) -> Result<()> {
        let model = K::to_model(config);
        self.api
            .create_or_update(id, &model)
            .await
            .map_err(|e| CloudError::remote(format!("creating {}", Self::describe(id)), e))?;

        let fetched = self
            .api
            .get(id)
            .await
            .map_err(|e| CloudError::remote(format!("retrieving {}", Self::describe(id)), e))?;

        let canonical = fetched
            .id()
            .filter(|i| !i.is_empty())
            .ok_or_else(|| {
                CloudError::remote(
                    format!("reading ID of {}", Self::describe(id)),
                    "the API returned no resource ID",
                )
            })?
            .to_string();

        state.set_id(canonical);
        self.refresh(state).await
    }

    /// Read body shared by create, update and read
    async fn refresh(&self, state: &mut DeclarativeState) -> Result<()> {
        let id = Self::id_from_state(state)?;

        let model = match self.api.get(&id).await {
            Ok(model) => model,
            Err(e) if e.is_not_found() => {
                tracing::warn!("{} was not found - removing from state", Self::describe(&id));
                state.clear();
                return Ok(());
            }
            Err(e) => {
                return Err(CloudError::remote(
                    format!("making Read request on {}", Self::describe(&id)),
                    e,
                ));
            }
        };

        state.set("name", id.name());
        state.set("resource_group_name", id.resource_group());
        if let Some(loc) = K::location(&model) {
            state.set("location", location::normalize(loc));
        }
        tags::flatten_and_set(state, K::tags(&model));
        K::write_state(&model, state);
        Ok(())
    }
}

#[async_trait]
impl<K: ResourceKind> ResourceHandler for ArmHandler<K> {
    fn type_name(&self) -> &'static str {
        K::TYPE_NAME
    }

    fn display_name(&self) -> &'static str {
        <IdOf<K> as ArmId>::KIND
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        <IdOf<K> as ArmId>::parse(id).map(|_| ())
    }

    async fn create(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        self.schema.check(state)?;
        let config = K::Config::from_state(state)?;
        let base = config.base();
        let id = <IdOf<K> as ArmId>::new(
            self.api.subscription_id(),
            &base.resource_group_name,
            &base.name,
        );

        tracing::info!("Creating {}", Self::describe(&id));
        ctx.run(&format!("creating {}", Self::describe(&id)), async {
            self.ensure_absent(&id).await?;
            self.upsert(&id, &config, state).await
        })
        .await
    }

    async fn update(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = Self::id_from_state(state)?;
        self.schema.check(state)?;
        let config = K::Config::from_state(state)?;

        tracing::info!("Updating {}", Self::describe(&id));
        ctx.run(&format!("updating {}", Self::describe(&id)), async {
            self.upsert(&id, &config, state).await
        })
        .await
    }

    async fn read(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = Self::id_from_state(state)?;
        ctx.run(&format!("reading {}", Self::describe(&id)), self.refresh(state))
            .await
    }

    async fn delete(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = Self::id_from_state(state)?;
        let what = format!("deleting {}", Self::describe(&id));

        tracing::info!("Deleting {}", Self::describe(&id));
        let status = ctx
            .run(&what, async {
                match self.api.delete(&id).await {
                    Ok(status) => Ok(status),
                    Err(e) if e.is_not_found() => {
                        tracing::debug!("{} is already gone", Self::describe(&id));
                        Ok(OperationStatus::Succeeded)
                    }
                    Err(e) => Err(CloudError::remote(what.clone(), e)),
                }
            })
            .await?;

        match status {
            OperationStatus::Succeeded => {
                state.clear();
                Ok(())
            }
            failed => Err(CloudError::remote(
                what,
                format!("the delete operation finished with status {}", failed),
            )),
        }
    }

    async fn exists(&self, ctx: &OperationContext, id: &str) -> Result<bool> {
        let id = <IdOf<K> as ArmId>::parse(id)?;
        ctx.run(&format!("checking {}", Self::describe(&id)), async {
            match self.api.get(&id).await {
                Ok(_) => Ok(true),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(CloudError::remote(
                    format!("checking existence of {}", Self::describe(&id)),
                    e,
                )),
            }
        })
        .await
    }
}
