//! Typed per-kind access to the management API
//!
//! Handlers talk to [`ResourceApi`] rather than to [`ArmClient`] directly, so
//! their semantics can be exercised against an in-memory fake.

use crate::client::ArmClient;
use crate::error::Result;
use crate::id::{ApplicationGroupId, ArmId, WorkspaceId};
use crate::models::{API_VERSION, ApplicationGroup, Workspace};
use crate::poller::OperationStatus;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// A model addressed by a typed identifier
pub trait ArmResource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Id: ArmId;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);
}

impl ArmResource for Workspace {
    type Id = WorkspaceId;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

impl ArmResource for ApplicationGroup {
    type Id = ApplicationGroupId;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }
}

#[async_trait]
pub trait ResourceApi<M: ArmResource>: Send + Sync {
    /// Subscription new resources are created in
    fn subscription_id(&self) -> &str;

    async fn get(&self, id: &M::Id) -> Result<M>;

    async fn create_or_update(&self, id: &M::Id, model: &M) -> Result<M>;

    /// Delete and wait for the operation to reach a terminal status
    async fn delete(&self, id: &M::Id) -> Result<OperationStatus>;
}

/// [`ResourceApi`] over a live [`ArmClient`]
pub struct ArmResourceClient<M> {
    client: Arc<ArmClient>,
    subscription_id: String,
    _model: PhantomData<fn() -> M>,
}

impl<M> ArmResourceClient<M> {
    pub fn new(client: Arc<ArmClient>, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            _model: PhantomData,
        }
    }
}

#[async_trait]
impl<M: ArmResource> ResourceApi<M> for ArmResourceClient<M> {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn get(&self, id: &M::Id) -> Result<M> {
        self.client.get(&id.to_string(), API_VERSION).await
    }

    async fn create_or_update(&self, id: &M::Id, model: &M) -> Result<M> {
        self.client.put(&id.to_string(), API_VERSION, model).await
    }

    async fn delete(&self, id: &M::Id) -> Result<OperationStatus> {
        let operation = self.client.delete(&id.to_string(), API_VERSION).await?;
        self.client.await_completion(operation).await
    }
}
