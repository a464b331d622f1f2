//! In-memory provider used by the orchestration tests

use crate::error::{CloudError, Result};
use crate::provider::{AuthStatus, CloudProvider, ResourceHandler};
use crate::schema::{Attribute, ResourceSchema};
use crate::state::DeclarativeState;
use crate::timeouts::OperationContext;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub const FAKE_TYPE: &str = "fake_thing";

type Store = Arc<Mutex<BTreeMap<String, DeclarativeState>>>;

pub struct FakeHandler {
    schema: ResourceSchema,
    store: Store,
}

impl FakeHandler {
    fn new(store: Store) -> Self {
        Self {
            schema: ResourceSchema::new(FAKE_TYPE)
                .with_attribute(Attribute::required_string("name").force_new())
                .with_attribute(Attribute::optional_string("size")),
            store,
        }
    }

    fn name_of(id: &str) -> Result<&str> {
        id.strip_prefix("fake/")
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CloudError::MalformedId(id.to_string()))
    }
}

#[async_trait]
impl ResourceHandler for FakeHandler {
    fn type_name(&self) -> &'static str {
        FAKE_TYPE
    }

    fn display_name(&self) -> &'static str {
        "Fake Thing"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    fn validate_id(&self, id: &str) -> Result<()> {
        Self::name_of(id).map(|_| ())
    }

    async fn create(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let name = state.get_str("name").unwrap_or_default().to_string();
        let id = format!("fake/{}", name);
        {
            let mut store = self.store.lock().unwrap();
            if store.contains_key(&name) {
                return Err(CloudError::AlreadyExists {
                    resource_type: FAKE_TYPE.to_string(),
                    id,
                });
            }
            store.insert(name, state.clone());
        }
        state.set_id(id);
        self.read(ctx, state).await
    }

    async fn update(&self, ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = state.id().unwrap_or_default().to_string();
        let name = Self::name_of(&id)?.to_string();
        self.store.lock().unwrap().insert(name, state.clone());
        self.read(ctx, state).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = state.id().unwrap_or_default().to_string();
        let name = Self::name_of(&id)?;
        match self.store.lock().unwrap().get(name) {
            Some(remote) => {
                let mut fresh = DeclarativeState::with_id(&id).with_attribute("name", name);
                if let Some(size) = remote.get_optional_str("size") {
                    fresh.set("size", size);
                }
                *state = fresh;
            }
            None => state.clear(),
        }
        Ok(())
    }

    async fn delete(&self, _ctx: &OperationContext, state: &mut DeclarativeState) -> Result<()> {
        let id = state.id().unwrap_or_default().to_string();
        let name = Self::name_of(&id)?;
        self.store.lock().unwrap().remove(name);
        Ok(())
    }

    async fn exists(&self, _ctx: &OperationContext, id: &str) -> Result<bool> {
        let name = Self::name_of(id)?;
        Ok(self.store.lock().unwrap().contains_key(name))
    }
}

#[derive(Default)]
pub struct FakeProvider {
    store: Store,
}

impl FakeProvider {
    /// Pretend something was created outside of deskflow
    pub fn seed(&self, name: &str) {
        self.store.lock().unwrap().insert(
            name.to_string(),
            DeclarativeState::new().with_attribute("name", name),
        );
    }

    pub fn forget(&self, name: &str) {
        self.store.lock().unwrap().remove(name);
    }

    pub fn remote(&self, name: &str) -> Option<DeclarativeState> {
        self.store.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn display_name(&self) -> &str {
        "Fake"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("fake"))
    }

    fn resource_types(&self) -> Vec<&'static str> {
        vec![FAKE_TYPE]
    }

    fn handler(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>> {
        (resource_type == FAKE_TYPE)
            .then(|| Arc::new(FakeHandler::new(self.store.clone())) as Arc<dyn ResourceHandler>)
    }
}
