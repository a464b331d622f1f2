use deskflow_cloud_azure::acceptance::TestData;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use wiremock::{Request, Respond, ResponseTemplate};

/// Minimal in-memory Resource Manager: PUT stores, GET reads, DELETE removes
/// the resource and everything below its path.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct ArmEmulator {
    resources: Arc<Mutex<BTreeMap<String, Value>>>,
}

#[allow(dead_code)]
impl ArmEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.resources.lock().unwrap().len()
    }

    pub fn get(&self, path: &str) -> Option<Value> {
        self.resources.lock().unwrap().get(&path.to_lowercase()).cloned()
    }

    pub fn insert(&self, path: &str, mut body: Value) {
        body["id"] = json!(path);
        body["name"] = json!(path.rsplit('/').next().unwrap_or_default());
        self.resources.lock().unwrap().insert(path.to_lowercase(), body);
    }
}

impl Respond for ArmEmulator {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path().to_string();
        let key = path.to_lowercase();

        match request.method.as_str() {
            "GET" => match self.get(&path) {
                Some(body) => ResponseTemplate::new(200).set_body_json(body),
                None => ResponseTemplate::new(404).set_body_json(json!({
                    "error": {
                        "code": "ResourceNotFound",
                        "message": format!("The Resource '{}' was not found.", path)
                    }
                })),
            },
            "PUT" => {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or_else(|_| json!({}));
                let created = self.get(&path).is_none();
                self.insert(&path, body);
                let status = if created { 201 } else { 200 };
                ResponseTemplate::new(status).set_body_json(self.get(&path).unwrap())
            }
            "DELETE" => {
                let mut resources = self.resources.lock().unwrap();
                let existed = resources.remove(&key).is_some();
                let prefix = format!("{}/", key);
                resources.retain(|k, _| !k.starts_with(&prefix));
                ResponseTemplate::new(if existed { 200 } else { 204 })
            }
            _ => ResponseTemplate::new(405),
        }
    }
}

#[allow(dead_code)]
pub fn workspace_address(label: &str) -> String {
    format!("azurerm_virtual_desktop_workspace.{}", label)
}

#[allow(dead_code)]
pub fn workspace_basic(data: &TestData) -> String {
    format!(
        r#"
resource "azurerm_virtual_desktop_workspace" "test" {{
    name "{name}"
    location "{location}"
    resource_group_name "{rg}"
}}
"#,
        name = data.name("acctws"),
        location = data.location,
        rg = data.resource_group_name(),
    )
}

#[allow(dead_code)]
pub fn workspace_requires_import(data: &TestData) -> String {
    format!(
        r#"{basic}
resource "azurerm_virtual_desktop_workspace" "import" {{
    name "{name}"
    location "{location}"
    resource_group_name "{rg}"
}}
"#,
        basic = workspace_basic(data),
        name = data.name("acctws"),
        location = data.location,
        rg = data.resource_group_name(),
    )
}

#[allow(dead_code)]
pub fn workspace_complete(data: &TestData) -> String {
    format!(
        r#"
resource "azurerm_virtual_desktop_workspace" "test" {{
    name "{name}"
    location "{location}"
    resource_group_name "{rg}"
    friendly_name "Acceptance Test!"
    description "Acceptance Test by creating acctws{n}"
    tags {{
        Purpose "Acceptance-Testing"
    }}
}}
"#,
        name = data.name("acctws"),
        location = data.location,
        rg = data.resource_group_name(),
        n = data.random_integer,
    )
}

#[allow(dead_code)]
pub fn application_group(data: &TestData, host_pool_id: &str, group_type: &str) -> String {
    format!(
        r#"
resource "azurerm_virtual_desktop_application_group" "test" {{
    name "{name}"
    location "{location}"
    resource_group_name "{rg}"
    type "{group_type}"
    host_pool_id "{host_pool_id}"
}}
"#,
        name = data.name("acctag"),
        location = data.location,
        rg = data.resource_group_name(),
    )
}
