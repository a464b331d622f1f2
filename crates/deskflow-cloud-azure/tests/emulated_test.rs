//! Acceptance harness runs against an in-memory Resource Manager

mod common;

use common::{ArmEmulator, workspace_address};
use deskflow_cloud_azure::acceptance::{AcceptanceTest, Check, TestData, TestStep, requires_import_error};
use deskflow_cloud_azure::{ArmClient, ArmId, AzureProvider, HostPoolId, PollConfig, StaticToken};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

async fn emulated() -> (MockServer, ArmEmulator, AzureProvider) {
    let server = MockServer::start().await;
    let emulator = ArmEmulator::new();
    Mock::given(any())
        .respond_with(emulator.clone())
        .mount(&server)
        .await;

    let client = ArmClient::new(server.uri(), Arc::new(StaticToken::new("token")))
        .with_poll_config(PollConfig::new(Duration::from_millis(5)));
    let provider = AzureProvider::with_client(Arc::new(client), SUBSCRIPTION);
    (server, emulator, provider)
}

#[tokio::test]
async fn test_workspace_basic() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(123, "westus2");
    let address = workspace_address("test");

    AcceptanceTest::new(&provider, data.clone())
        .run(vec![
            TestStep::new(common::workspace_basic(&data))
                .check(Check::exists(&address))
                .check(Check::attribute(&address, "tags.%", "0"))
                .check(Check::attribute(&address, "name", "acctws123"))
                .check(Check::attribute(&address, "resource_group_name", "acctestRG-123"))
                .check(Check::attribute_set(&address, "id")),
        ])
        .await
        .unwrap();

    assert_eq!(emulator.len(), 0);
}

#[tokio::test]
async fn test_workspace_requires_import() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(123, "westus2");

    AcceptanceTest::new(&provider, data.clone())
        .run(vec![
            TestStep::new(common::workspace_basic(&data))
                .check(Check::exists(workspace_address("test"))),
            TestStep::new(common::workspace_requires_import(&data))
                .expect_error(requires_import_error()),
        ])
        .await
        .unwrap();

    assert_eq!(emulator.len(), 0);
}

#[tokio::test]
async fn test_workspace_update_in_place() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(456, "West Europe");
    let address = workspace_address("test");

    AcceptanceTest::new(&provider, data.clone())
        .run(vec![
            TestStep::new(common::workspace_basic(&data))
                .check(Check::attribute(&address, "location", "westeurope")),
            TestStep::new(common::workspace_complete(&data))
                .check(Check::attribute(&address, "friendly_name", "Acceptance Test!"))
                .check(Check::attribute(&address, "tags.%", "1"))
                .check(Check::attribute(&address, "tags.Purpose", "Acceptance-Testing")),
        ])
        .await
        .unwrap();

    assert_eq!(emulator.len(), 0);
}

#[tokio::test]
async fn test_application_group_type_change_replaces() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(789, "eastus");
    let pool = HostPoolId::new(SUBSCRIPTION, data.resource_group_name(), "acctesthp789");
    let lower = pool.to_string().replace("resourceGroups", "resourcegroups");
    let address = "azurerm_virtual_desktop_application_group.test";

    AcceptanceTest::new(&provider, data.clone())
        .run(vec![
            TestStep::new(common::application_group(&data, &lower, "Desktop"))
                .check(Check::exists(address))
                .check(Check::attribute(address, "type", "Desktop"))
                .check(Check::attribute(address, "host_pool_id", pool.to_string())),
            TestStep::new(common::application_group(&data, &lower, "RemoteApp"))
                .check(Check::exists(address))
                .check(Check::attribute(address, "type", "RemoteApp"))
                .check(Check::attribute(address, "host_pool_id", pool.to_string())),
        ])
        .await
        .unwrap();

    assert_eq!(emulator.len(), 0);
}

#[tokio::test]
async fn test_failed_expectation_still_tears_down() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(321, "westus2");

    let err = AcceptanceTest::new(&provider, data.clone())
        .run(vec![
            TestStep::new(common::workspace_basic(&data)).expect_error(requires_import_error()),
        ])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("expected an error matching"));
    assert_eq!(emulator.len(), 0);
}

#[tokio::test]
async fn test_pre_existing_workspace_is_reported() {
    let (_server, emulator, provider) = emulated().await;
    let data = TestData::with_values(654, "westus2");
    let existing = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DesktopVirtualization/workspaces/{}",
        SUBSCRIPTION,
        data.resource_group_name(),
        data.name("acctws")
    );
    emulator.insert(&existing, serde_json::json!({"location": "westus2"}));

    let err = AcceptanceTest::new(&provider, data.clone())
        .run(vec![TestStep::new(common::workspace_basic(&data))])
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("already exists"));
    assert!(message.contains(&existing));
}
