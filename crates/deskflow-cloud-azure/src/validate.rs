//! Validation rules shared by the Virtual Desktop resources

use deskflow_cloud::Attribute;
use deskflow_cloud::schema::validation::{from_fn, string_matches};
use regex::Regex;
use std::sync::LazyLock;

static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](-?[a-zA-Z0-9])*$").expect("valid name pattern")
});

static RESOURCE_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-\w._()]+$").expect("valid resource group pattern"));

/// Required, force-new `name` attribute: alphanumerics separated by single hyphens
pub fn name_schema() -> Attribute {
    Attribute::required_string("name")
        .force_new()
        .validate_with(string_matches(
            NAME.clone(),
            "name may only contain alphanumeric characters and single hyphens, and must start and end with an alphanumeric",
        ))
        .describe("Name of the resource")
}

/// Required, force-new `resource_group_name` attribute
pub fn resource_group_schema() -> Attribute {
    Attribute::required_string("resource_group_name")
        .force_new()
        .validate_with(from_fn(resource_group_name))
        .describe("Resource group the resource is created in")
}

pub fn resource_group_name(value: &str) -> Result<(), String> {
    let len = value.chars().count();
    if len == 0 || len > 90 {
        return Err(format!(
            "resource group name must be 1 - 90 characters long, got {}",
            len
        ));
    }
    if value.ends_with('.') {
        return Err("resource group name cannot end with a period".to_string());
    }
    if !RESOURCE_GROUP.is_match(value) {
        return Err(format!(
            "resource group name may only contain alphanumerics, underscores, parentheses, hyphens and periods: {:?}",
            value
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        for ok in ["acctws1", "a", "ws-01", "A1-b2-C3"] {
            assert!(NAME.is_match(ok), "{ok}");
        }
        for bad in ["", "-ws", "ws-", "ws--1", "ws_1", "ws.1"] {
            assert!(!NAME.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn test_resource_group_names() {
        assert!(resource_group_name("acctestRG-123").is_ok());
        assert!(resource_group_name("rg_(prod).eu").is_ok());
        assert!(resource_group_name("").is_err());
        assert!(resource_group_name("rg.").is_err());
        assert!(resource_group_name("rg/1").is_err());
        assert!(resource_group_name(&"r".repeat(91)).is_err());
        assert!(resource_group_name(&"r".repeat(90)).is_ok());
    }
}
