//! Azure region handling

use deskflow_cloud::Attribute;
use deskflow_cloud::schema::validation::no_empty_strings;

/// Canonical form of a region name: `"West US 2"` becomes `"westus2"`
pub fn normalize(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

/// Required, force-new `location` attribute compared in normalized form
pub fn schema() -> Attribute {
    Attribute::required_string("location")
        .force_new()
        .normalize_with(normalize)
        .validate_with(no_empty_strings())
        .describe("Azure region the resource lives in")
}
