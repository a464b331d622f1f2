//! Resource tags

use deskflow_cloud::schema::ValidateFn;
use deskflow_cloud::{Attribute, AttributeValue, DeclarativeState};
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_TAGS: usize = 50;
const MAX_KEY_LEN: usize = 512;
const MAX_VALUE_LEN: usize = 256;

pub fn schema() -> Attribute {
    Attribute::optional_map("tags")
        .validate_with(validate())
        .describe("Tags assigned to the resource")
}

fn validate() -> ValidateFn {
    Arc::new(|value| {
        let Some(tags) = value.as_map() else {
            return Ok(());
        };
        if tags.len() > MAX_TAGS {
            return Err(format!(
                "a maximum of {} tags can be applied to each ARM resource",
                MAX_TAGS
            ));
        }
        for (key, value) in tags {
            let key_len = key.chars().count();
            if key_len == 0 || key_len > MAX_KEY_LEN {
                return Err(format!(
                    "the maximum length for a tag key is {} characters: {:?}",
                    MAX_KEY_LEN, key
                ));
            }
            if value.chars().count() > MAX_VALUE_LEN {
                return Err(format!(
                    "the maximum length for a tag value is {} characters: {:?} = {:?}",
                    MAX_VALUE_LEN, key, value
                ));
            }
        }
        Ok(())
    })
}

/// Tags from the configuration, as sent to the API
pub fn expand(state: &DeclarativeState) -> BTreeMap<String, String> {
    state.get_map("tags").cloned().unwrap_or_default()
}

/// Record the tags the API returned, writing an empty map when there are none
pub fn flatten_and_set(state: &mut DeclarativeState, tags: Option<&BTreeMap<String, String>>) {
    state.set(
        "tags",
        AttributeValue::Map(tags.cloned().unwrap_or_default()),
    );
}
