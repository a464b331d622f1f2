//! KDL manifest of desired resources
//!
//! ```kdl
//! resource "azurerm_virtual_desktop_workspace" "main" {
//!     name "acctws1"
//!     resource_group_name "acctestRG-1"
//!     location "westus2"
//!     tags {
//!         env "dev"
//!     }
//!     timeouts {
//!         create "30m"
//!     }
//! }
//! ```
//!
//! A child with one argument becomes a string, several arguments a list and a
//! child block a map. `timeouts` is reserved for per-operation deadlines.

use crate::error::{CloudError, Result};
use crate::provider::{ResourceConfig, ResourceSet};
use crate::state::{AttributeValue, DeclarativeState};
use crate::timeouts::{Operation, Timeouts};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use std::collections::BTreeMap;
use std::path::Path;

/// Parse a manifest file
pub fn parse_manifest_file<P: AsRef<Path>>(path: P, defaults: Timeouts) -> Result<ResourceSet> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_manifest_with(&content, defaults)
}

/// Parse manifest text with the built-in deadlines
pub fn parse_manifest(content: &str) -> Result<ResourceSet> {
    parse_manifest_with(content, Timeouts::default())
}

/// Parse manifest text; `defaults` applies wherever a resource has no `timeouts` entry
pub fn parse_manifest_with(content: &str, defaults: Timeouts) -> Result<ResourceSet> {
    let doc: KdlDocument = content.parse()?;
    let mut set = ResourceSet::new();

    for node in doc.nodes() {
        match node.name().value() {
            "resource" => set.add(parse_resource(node, defaults)?)?,
            other => {
                return Err(CloudError::Manifest(format!(
                    "unexpected top-level node `{}`",
                    other
                )));
            }
        }
    }

    tracing::debug!("Parsed manifest with {} resources", set.len());
    Ok(set)
}

fn parse_resource(node: &KdlNode, defaults: Timeouts) -> Result<ResourceConfig> {
    let args = arguments(node);
    let (resource_type, name) = match args.as_slice() {
        [KdlValue::String(t), KdlValue::String(n)] => (t.clone(), n.clone()),
        _ => {
            return Err(CloudError::Manifest(
                "resource needs a type and a name: resource \"<type>\" \"<name>\" { ... }"
                    .to_string(),
            ));
        }
    };

    let address = format!("{}.{}", resource_type, name);
    let mut config = DeclarativeState::new();
    let mut timeouts = defaults;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            if key == "timeouts" {
                timeouts = parse_timeouts(child, defaults, &address)?;
                continue;
            }
            if config.get(key).is_some() {
                return Err(CloudError::Manifest(format!(
                    "{}: `{}` is set more than once",
                    address, key
                )));
            }
            config.set(key, parse_attribute(child, &address)?);
        }
    }

    Ok(ResourceConfig::new(resource_type, name, config).with_timeouts(timeouts))
}

fn parse_attribute(node: &KdlNode, address: &str) -> Result<AttributeValue> {
    let key = node.name().value();

    if let Some(children) = node.children() {
        let mut map = BTreeMap::new();
        for entry in children.nodes() {
            let value = single_value(entry).ok_or_else(|| {
                CloudError::Manifest(format!(
                    "{}: `{}.{}` needs exactly one value",
                    address,
                    key,
                    entry.name().value()
                ))
            })?;
            map.insert(entry.name().value().to_string(), value);
        }
        return Ok(AttributeValue::Map(map));
    }

    let values: Vec<String> = arguments(node).into_iter().filter_map(scalar).collect();
    match values.len() {
        0 => Err(CloudError::Manifest(format!(
            "{}: `{}` has no value",
            address, key
        ))),
        1 => Ok(AttributeValue::String(values.into_iter().next().unwrap_or_default())),
        _ => Ok(AttributeValue::List(values)),
    }
}

fn parse_timeouts(node: &KdlNode, defaults: Timeouts, address: &str) -> Result<Timeouts> {
    let mut timeouts = defaults;
    let Some(children) = node.children() else {
        return Ok(timeouts);
    };

    for child in children.nodes() {
        let operation: Operation = child.name().value().parse().map_err(|_| {
            CloudError::Manifest(format!(
                "{}: unknown timeout `{}` (expected create, read, update or delete)",
                address,
                child.name().value()
            ))
        })?;
        let raw = single_value(child).ok_or_else(|| {
            CloudError::Manifest(format!("{}: timeout `{}` has no value", address, operation))
        })?;
        let duration = humantime::parse_duration(&raw).map_err(|e| {
            CloudError::Manifest(format!(
                "{}: invalid {} timeout {:?}: {}",
                address, operation, raw, e
            ))
        })?;
        timeouts = timeouts.with(operation, duration);
    }

    Ok(timeouts)
}

fn arguments(node: &KdlNode) -> Vec<&KdlValue> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(KdlEntry::value)
        .collect()
}

fn single_value(node: &KdlNode) -> Option<String> {
    match arguments(node).as_slice() {
        [value] => scalar(value),
        _ => None,
    }
}

fn scalar(value: &KdlValue) -> Option<String> {
    match value {
        KdlValue::String(s) => Some(s.clone()),
        KdlValue::Integer(i) => Some(i.to_string()),
        KdlValue::Float(f) => Some(f.to_string()),
        KdlValue::Bool(b) => Some(b.to_string()),
        KdlValue::Null => None,
    }
}
