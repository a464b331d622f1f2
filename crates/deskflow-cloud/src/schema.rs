//! Schema descriptors for resource kinds
//!
//! A [`ResourceSchema`] lists the attributes a resource kind accepts, whether
//! changing them forces a replacement, and how each value is validated.

use crate::error::{CloudError, Result};
use crate::state::{AttributeValue, DeclarativeState};
use crate::timeouts::Timeouts;
use regex::Regex;
use std::sync::Arc;

/// Attribute value type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    List,
    Map,
}

impl AttributeType {
    fn matches(self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (AttributeType::String, AttributeValue::String(_))
                | (AttributeType::List, AttributeValue::List(_))
                | (AttributeType::Map, AttributeValue::Map(_))
        )
    }

    fn name(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::List => "list",
            AttributeType::Map => "map",
        }
    }
}

/// Validation function returning a human-readable complaint on failure
pub type ValidateFn = Arc<dyn Fn(&AttributeValue) -> std::result::Result<(), String> + Send + Sync>;

/// Value normalizer applied before diffing (e.g. location casing)
pub type NormalizeFn = fn(&str) -> String;

/// One attribute of a resource schema
#[derive(Clone)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeType,
    pub required: bool,
    pub computed: bool,
    pub force_new: bool,
    pub description: &'static str,
    validators: Vec<ValidateFn>,
    normalizer: Option<NormalizeFn>,
}

impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            required: false,
            computed: false,
            force_new: false,
            description: "",
            validators: Vec::new(),
            normalizer: None,
        }
    }

    pub fn required_string(name: &'static str) -> Self {
        Self {
            required: true,
            ..Self::new(name, AttributeType::String)
        }
    }

    pub fn optional_string(name: &'static str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn optional_map(name: &'static str) -> Self {
        Self::new(name, AttributeType::Map)
    }

    pub fn computed_string(name: &'static str) -> Self {
        Self {
            computed: true,
            ..Self::new(name, AttributeType::String)
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn validate_with(mut self, validator: ValidateFn) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn normalize_with(mut self, normalizer: NormalizeFn) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Only written back by the handler, never set in configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.required
    }

    fn validate(&self, value: &AttributeValue) -> Vec<Diagnostic> {
        if !self.kind.matches(value) {
            return vec![Diagnostic::new(
                self.name,
                format!(
                    "expected a {} but got a {}",
                    self.kind.name(),
                    value.type_name()
                ),
            )];
        }

        self.validators
            .iter()
            .filter_map(|v| v(value).err())
            .map(|msg| Diagnostic::new(self.name, msg))
            .collect()
    }

    fn comparable(&self, value: Option<&AttributeValue>) -> Option<AttributeValue> {
        match (value, self.normalizer) {
            (Some(AttributeValue::String(s)), Some(normalize)) => {
                Some(AttributeValue::String(normalize(s)))
            }
            (Some(AttributeValue::String(s)), None) if s.is_empty() => None,
            (Some(AttributeValue::Map(m)), _) if m.is_empty() => None,
            (Some(AttributeValue::List(l)), _) if l.is_empty() => None,
            (value, _) => value.cloned(),
        }
    }
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub attribute: String,
    pub summary: String,
}

impl Diagnostic {
    pub fn new(attribute: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            summary: summary.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.attribute, self.summary)
    }
}

/// Schema of one resource kind
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub version: u32,
    pub timeouts: Timeouts,
    attributes: Vec<Attribute>,
}

impl ResourceSchema {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            version: 0,
            timeouts: Timeouts::default(),
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Check a configuration against the schema, collecting every problem
    pub fn validate(&self, config: &DeclarativeState) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (key, _) in config.attributes() {
            match self.attribute(key) {
                None => diagnostics.push(Diagnostic::new(
                    key.as_str(),
                    format!("unsupported argument for {}", self.type_name),
                )),
                Some(attr) if attr.is_read_only() => diagnostics.push(Diagnostic::new(
                    key.as_str(),
                    "computed attribute cannot be set in configuration",
                )),
                Some(_) => {}
            }
        }

        for attr in &self.attributes {
            match config.get(attr.name) {
                Some(value) => diagnostics.extend(attr.validate(value)),
                None if attr.required => {
                    diagnostics.push(Diagnostic::new(attr.name, "required argument is missing"))
                }
                None => {}
            }
        }

        diagnostics
    }

    /// Like [`validate`](Self::validate) but fails on the first batch of problems
    pub fn check(&self, config: &DeclarativeState) -> Result<()> {
        let diagnostics = self.validate(config);
        if diagnostics.is_empty() {
            return Ok(());
        }
        let joined = diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(CloudError::Validation(format!("{}: {}", self.type_name, joined)))
    }

    /// Configurable attributes whose value differs between `prior` and `desired`
    pub fn changed_attributes(&self, prior: &DeclarativeState, desired: &DeclarativeState) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| !a.is_read_only())
            .filter(|a| {
                let wanted = a.comparable(desired.get(a.name));
                // optional+computed values left unset in configuration keep whatever was observed
                if wanted.is_none() && a.computed {
                    return false;
                }
                wanted != a.comparable(prior.get(a.name))
            })
            .collect()
    }

    /// Changed attributes that force the resource to be recreated
    pub fn force_new_changes(&self, prior: &DeclarativeState, desired: &DeclarativeState) -> Vec<&'static str> {
        self.changed_attributes(prior, desired)
            .into_iter()
            .filter(|a| a.force_new)
            .map(|a| a.name)
            .collect()
    }

    /// Changed attributes that can be applied in place
    pub fn in_place_changes(&self, prior: &DeclarativeState, desired: &DeclarativeState) -> Vec<&'static str> {
        self.changed_attributes(prior, desired)
            .into_iter()
            .filter(|a| !a.force_new)
            .map(|a| a.name)
            .collect()
    }
}

/// Reusable validators
pub mod validation {
    use super::*;

    /// String length (in characters) within `min..=max`
    pub fn string_len_between(min: usize, max: usize) -> ValidateFn {
        Arc::new(move |value| {
            let s = value.as_str().unwrap_or_default();
            let len = s.chars().count();
            if len < min || len > max {
                return Err(format!(
                    "expected length to be in the range ({} - {}), got {}",
                    min, max, len
                ));
            }
            Ok(())
        })
    }

    /// String equal to one of `allowed`
    pub fn string_in_slice(allowed: &'static [&'static str], ignore_case: bool) -> ValidateFn {
        Arc::new(move |value| {
            let s = value.as_str().unwrap_or_default();
            let found = allowed.iter().any(|a| {
                if ignore_case {
                    a.eq_ignore_ascii_case(s)
                } else {
                    *a == s
                }
            });
            if !found {
                return Err(format!("expected to be one of {:?}, got {}", allowed, s));
            }
            Ok(())
        })
    }

    /// String matching `pattern`
    pub fn string_matches(pattern: Regex, message: &'static str) -> ValidateFn {
        Arc::new(move |value| {
            let s = value.as_str().unwrap_or_default();
            if !pattern.is_match(s) {
                return Err(format!("{} (got {:?})", message, s));
            }
            Ok(())
        })
    }

    pub fn no_empty_strings() -> ValidateFn {
        Arc::new(|value| match value.as_str() {
            Some(s) if s.trim().is_empty() => Err("must not be empty".to_string()),
            _ => Ok(()),
        })
    }

    /// Adapt a plain string check into a validator
    pub fn from_fn(check: fn(&str) -> std::result::Result<(), String>) -> ValidateFn {
        Arc::new(move |value| match value.as_str() {
            Some(s) => check(s),
            None => Ok(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;
    use std::collections::BTreeMap;

    fn lower(s: &str) -> String {
        s.to_lowercase()
    }

    fn schema() -> ResourceSchema {
        ResourceSchema::new("test_resource")
            .with_attribute(Attribute::required_string("name").force_new())
            .with_attribute(Attribute::required_string("location").force_new().normalize_with(lower))
            .with_attribute(
                Attribute::optional_string("friendly_name").validate_with(string_len_between(1, 64)),
            )
            .with_attribute(
                Attribute::required_string("type")
                    .force_new()
                    .validate_with(string_in_slice(&["Desktop", "RemoteApp"], false)),
            )
            .with_attribute(Attribute::optional_map("tags"))
            .with_attribute(Attribute::computed_string("workspace_id"))
    }

    fn config() -> DeclarativeState {
        DeclarativeState::new()
            .with_attribute("name", "acctag")
            .with_attribute("location", "westus2")
            .with_attribute("type", "Desktop")
    }

    #[test]
    fn test_valid_config() {
        assert!(schema().validate(&config()).is_empty());
        assert!(schema().check(&config()).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let cfg = DeclarativeState::new().with_attribute("name", "x");
        let diags = schema().validate(&cfg);
        assert!(diags.iter().any(|d| d.attribute == "location"));
        assert!(diags.iter().any(|d| d.attribute == "type"));
    }

    #[test]
    fn test_unknown_and_computed_rejected() {
        let cfg = config()
            .with_attribute("colour", "blue")
            .with_attribute("workspace_id", "x");
        let diags = schema().validate(&cfg);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_type_mismatch() {
        let cfg = config().with_attribute("tags", "not-a-map");
        let diags = schema().validate(&cfg);
        assert_eq!(diags, vec![Diagnostic::new("tags", "expected a map but got a string")]);
    }

    #[test]
    fn test_validators_run() {
        let cfg = config()
            .with_attribute("friendly_name", "x".repeat(65))
            .with_attribute("type", "desktop");
        let err = schema().check(&cfg).unwrap_err().to_string();
        assert!(err.contains("friendly_name"));
        assert!(err.contains("type"));
    }

    #[test]
    fn test_force_new_detection() {
        let prior = config();
        let desired = config().with_attribute("type", "RemoteApp");
        assert_eq!(schema().force_new_changes(&prior, &desired), vec!["type"]);
        assert!(schema().in_place_changes(&prior, &desired).is_empty());
    }

    #[test]
    fn test_in_place_detection() {
        let prior = config().with_attribute("friendly_name", "old");
        let desired = config().with_attribute("friendly_name", "new");
        assert_eq!(schema().in_place_changes(&prior, &desired), vec!["friendly_name"]);
        assert!(schema().force_new_changes(&prior, &desired).is_empty());
    }

    #[test]
    fn test_normalized_values_do_not_diff() {
        let prior = config().with_attribute("location", "westus2");
        let desired = config().with_attribute("location", "WestUS2");
        assert!(schema().changed_attributes(&prior, &desired).is_empty());
    }

    #[test]
    fn test_empty_map_equals_missing() {
        let prior = config().with_attribute("tags", BTreeMap::new());
        assert!(schema().changed_attributes(&prior, &config()).is_empty());
    }

    #[test]
    fn test_string_matches() {
        let v = string_matches(Regex::new("^[a-z]+$").unwrap(), "lowercase only");
        assert!(v(&AttributeValue::from("abc")).is_ok());
        assert!(v(&AttributeValue::from("ABC")).unwrap_err().contains("lowercase only"));
    }
}
