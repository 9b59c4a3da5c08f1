//! Typed template model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TemplateError, TemplateResult};

/// Allowed literal values of `DeletionPolicy` and `UpdateReplacePolicy`.
const POLICY_VALUES: &[&str] = &["", "Delete", "Retain", "Snapshot"];

/// What happens to a resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeletionPolicy {
    #[default]
    #[serde(rename = "")]
    Unset,
    Delete,
    Retain,
    Snapshot,
}

/// A single resource declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<DeletionPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_policy: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_policy: Option<Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A decoded template. `Resources` is typed; every other section is kept
/// as an untyped tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Value>,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
    #[serde(default)]
    pub mappings: IndexMap<String, Value>,
    #[serde(default)]
    pub conditions: IndexMap<String, Value>,
    #[serde(default)]
    pub resources: IndexMap<String, Resource>,
    #[serde(default)]
    pub outputs: IndexMap<String, Value>,
}

impl Template {
    /// Build a typed template from a decoded tree.
    ///
    /// Resources whose body or `Properties` is `null` are kept with empty
    /// properties; the reconciler has already recorded them as dead.
    pub fn from_tree(tree: &Value) -> TemplateResult<Self> {
        if !tree.is_object() {
            return Err(TemplateError::Structure(
                "template root must be a mapping".to_string(),
            ));
        }

        let mut tree = tree.clone();
        for section in ["Parameters", "Mappings", "Conditions", "Resources", "Outputs"] {
            if tree.get(section).is_some_and(Value::is_null) {
                if let Some(root) = tree.as_object_mut() {
                    root.remove(section);
                }
            }
        }

        if let Some(resources) = tree.get_mut("Resources") {
            let resources = resources.as_object_mut().ok_or_else(|| {
                TemplateError::Structure("Resources must be a mapping".to_string())
            })?;

            for (name, body) in resources.iter_mut() {
                if body.is_null() {
                    *body = Value::Object(Default::default());
                    continue;
                }
                let body = body.as_object_mut().ok_or_else(|| {
                    TemplateError::Structure(format!("resource {} must be a mapping", name))
                })?;
                if body.get("Properties").is_some_and(Value::is_null) {
                    body.remove("Properties");
                }
                for attribute in ["DeletionPolicy", "UpdateReplacePolicy"] {
                    check_policy(name, attribute, body.get(attribute))?;
                }
            }
        }

        Ok(serde_json::from_value(tree)?)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }
}

/// Policies must be literal; parameterized values are rejected.
fn check_policy(resource: &str, attribute: &str, value: Option<&Value>) -> TemplateResult<()> {
    match value {
        None => Ok(()),
        Some(Value::String(s)) if POLICY_VALUES.contains(&s.as_str()) => Ok(()),
        Some(other) => Err(TemplateError::InvalidPolicy {
            resource: resource.to_string(),
            attribute: attribute.to_string(),
            value: other.to_string(),
        }),
    }
}
