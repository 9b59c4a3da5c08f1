//! Null reconciliation.
//!
//! An intrinsic function that should have produced a `key: value` pair but
//! could not be resolved while decoding leaves a stray `null` next to real
//! elements of an array. The reconciler removes those nulls, counts them,
//! and records which resources and properties lost data so the validator
//! can skip them instead of reporting them missing.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

/// Resources and properties that cannot be validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeadEntries {
    resources: BTreeSet<String>,
    properties: BTreeSet<(String, String)>,
}

impl DeadEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_resource(&mut self, resource: impl Into<String>) {
        self.resources.insert(resource.into());
    }

    pub fn mark_property(&mut self, resource: impl Into<String>, property: impl Into<String>) {
        self.properties.insert((resource.into(), property.into()));
    }

    pub fn is_dead_resource(&self, resource: &str) -> bool {
        self.resources.contains(resource)
    }

    pub fn is_dead_property(&self, resource: &str, property: &str) -> bool {
        self.properties
            .contains(&(resource.to_string(), property.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.properties.is_empty()
    }
}

/// Outcome of reconciling a decoded tree.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// Number of stray nulls removed.
    pub removed: usize,
    pub dead: DeadEntries,
    /// Informational message, present when anything was removed.
    pub notice: Option<String>,
}

/// Remove stray nulls from `tree` in place.
pub fn reconcile(tree: &mut Value) -> Reconciliation {
    let mut result = Reconciliation::default();

    if let Some(root) = tree.as_object_mut() {
        for (section, value) in root.iter_mut() {
            if section == "Resources" {
                reconcile_resources(value, &mut result);
            } else {
                result.removed += remove_stray_nulls(value);
            }
        }
    }

    if result.removed > 0 {
        let notice = notice(result.removed);
        warn!("{}", notice);
        result.notice = Some(notice);
    }
    result
}

fn reconcile_resources(resources: &mut Value, result: &mut Reconciliation) {
    let Some(resources) = resources.as_object_mut() else {
        return;
    };

    for (name, body) in resources.iter_mut() {
        if body.is_null() {
            debug!("Resource {} has no body, skipping validation", name);
            result.dead.mark_resource(name.clone());
            continue;
        }
        let Some(body) = body.as_object_mut() else {
            continue;
        };

        for (attribute, value) in body.iter_mut() {
            if attribute != "Properties" {
                result.removed += remove_stray_nulls(value);
                continue;
            }

            if value.is_null() {
                debug!("Resource {} has null Properties, skipping validation", name);
                result.dead.mark_resource(name.clone());
                continue;
            }
            let Some(properties) = value.as_object_mut() else {
                continue;
            };

            for (property, value) in properties.iter_mut() {
                if value.is_null() {
                    result.dead.mark_property(name.clone(), property.clone());
                    continue;
                }
                let removed = remove_stray_nulls(value);
                if removed > 0 {
                    debug!("Removed {} null(s) from {}.{}", removed, name, property);
                    result.removed += removed;
                    result.dead.mark_property(name.clone(), property.clone());
                }
            }
        }
    }
}

/// Drop `null` elements from every array that also holds a non-null element.
fn remove_stray_nulls(value: &mut Value) -> usize {
    match value {
        Value::Array(items) => {
            let mut removed = 0;
            if items.len() > 1 && items.iter().any(|item| !item.is_null()) {
                let before = items.len();
                items.retain(|item| !item.is_null());
                removed += before - items.len();
            }
            removed + items.iter_mut().map(remove_stray_nulls).sum::<usize>()
        }
        Value::Object(map) => map.values_mut().map(remove_stray_nulls).sum(),
        _ => 0,
    }
}

fn notice(removed: usize) -> String {
    if removed == 1 {
        "Removed 1 null value left by an unresolved intrinsic function. \
         Inspect that part of the template manually."
            .to_string()
    } else {
        format!(
            "Removed {} null values left by unresolved intrinsic functions. \
             Inspect those parts of the template manually.",
            removed
        )
    }
}
