//! Per-resource-type custom validators.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use stackcheck_template::Resource;

use crate::error::ValidatorResult;
use crate::report::ResourceValidation;
use crate::rules;

/// A check for one resource type that runs after the specification-driven
/// pass, independently of it.
#[cfg_attr(test, mockall::automock)]
pub trait CustomResourceValidator: Send + Sync {
    /// Resource type this validator applies to, e.g. `AWS::EC2::VPC`.
    fn resource_type(&self) -> &str;

    /// Record diagnostics for the resource named `name`.
    fn validate(&self, name: &str, resource: &Resource, validation: &mut ResourceValidation);
}

/// Custom validators keyed by resource type.
#[derive(Default)]
pub struct CustomValidatorRegistry {
    validators: HashMap<String, Arc<dyn CustomResourceValidator>>,
}

impl CustomValidatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// A registry holding the built-in rules.
    pub fn with_builtin_rules() -> ValidatorResult<Self> {
        let mut registry = Self::new();
        for validator in rules::builtin()? {
            registry.register(validator);
        }
        Ok(registry)
    }

    /// Register a validator under its `resource_type()`, replacing any
    /// validator already registered for that type.
    pub fn register(&mut self, validator: Arc<dyn CustomResourceValidator>) {
        let resource_type = validator.resource_type().to_string();
        debug!("Registering custom validator for {}", resource_type);
        self.validators.insert(resource_type, validator);
    }

    /// Validator that runs for `resource_type`.
    pub fn get(&self, resource_type: &str) -> Option<&dyn CustomResourceValidator> {
        self.validators.get(resource_type).map(|v| &**v)
    }

    /// Whether any validator runs for `resource_type`.
    pub fn contains(&self, resource_type: &str) -> bool {
        self.validators.contains_key(resource_type)
    }

    /// Number of resource types with a validator.
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no validator is registered.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run the validator registered for the resource's type, if any.
    pub fn validate(&self, name: &str, resource: &Resource, validation: &mut ResourceValidation) {
        if let Some(validator) = self.validators.get(&resource.resource_type) {
            debug!("Running custom validator for {} ({})", name, resource.resource_type);
            validator.validate(name, resource, validation);
        }
    }
}

impl std::fmt::Debug for CustomValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomValidatorRegistry")
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}
