//! Specification-driven structural validation.
//!
//! Every live resource is checked against its resource type: required
//! properties must be present, and present properties must have the shape
//! the specification declares. Structured properties and structured list
//! items are checked recursively against their property types. Values that
//! are intrinsic function calls are computed at deploy time and are not
//! descended into, but their arguments are checked for shape and for
//! references to undeclared mappings, parameters and resources.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use stackcheck_spec::{InconsistencyConfiguration, Property, PropertyShape, PropertyType, Specification};
use stackcheck_template::{DeadEntries, IntrinsicFunction, Resource, Template};

use crate::report::ResourceValidation;

/// Names a template declares, for cross-reference checks.
#[derive(Debug, Clone, Default)]
pub struct References<'t> {
    parameters: HashSet<&'t str>,
    /// Resource name to resource type.
    resources: HashMap<&'t str, &'t str>,
    mappings: HashSet<&'t str>,
}

impl<'t> References<'t> {
    pub fn of(template: &'t Template) -> Self {
        Self {
            parameters: template.parameters.keys().map(String::as_str).collect(),
            resources: template
                .resources
                .iter()
                .map(|(name, resource)| (name.as_str(), resource.resource_type.as_str()))
                .collect(),
            mappings: template.mappings.keys().map(String::as_str).collect(),
        }
    }

    /// Whether `name` can be the target of a `Ref`.
    pub fn is_referable(&self, name: &str) -> bool {
        name.starts_with("AWS::") || self.parameters.contains(name) || self.resources.contains_key(name)
    }

    /// Type of the resource declared as `name`.
    pub fn resource_type(&self, name: &str) -> Option<&'t str> {
        self.resources.get(name).copied()
    }

    pub fn has_mapping(&self, name: &str) -> bool {
        self.mappings.contains(name)
    }
}

/// Where a property sits, for messages and inconsistency lookups.
struct Scope<'s> {
    resource_type: &'s str,
    /// `"ResourceType"` or `"ResourceType.PropertyType"`.
    key: String,
    /// The property holding this one; `None` at resource level.
    parent: Option<&'s str>,
}

/// Checks resources against a [`Specification`].
#[derive(Debug, Clone, Copy)]
pub struct StructuralValidator<'a> {
    spec: &'a Specification,
    inconsistencies: &'a InconsistencyConfiguration,
}

impl<'a> StructuralValidator<'a> {
    pub fn new(spec: &'a Specification, inconsistencies: &'a InconsistencyConfiguration) -> Self {
        Self {
            spec,
            inconsistencies,
        }
    }

    /// Validate every live resource of `template`, in declaration order.
    ///
    /// Dead resources get no entry.
    pub fn validate_template(&self, template: &Template, dead: &DeadEntries) -> Vec<ResourceValidation> {
        let references = References::of(template);
        template
            .resources
            .iter()
            .filter(|(name, _)| {
                let is_dead = dead.is_dead_resource(name);
                if is_dead {
                    debug!("Skipping dead resource {}", name);
                }
                !is_dead
            })
            .map(|(name, resource)| self.validate_resource(name, resource, dead, &references))
            .collect()
    }

    /// Validate one resource.
    pub fn validate_resource(
        &self,
        name: &str,
        resource: &Resource,
        dead: &DeadEntries,
        references: &References<'_>,
    ) -> ResourceValidation {
        let mut validation = ResourceValidation::new(name, &resource.resource_type);

        let Some(resource_type) = self.spec.resource_type(&resource.resource_type) else {
            warn!(
                "Resource {} has type {:?}, which the specification does not define",
                name, resource.resource_type
            );
            validation.add_error("Type needs to be specified");
            return validation;
        };
        debug!("Validating resource {} ({})", name, resource.resource_type);

        let scope = Scope {
            resource_type: &resource.resource_type,
            key: resource.resource_type.clone(),
            parent: None,
        };
        for (property_name, property) in &resource_type.properties {
            if dead.is_dead_property(name, property_name) {
                debug!("Skipping dead property {}.{}", name, property_name);
                continue;
            }
            self.check_property(
                &scope,
                property_name,
                property,
                resource.properties.get(property_name),
                &mut validation,
            );
        }

        for (property_name, value) in &resource.properties {
            if !dead.is_dead_property(name, property_name) {
                self.check_references(value, references, &mut validation);
            }
        }

        validation
    }

    fn check_property(
        &self,
        scope: &Scope<'_>,
        name: &str,
        property: &Property,
        value: Option<&Value>,
        validation: &mut ResourceValidation,
    ) {
        if self.inconsistencies.is_inconsistent(&scope.key, name, "Required") {
            validation.add_warning(format!(
                "Property {} of {} is {} in the specification, but the documentation disagrees",
                name,
                scope.key,
                if property.required { "required" } else { "optional" }
            ));
        }

        match value {
            None if property.required => match scope.parent {
                None => validation.add_error(format!("Property {} is required", name)),
                Some(parent) => validation.add_error(format!("{} is required in {}", name, parent)),
            },
            None | Some(Value::Null) => {}
            Some(value) => self.check_shape(scope.resource_type, name, property, value, validation),
        }
    }

    fn check_shape(
        &self,
        resource_type: &str,
        name: &str,
        property: &Property,
        value: &Value,
        validation: &mut ResourceValidation,
    ) {
        if IntrinsicFunction::detect(value).is_some() {
            return;
        }

        match &property.shape {
            PropertyShape::Primitive => {}
            PropertyShape::Map => {
                if !value.is_object() {
                    validation.add_error(format!("{} must be a Map", name));
                }
            }
            PropertyShape::List { item_type: None } => {
                let is_scalar_list = value.as_array().is_some_and(|items| {
                    !items.is_empty() && items.iter().all(is_scalar_or_intrinsic)
                });
                if !is_scalar_list {
                    validation.add_error(format!("{} must be a List", name));
                }
            }
            PropertyShape::List {
                item_type: Some(item_type),
            } => {
                let Some(items) = value.as_array() else {
                    validation.add_error(format!("{} must be a List", name));
                    return;
                };
                let Some(property_type) = self.spec.property_type(resource_type, item_type) else {
                    debug!("No property type {} for {}", item_type, resource_type);
                    return;
                };
                for item in items
                    .iter()
                    .filter(|item| IntrinsicFunction::detect(item).is_none())
                    .filter_map(Value::as_object)
                {
                    self.check_nested(resource_type, item_type, property_type, name, item, validation);
                }
            }
            PropertyShape::SubProperty { type_name } => {
                let Some(property_type) = self.spec.property_type(resource_type, type_name) else {
                    debug!("No property type {} for {}", type_name, resource_type);
                    return;
                };
                if let Some(map) = value.as_object() {
                    self.check_nested(resource_type, type_name, property_type, name, map, validation);
                }
            }
        }
    }

    fn check_nested(
        &self,
        resource_type: &str,
        type_name: &str,
        property_type: &PropertyType,
        parent: &str,
        value: &Map<String, Value>,
        validation: &mut ResourceValidation,
    ) {
        let scope = Scope {
            resource_type,
            key: format!("{}.{}", resource_type, type_name),
            parent: Some(parent),
        };
        for (name, property) in &property_type.properties {
            self.check_property(&scope, name, property, value.get(name), validation);
        }
    }

    /// Check intrinsic function calls anywhere inside `value`.
    fn check_references(&self, value: &Value, references: &References<'_>, validation: &mut ResourceValidation) {
        if let Some((function, args)) = IntrinsicFunction::detect(value) {
            if let Err(message) = function.check_arguments(args) {
                validation.add_error(message);
            }
            match function {
                IntrinsicFunction::FindInMap => {
                    if let Some(mapping) = args.get(0).and_then(Value::as_str) {
                        if !references.has_mapping(mapping) {
                            validation.add_error(format!(
                                "Mapping {} referenced by Fn::FindInMap does not exist",
                                mapping
                            ));
                        }
                    }
                }
                IntrinsicFunction::Ref => {
                    if let Some(target) = args.as_str() {
                        if !references.is_referable(target) {
                            validation.add_error(format!(
                                "Ref {} does not name a parameter or resource",
                                target
                            ));
                        }
                    }
                }
                IntrinsicFunction::GetAtt => self.check_get_att(args, references, validation),
                _ => {}
            }
            self.check_references(args, references, validation);
            return;
        }

        match value {
            Value::Array(items) => {
                for item in items {
                    self.check_references(item, references, validation);
                }
            }
            Value::Object(map) => {
                for item in map.values() {
                    self.check_references(item, references, validation);
                }
            }
            _ => {}
        }
    }

    fn check_get_att(&self, args: &Value, references: &References<'_>, validation: &mut ResourceValidation) {
        let (resource, attribute) = match args {
            Value::Array(items) => (
                items.first().and_then(Value::as_str),
                items.get(1).and_then(Value::as_str),
            ),
            Value::String(text) => match text.split_once('.') {
                Some((resource, attribute)) => (Some(resource), Some(attribute)),
                None => (Some(text.as_str()), None),
            },
            _ => (None, None),
        };
        let Some(resource) = resource else {
            return;
        };

        let Some(resource_type) = references.resource_type(resource) else {
            validation.add_error(format!("Fn::GetAtt target {} does not name a resource", resource));
            return;
        };
        // Nested stack outputs are not declared in the specification.
        let Some(attribute) = attribute.filter(|a| !a.starts_with("Outputs.")) else {
            return;
        };
        if self.spec.resource_type(resource_type).is_some()
            && !self.spec.has_attribute(resource_type, attribute)
        {
            validation.add_error(format!(
                "{} has no attribute {} for Fn::GetAtt",
                resource, attribute
            ));
        }
    }
}

fn is_scalar_or_intrinsic(value: &Value) -> bool {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => true,
        other => IntrinsicFunction::detect(other).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> Specification {
        Specification::new("1.0.0")
            .with_resource_type(
                "AWS::EC2::SecurityGroup",
                stackcheck_spec::ResourceType::default()
                    .with_attribute("GroupId", stackcheck_spec::Attribute::default())
                    .with_property("GroupDescription", Property::required("String"))
                    .with_property(
                        "SecurityGroupIngress",
                        Property::default().with_shape(PropertyShape::List {
                            item_type: Some("Ingress".to_string()),
                        }),
                    )
                    .with_property(
                        "SecurityGroupNames",
                        Property::default().with_shape(PropertyShape::List { item_type: None }),
                    )
                    .with_property(
                        "Options",
                        Property::default().with_shape(PropertyShape::Map),
                    )
                    .with_property(
                        "Logging",
                        Property::default().with_shape(PropertyShape::SubProperty {
                            type_name: "Logging".to_string(),
                        }),
                    ),
            )
            .with_property_type(
                "AWS::EC2::SecurityGroup.Ingress",
                PropertyType::default()
                    .with_property("IpProtocol", Property::required("String"))
                    .with_property("CidrIp", Property::optional("String")),
            )
            .with_property_type(
                "AWS::EC2::SecurityGroup.Logging",
                PropertyType::default()
                    .with_property("Bucket", Property::required("String"))
                    .with_property(
                        "Destination",
                        Property::default().with_shape(PropertyShape::SubProperty {
                            type_name: "Destination".to_string(),
                        }),
                    ),
            )
            .with_property_type(
                "Destination",
                PropertyType::default().with_property("Arn", Property::required("String")),
            )
    }

    fn validate(properties: Value) -> ResourceValidation {
        validate_with(properties, &InconsistencyConfiguration::default(), &DeadEntries::default())
    }

    fn validate_with(
        properties: Value,
        inconsistencies: &InconsistencyConfiguration,
        dead: &DeadEntries,
    ) -> ResourceValidation {
        let spec = spec();
        let template = Template::from_tree(&json!({
            "Parameters": {"Env": {"Type": "String"}},
            "Mappings": {"Regions": {"eu-west-1": {"Cidr": "10.0.0.0/8"}}},
            "Resources": {"Sg": {"Type": "AWS::EC2::SecurityGroup", "Properties": properties}}
        }))
        .unwrap();
        let validator = StructuralValidator::new(&spec, inconsistencies);
        validator.validate_resource(
            "Sg",
            &template.resources["Sg"],
            dead,
            &References::of(&template),
        )
    }

    fn errors(validation: &ResourceValidation) -> Vec<&str> {
        validation.errors().collect()
    }

    #[test]
    fn test_valid_resource() {
        let validation = validate(json!({"GroupDescription": "web"}));
        assert!(validation.is_valid());
        assert!(validation.diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_type_is_single_error() {
        let spec = spec();
        let inconsistencies = InconsistencyConfiguration::default();
        let validator = StructuralValidator::new(&spec, &inconsistencies);
        let template = Template::default();
        let resource = Resource::new("InvalidType").with_property("Anything", json!({"Ref": "Nope"}));
        let validation = validator.validate_resource(
            "Bad",
            &resource,
            &DeadEntries::default(),
            &References::of(&template),
        );
        assert_eq!(errors(&validation), ["Type needs to be specified"]);
    }

    #[test]
    fn test_missing_required_property() {
        let validation = validate(json!({}));
        assert_eq!(errors(&validation), ["Property GroupDescription is required"]);
    }

    #[test]
    fn test_dead_property_is_not_reported_missing() {
        let mut dead = DeadEntries::new();
        dead.mark_property("Sg", "GroupDescription");
        let validation = validate_with(json!({}), &InconsistencyConfiguration::default(), &dead);
        assert!(validation.is_valid());
    }

    #[test]
    fn test_list_without_item_type() {
        let ok = validate(json!({"GroupDescription": "web", "SecurityGroupNames": ["a", {"Ref": "Env"}]}));
        assert!(ok.is_valid());

        for bad in [json!([]), json!("a"), json!([{"a": 1}])] {
            let validation = validate(json!({"GroupDescription": "web", "SecurityGroupNames": bad}));
            assert_eq!(errors(&validation), ["SecurityGroupNames must be a List"]);
        }
    }

    #[test]
    fn test_structured_list_items() {
        let empty = validate(json!({"GroupDescription": "web", "SecurityGroupIngress": []}));
        assert!(empty.is_valid());

        let validation = validate(json!({
            "GroupDescription": "web",
            "SecurityGroupIngress": [
                {"IpProtocol": "tcp"},
                {"CidrIp": "0.0.0.0/0"},
                "not a map",
                {"CidrIp": "10.0.0.0/8"}
            ]
        }));
        assert_eq!(
            errors(&validation),
            [
                "IpProtocol is required in SecurityGroupIngress",
                "IpProtocol is required in SecurityGroupIngress"
            ]
        );
    }

    #[test]
    fn test_map_shape() {
        let validation = validate(json!({"GroupDescription": "web", "Options": ["a"]}));
        assert_eq!(errors(&validation), ["Options must be a Map"]);
        assert!(validate(json!({"GroupDescription": "web", "Options": {"a": 1}})).is_valid());
    }

    #[test]
    fn test_nested_subproperties_recurse() {
        let validation = validate(json!({
            "GroupDescription": "web",
            "Logging": {"Destination": {}}
        }));
        assert_eq!(
            errors(&validation),
            ["Bucket is required in Logging", "Arn is required in Destination"]
        );
    }

    #[test]
    fn test_intrinsic_values_are_not_shape_checked() {
        let validation = validate(json!({
            "GroupDescription": {"Fn::Sub": "${Env}-web"},
            "Options": {"Fn::If": ["IsProd", {"a": 1}, {"Ref": "AWS::NoValue"}]},
            "SecurityGroupNames": {"Fn::Split": [",", "a,b"]},
            "Logging": {"Ref": "Env"}
        }));
        assert!(validation.is_valid(), "{:?}", validation.diagnostics);
    }

    #[test]
    fn test_reference_checks() {
        let validation = validate(json!({
            "GroupDescription": {"Fn::FindInMap": ["Missing", "eu-west-1", "Cidr"]},
            "Options": {"Key": {"Ref": "Undeclared"}, "Other": {"Fn::FindInMap": ["Regions", {"Ref": "AWS::Region"}, "Cidr"]}}
        }));
        assert_eq!(
            errors(&validation),
            [
                "Mapping Missing referenced by Fn::FindInMap does not exist",
                "Ref Undeclared does not name a parameter or resource"
            ]
        );
    }

    #[test]
    fn test_get_att_targets() {
        let ok = validate(json!({
            "GroupDescription": {"Fn::GetAtt": ["Sg", "GroupId"]},
            "Options": {"Id": {"Fn::GetAtt": "Sg.GroupId"}}
        }));
        assert!(ok.is_valid(), "{:?}", ok.diagnostics);

        let validation = validate(json!({
            "GroupDescription": {"Fn::GetAtt": ["Sg", "VpcId"]},
            "Options": {"Id": {"Fn::GetAtt": "Other.GroupId"}}
        }));
        assert_eq!(
            errors(&validation),
            [
                "Sg has no attribute VpcId for Fn::GetAtt",
                "Fn::GetAtt target Other does not name a resource"
            ]
        );
    }

    #[test]
    fn test_malformed_arguments() {
        let validation = validate(json!({
            "GroupDescription": {"Fn::Join": [","]}
        }));
        assert_eq!(errors(&validation), ["Fn::Join expects 2 arguments, got 1"]);
    }

    #[test]
    fn test_inconsistency_warning() {
        let inconsistencies = InconsistencyConfiguration::new()
            .with_entry("AWS::EC2::SecurityGroup", "GroupDescription", "Required")
            .with_entry("AWS::EC2::SecurityGroup.Ingress", "IpProtocol", "Required");
        let validation = validate_with(
            json!({"GroupDescription": "web", "SecurityGroupIngress": [{"IpProtocol": "tcp"}]}),
            &inconsistencies,
            &DeadEntries::default(),
        );

        assert!(validation.is_valid());
        let warnings: Vec<_> = validation.warnings().collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Property GroupDescription of AWS::EC2::SecurityGroup is required"));
        assert!(warnings[1].contains("AWS::EC2::SecurityGroup.Ingress"));
    }

    #[test]
    fn test_validate_template_skips_dead_resources() {
        let spec = spec();
        let inconsistencies = InconsistencyConfiguration::default();
        let template = Template::from_tree(&json!({
            "Resources": {
                "Dead": null,
                "Live": {"Type": "AWS::EC2::SecurityGroup", "Properties": {"GroupDescription": "x"}}
            }
        }))
        .unwrap();
        let mut dead = DeadEntries::new();
        dead.mark_resource("Dead");

        let results = StructuralValidator::new(&spec, &inconsistencies).validate_template(&template, &dead);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource, "Live");
    }
}
