//! Data models for resource specifications.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The structural shape of a property, decided once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropertyShape {
    /// A scalar; only presence is checked structurally.
    #[default]
    Primitive,
    /// A homogeneous list. `item_type` names a structured item type.
    List { item_type: Option<String> },
    /// A free-form map.
    Map,
    /// A structured value described by a property type.
    SubProperty { type_name: String },
}

impl PropertyShape {
    /// Derive the shape from the specification's `Type` and `ItemType` fields.
    pub fn from_type(type_name: &str, item_type: Option<&str>) -> Self {
        match type_name {
            "" => PropertyShape::Primitive,
            "List" => PropertyShape::List {
                item_type: item_type
                    .filter(|item| !item.is_empty())
                    .map(str::to_string),
            },
            "Map" => PropertyShape::Map,
            other => PropertyShape::SubProperty {
                type_name: other.to_string(),
            },
        }
    }

    /// The specification `Type` string for this shape.
    pub fn type_name(&self) -> &str {
        match self {
            PropertyShape::Primitive => "",
            PropertyShape::List { .. } => "List",
            PropertyShape::Map => "Map",
            PropertyShape::SubProperty { type_name } => type_name,
        }
    }

    pub fn is_subproperty(&self) -> bool {
        matches!(self, PropertyShape::SubProperty { .. })
    }
}

/// Wire form of a property definition, as written in specification files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "Type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicates_allowed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
}

/// A property definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawProperty", into = "RawProperty")]
pub struct Property {
    pub documentation: Option<String>,
    pub required: bool,
    pub shape: PropertyShape,
    pub primitive_type: Option<String>,
    pub primitive_item_type: Option<String>,
    pub duplicates_allowed: Option<bool>,
    pub update_type: Option<String>,
}

impl Property {
    /// A required primitive property.
    pub fn required(primitive_type: impl Into<String>) -> Self {
        Self {
            required: true,
            primitive_type: Some(primitive_type.into()),
            ..Default::default()
        }
    }

    /// An optional primitive property.
    pub fn optional(primitive_type: impl Into<String>) -> Self {
        Self {
            primitive_type: Some(primitive_type.into()),
            ..Default::default()
        }
    }

    pub fn with_shape(mut self, shape: PropertyShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

impl From<RawProperty> for Property {
    fn from(raw: RawProperty) -> Self {
        Self {
            shape: PropertyShape::from_type(&raw.type_name, raw.item_type.as_deref()),
            documentation: raw.documentation,
            required: raw.required,
            primitive_type: raw.primitive_type,
            primitive_item_type: raw.primitive_item_type,
            duplicates_allowed: raw.duplicates_allowed,
            update_type: raw.update_type,
        }
    }
}

impl From<Property> for RawProperty {
    fn from(property: Property) -> Self {
        let item_type = match &property.shape {
            PropertyShape::List { item_type } => item_type.clone(),
            _ => None,
        };
        Self {
            type_name: property.shape.type_name().to_string(),
            item_type,
            documentation: property.documentation,
            required: property.required,
            primitive_type: property.primitive_type,
            primitive_item_type: property.primitive_item_type,
            duplicates_allowed: property.duplicates_allowed,
            update_type: property.update_type,
        }
    }
}

/// A return value of `Fn::GetAtt` on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_type: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_item_type: Option<String>,
}

/// A structured property type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
}

impl PropertyType {
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }
}

/// A resource type definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,
    #[serde(default)]
    pub properties: IndexMap<String, Property>,
}

impl ResourceType {
    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }
}

/// A versioned catalogue of resource and property types.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Specification {
    #[serde(rename = "ResourceSpecificationVersion", default)]
    pub version: String,
    #[serde(rename = "PropertyTypes", default)]
    pub property_types: IndexMap<String, PropertyType>,
    #[serde(rename = "ResourceTypes", default)]
    pub resource_types: IndexMap<String, ResourceType>,
}

impl Specification {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn with_resource_type(mut self, name: impl Into<String>, resource: ResourceType) -> Self {
        self.resource_types.insert(name.into(), resource);
        self
    }

    pub fn with_property_type(mut self, name: impl Into<String>, property: PropertyType) -> Self {
        self.property_types.insert(name.into(), property);
        self
    }

    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.resource_types.get(name)
    }

    /// Look up a property type used by `resource_type`.
    ///
    /// Tries `"ResourceType.Name"` first, then a shared bare `"Name"` entry
    /// such as `Tag`.
    pub fn property_type(&self, resource_type: &str, name: &str) -> Option<&PropertyType> {
        self.property_types
            .get(&format!("{}.{}", resource_type, name))
            .or_else(|| self.property_types.get(name))
    }

    /// Whether `resource_type` declares an attribute named `attribute`.
    pub fn has_attribute(&self, resource_type: &str, attribute: &str) -> bool {
        self.resource_type(resource_type)
            .is_some_and(|r| r.attributes.contains_key(attribute))
    }
}
