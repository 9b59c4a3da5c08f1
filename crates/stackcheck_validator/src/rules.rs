//! Built-in custom validators.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use stackcheck_template::{IntrinsicFunction, Resource};

use crate::custom::CustomResourceValidator;
use crate::error::ValidatorResult;
use crate::report::ResourceValidation;

/// IPv4 CIDR notation: four dotted octets and a prefix length.
const CIDR_PATTERN: &str = r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})/(\d{1,2})$";

/// All built-in rules.
pub fn builtin() -> ValidatorResult<Vec<Arc<dyn CustomResourceValidator>>> {
    let vpc: Arc<dyn CustomResourceValidator> = Arc::new(CidrBlockRule::vpc()?);
    let subnet: Arc<dyn CustomResourceValidator> = Arc::new(CidrBlockRule::subnet()?);
    Ok(vec![vpc, subnet])
}

/// Checks that a resource's CIDR block property is a valid IPv4 CIDR.
#[derive(Debug, Clone)]
pub struct CidrBlockRule {
    resource_type: String,
    property: String,
    pattern: Regex,
}

impl CidrBlockRule {
    pub fn new(resource_type: impl Into<String>, property: impl Into<String>) -> ValidatorResult<Self> {
        Ok(Self {
            resource_type: resource_type.into(),
            property: property.into(),
            pattern: Regex::new(CIDR_PATTERN)?,
        })
    }

    /// `CidrBlock` of `AWS::EC2::VPC`.
    pub fn vpc() -> ValidatorResult<Self> {
        Self::new("AWS::EC2::VPC", "CidrBlock")
    }

    /// `CidrBlock` of `AWS::EC2::Subnet`.
    pub fn subnet() -> ValidatorResult<Self> {
        Self::new("AWS::EC2::Subnet", "CidrBlock")
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Whether `text` is a CIDR block with octets up to 255 and a prefix up to 32.
    pub fn is_valid_cidr(&self, text: &str) -> bool {
        let Some(captures) = self.pattern.captures(text) else {
            return false;
        };
        let octets_ok = (1..=4).all(|idx| {
            captures
                .get(idx)
                .and_then(|m| m.as_str().parse::<u16>().ok())
                .is_some_and(|octet| octet <= 255)
        });
        let prefix_ok = captures
            .get(5)
            .and_then(|m| m.as_str().parse::<u8>().ok())
            .is_some_and(|prefix| prefix <= 32);
        octets_ok && prefix_ok
    }
}

impl CustomResourceValidator for CidrBlockRule {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn validate(&self, name: &str, resource: &Resource, validation: &mut ResourceValidation) {
        let Some(value) = resource.property(&self.property) else {
            return;
        };

        match value {
            Value::Null => {}
            Value::String(text) if self.is_valid_cidr(text) => {}
            Value::String(text) => validation.add_error(format!(
                "{} {} is not a valid CIDR block",
                self.property, text
            )),
            other if IntrinsicFunction::detect(other).is_some() => {
                debug!("{}.{} is computed, skipping CIDR check", name, self.property);
            }
            other => validation.add_error(format!(
                "{} {} is not a valid CIDR block",
                self.property, other
            )),
        }
    }
}
