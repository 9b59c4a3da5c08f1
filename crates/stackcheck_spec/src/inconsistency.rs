//! Known mismatches between the written documentation and the
//! machine-readable specification.
//!
//! The table is keyed by `"ResourceType"` (resource-level properties) or
//! `"ResourceType.PropertyType"` (nested properties), then by property
//! name, and lists the attribute names (e.g. `Required`) that disagree.
//!
//! ```yaml
//! AWS::EC2::Instance:
//!   ImageId:
//!     - Required
//! AWS::EC2::SecurityGroup.Ingress:
//!   IpProtocol: [Required]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SpecError, SpecResult};

/// Table of attributes known to be inconsistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InconsistencyConfiguration {
    entries: HashMap<String, HashMap<String, Vec<String>>>,
}

impl InconsistencyConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML, JSON or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> SpecResult<Self> {
        if !path.exists() {
            return Err(SpecError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let config = match extension.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => return Err(SpecError::UnsupportedFormat(path.to_path_buf())),
        };
        debug!(
            "Loaded {} inconsistency entries from {:?}",
            config.entries.len(),
            path
        );
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> SpecResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Record `attribute` of `property` under `key` as inconsistent.
    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        property: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.entries
            .entry(key.into())
            .or_default()
            .entry(property.into())
            .or_default()
            .push(attribute.into());
        self
    }

    pub fn is_inconsistent(&self, key: &str, property: &str, attribute: &str) -> bool {
        self.attributes(key, property)
            .iter()
            .any(|a| a == attribute)
    }

    /// Inconsistent attribute names recorded for a property.
    pub fn attributes(&self, key: &str, property: &str) -> &[String] {
        self.entries
            .get(key)
            .and_then(|properties| properties.get(property))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_from_yaml_str() {
        let config = InconsistencyConfiguration::from_yaml_str(
            "AWS::EC2::Instance:\n  ImageId:\n    - Required\nAWS::EC2::SecurityGroup.Ingress:\n  IpProtocol: [Required, Type]\n",
        )
        .unwrap();

        assert!(config.is_inconsistent("AWS::EC2::Instance", "ImageId", "Required"));
        assert!(config.is_inconsistent("AWS::EC2::SecurityGroup.Ingress", "IpProtocol", "Type"));
        assert!(!config.is_inconsistent("AWS::EC2::Instance", "ImageId", "Type"));
        assert!(!config.is_inconsistent("AWS::EC2::VPC", "CidrBlock", "Required"));
    }

    #[test]
    fn test_empty_yaml_is_empty_table() {
        assert!(InconsistencyConfiguration::from_yaml_str("").unwrap().is_empty());
    }

    #[test]
    fn test_from_file_by_extension() {
        let temp = tempdir().unwrap();

        let toml_path = temp.path().join("inconsistencies.toml");
        fs::write(&toml_path, "[\"AWS::EC2::VPC\"]\nCidrBlock = [\"Required\"]\n").unwrap();
        let config = InconsistencyConfiguration::from_file(&toml_path).unwrap();
        assert!(config.is_inconsistent("AWS::EC2::VPC", "CidrBlock", "Required"));

        let json_path = temp.path().join("inconsistencies.json");
        fs::write(&json_path, r#"{"AWS::S3::Bucket": {"BucketName": ["Required"]}}"#).unwrap();
        let config = InconsistencyConfiguration::from_file(&json_path).unwrap();
        assert_eq!(config.attributes("AWS::S3::Bucket", "BucketName"), ["Required"]);

        let txt_path = temp.path().join("inconsistencies.txt");
        fs::write(&txt_path, "").unwrap();
        assert!(matches!(
            InconsistencyConfiguration::from_file(&txt_path),
            Err(SpecError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_with_entry() {
        let config = InconsistencyConfiguration::new().with_entry("A", "B", "Required");
        assert!(config.is_inconsistent("A", "B", "Required"));
    }
}
