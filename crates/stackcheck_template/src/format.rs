//! Source format detection.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Serialization format of a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Json => "json",
            SourceFormat::Yaml => "yaml",
        }
    }

    /// Format implied by a file extension, if the extension is conclusive.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            _ => None,
        }
    }

    /// Guess the format from content: anything that decodes as JSON is JSON.
    pub fn sniff(source: &[u8]) -> Self {
        if serde_json::from_slice::<serde::de::IgnoredAny>(source).is_ok() {
            SourceFormat::Json
        } else {
            SourceFormat::Yaml
        }
    }

    /// Use the extension when it is conclusive, otherwise sniff the content.
    pub fn detect(path: Option<&Path>, source: &[u8]) -> Self {
        path.and_then(Self::from_extension)
            .unwrap_or_else(|| Self::sniff(source))
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(SourceFormat::from_extension(Path::new("stack.JSON")), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_extension(Path::new("stack.yml")), Some(SourceFormat::Yaml));
        assert_eq!(SourceFormat::from_extension(Path::new("stack.template")), None);
        assert_eq!(SourceFormat::from_extension(Path::new("stack")), None);
    }

    #[test]
    fn test_sniff() {
        assert_eq!(SourceFormat::sniff(br#"{"Resources": {}}"#), SourceFormat::Json);
        assert_eq!(SourceFormat::sniff(b"Resources:\n  A: !Ref B\n"), SourceFormat::Yaml);
    }

    #[test]
    fn test_detect_falls_back_to_sniffing() {
        let source = br#"{"Resources": {}}"#;
        assert_eq!(
            SourceFormat::detect(Some(Path::new("stack.template")), source),
            SourceFormat::Json
        );
        assert_eq!(
            SourceFormat::detect(Some(Path::new("stack.yaml")), source),
            SourceFormat::Yaml
        );
        assert_eq!(SourceFormat::detect(None, b"A: 1"), SourceFormat::Yaml);
    }
}
