//! Template decoding.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{TemplateError, TemplateResult};
use crate::format::SourceFormat;
use crate::normalizer::{Normalizer, NormalizerOptions};
use crate::reconciler::{self, Reconciliation};
use crate::template::Template;

/// A template decoded, reconciled and typed.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub format: SourceFormat,
    pub template: Template,
    /// The reconciled generic tree, used for cross-section lookups.
    pub raw: Value,
    pub reconciliation: Reconciliation,
}

/// Decodes template sources into [`Template`]s.
#[derive(Debug, Clone, Default)]
pub struct TemplateParser {
    normalizer: Normalizer,
}

impl TemplateParser {
    pub fn new(options: NormalizerOptions) -> Self {
        Self {
            normalizer: Normalizer::new(options),
        }
    }

    /// Normalize (YAML only), decode, reconcile nulls and build the typed template.
    pub fn parse(&self, source: &[u8], format: SourceFormat) -> TemplateResult<ParsedTemplate> {
        let mut raw = match format {
            SourceFormat::Json => decode(std::str::from_utf8(source)?, format)?,
            SourceFormat::Yaml => {
                let normalized = self.normalizer.normalize(source)?;
                decode(&normalized, format)?
            }
        };

        let reconciliation = reconciler::reconcile(&mut raw);
        let template = Template::from_tree(&raw)?;
        info!(
            "Parsed {} template with {} resources",
            format,
            template.resources.len()
        );

        Ok(ParsedTemplate {
            format,
            template,
            raw,
            reconciliation,
        })
    }

    /// Parse with the format chosen by content sniffing.
    pub fn parse_detected(&self, source: &[u8]) -> TemplateResult<ParsedTemplate> {
        self.parse(source, SourceFormat::sniff(source))
    }
}

/// Decode text into a generic tree.
pub fn decode(text: &str, format: SourceFormat) -> TemplateResult<Value> {
    debug!("Decoding {} bytes as {}", text.len(), format);
    match format {
        SourceFormat::Json => serde_json::from_str(text).map_err(|e| TemplateError::Decode {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }),
        SourceFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| {
                let (line, column) = e
                    .location()
                    .map(|location| line_column(text, location.index()))
                    .unwrap_or((1, 1));
                TemplateError::Decode {
                    line,
                    column,
                    message: e.to_string(),
                }
            })?;
            serde_json::to_value(yaml).map_err(|e| TemplateError::Structure(e.to_string()))
        }
    }
}

/// Convert a byte offset into a 1-based line and column.
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let prefix = &text.as_bytes()[..offset.min(text.len())];
    let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
    let column = match prefix.iter().rposition(|b| *b == b'\n') {
        Some(newline) => prefix.len() - newline,
        None => prefix.len() + 1,
    };
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_column() {
        let text = "a: 1\nbb: 2\n";
        assert_eq!(line_column(text, 0), (1, 1));
        assert_eq!(line_column(text, 3), (1, 4));
        assert_eq!(line_column(text, 5), (2, 1));
        assert_eq!(line_column(text, 7), (2, 3));
        assert_eq!(line_column(text, 500), (3, 1));
    }

    #[test]
    fn test_json_decode_error_location() {
        let err = decode("{\n  \"a\": ,\n}", SourceFormat::Json).unwrap_err();
        match err {
            TemplateError::Decode { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_decode_error_location() {
        let err = decode("a: 1\nb: [1, 2\nc: 3\n", SourceFormat::Yaml).unwrap_err();
        assert!(matches!(err, TemplateError::Decode { line, .. } if line >= 2));
    }

    #[test]
    fn test_parse_yaml_with_shorthand() {
        let source = b"Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n    Properties:\n      BucketName: !Ref Name\n";
        let parsed = TemplateParser::default()
            .parse(source, SourceFormat::Yaml)
            .unwrap();
        let bucket = parsed.template.resource("Bucket").unwrap();
        assert_eq!(
            bucket.property("BucketName"),
            Some(&serde_json::json!({"Ref": "Name"}))
        );
        assert_eq!(parsed.reconciliation.removed, 0);
    }

    #[test]
    fn test_parse_json_skips_normalization() {
        let source = br#"{"Resources": {"Q": {"Type": "AWS::SQS::Queue", "Properties": {"QueueName": "it's"}}}}"#;
        let parsed = TemplateParser::default().parse_detected(source).unwrap();
        assert_eq!(parsed.format, SourceFormat::Json);
        assert_eq!(
            parsed.template.resources["Q"].properties["QueueName"],
            serde_json::json!("it's")
        );
    }
}
