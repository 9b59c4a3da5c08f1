//! # stackcheck_template
//!
//! Turns infrastructure template sources into typed [`Template`]s.
//!
//! ## Pipeline
//!
//! - **Normalizer**: rewrites shorthand tags (`!Ref`, `!GetAtt`, `!Sub |`...)
//!   into the canonical `{"Fn::X": args}` form
//! - **Parser**: decodes JSON or YAML into a generic tree
//! - **Reconciler**: removes stray `null`s left by unresolved functions and
//!   records the resources and properties that lost data
//! - **Template**: typed `Resources`, untyped everything else
//!
//! ## Example
//!
//! ```rust
//! use stackcheck_template::{SourceFormat, TemplateParser};
//!
//! let source = b"Resources:\n  Topic:\n    Type: AWS::SNS::Topic\n    Properties:\n      TopicName: !Sub \"${AWS::StackName}-events\"\n";
//! let parsed = TemplateParser::default().parse(source, SourceFormat::Yaml).unwrap();
//! assert_eq!(parsed.template.resources["Topic"].resource_type, "AWS::SNS::Topic");
//! ```

pub mod error;
pub mod format;
pub mod intrinsic;
pub mod normalizer;
pub mod parser;
pub mod reconciler;
pub mod scanner;
pub mod template;

pub use error::{TemplateError, TemplateResult};
pub use format::SourceFormat;
pub use intrinsic::{ArgumentShape, IntrinsicFunction};
pub use normalizer::{Normalizer, NormalizerOptions, NormalizerPass};
pub use parser::{decode, line_column, ParsedTemplate, TemplateParser};
pub use reconciler::{reconcile, DeadEntries, Reconciliation};
pub use template::{DeletionPolicy, Resource, Template};
