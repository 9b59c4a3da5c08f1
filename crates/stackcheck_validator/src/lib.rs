//! # stackcheck_validator
//!
//! Validates infrastructure templates against a resource specification
//! before they are submitted for provisioning.
//!
//! ## Checks
//!
//! - **Structural**: required properties, List/Map/structured shapes,
//!   recursively through nested property types
//! - **References**: intrinsic function arguments, `Ref` targets,
//!   `Fn::GetAtt` resources and attributes, and `Fn::FindInMap` mapping names
//! - **Custom**: per-resource-type rules such as CIDR block syntax
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use stackcheck_spec::{Property, ResourceType, Specification};
//! use stackcheck_validator::{TemplateValidator, ValidatorConfig};
//!
//! let spec = Specification::new("1.0.0").with_resource_type(
//!     "AWS::SNS::Topic",
//!     ResourceType::default().with_property("TopicName", Property::required("String")),
//! );
//! let validator = TemplateValidator::new(Arc::new(spec), ValidatorConfig::default()).unwrap();
//!
//! let report = validator
//!     .validate_source(b"Resources:\n  Topic:\n    Type: AWS::SNS::Topic\n", None)
//!     .unwrap();
//! assert!(!report.valid());
//! println!("{}", report.report());
//! ```

pub mod custom;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod structural;

pub use custom::{CustomResourceValidator, CustomValidatorRegistry};
pub use error::{ValidatorError, ValidatorResult};
pub use pipeline::{TemplateValidator, ValidatorConfig};
pub use report::{Diagnostic, ReportSummary, ResourceValidation, Severity, ValidationReport};
pub use rules::CidrBlockRule;
pub use structural::{References, StructuralValidator};
