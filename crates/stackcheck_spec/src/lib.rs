//! # stackcheck_spec
//!
//! The declarative resource specification templates are validated against.
//!
//! - [`Specification`]: resource types and the property types they use,
//!   with each property's shape decided once at load
//! - [`loader`]: JSON loading and a region/version keyed [`SpecificationCache`]
//! - [`InconsistencyConfiguration`]: attributes where the documentation and
//!   the specification disagree

pub mod error;
pub mod inconsistency;
pub mod loader;
pub mod models;

pub use error::{SpecError, SpecResult};
pub use inconsistency::InconsistencyConfiguration;
pub use loader::SpecificationCache;
pub use models::{Attribute, Property, PropertyShape, PropertyType, ResourceType, Specification};
