//! Attribute registry for prover run configurations.
//!
//! Every configuration key a run accepts is declared here once: its kind,
//! command-line flag, default, validation strategies and mutual-exclusion
//! group. The registry is pure data; resolution and validation live in the
//! `prover-conf` crate.

mod attribute;
mod registry;
mod value;

pub use attribute::{AttrKind, AttributeDefinition, ExclusionGroup, PathKind, Validation};
pub use registry::{
    AttributeRegistry, RegistryError, ARTIFACT_EXTENSIONS, COMPILER_GROUP, SOURCE_EXTENSIONS,
};
pub use value::AttrValue;
