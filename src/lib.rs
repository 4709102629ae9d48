//! prover-conf - layered run configuration for contract verification jobs
//!
//! This crate resolves the configuration of one verification run from
//! built-in defaults, an optional base config file, a primary config file
//! and command-line flags. It validates the result against the attribute
//! registry, assigns compilers to source files, checks linkage directives
//! and splits rules into independently dispatchable run units.

pub mod compiler;
pub mod config;
pub mod error;
pub mod linkage;
pub mod pipeline;
pub mod source;
pub mod split;
pub mod validate;

pub use prover_attrs::{AttrKind, AttrValue, AttributeDefinition, AttributeRegistry, Validation};

pub use compiler::{resolve_compilers, resolve_optimize_runs, PatternKind, PatternMap};
pub use config::{ConfigSource, LayerOrigin, RawLayer, ResolvedConfig, RunRecord};
pub use error::{ConfError, ErrorKind, ErrorReport, PlanError};
pub use linkage::{validate_layouts, validate_linkage, LinkageGraph, StorageLayout};
pub use pipeline::{prepare_build, resolve, resolve_layers, BuildPlan};
pub use split::{select_rules, split_rules, RuleGroup, RunUnit};
pub use validate::{ContractSet, InputMode};
