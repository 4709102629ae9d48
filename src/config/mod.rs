//! Configuration layers, merge and the resolved result
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults (from the attribute registry)
//! 2. Base config (`override_base_config` of the primary file)
//! 3. Primary config file
//! 4. CLI flags

mod defaults;
mod layer;
mod merge;
mod record;
mod resolved;

pub use defaults::{default_layer, to_raw};
pub use layer::{ConfigSource, LayerOrigin, RawLayer};
pub use merge::{merge_layers, MergedEntry, MergedLayers, META_KEYS, OVERRIDE_BASE_CONFIG};
pub use record::{RecordError, RunRecord, SCHEMA_ID, SCHEMA_VERSION};
pub use resolved::{ResolvedConfig, ResolvedEntry};
