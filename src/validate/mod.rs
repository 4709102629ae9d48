//! Type & constraint validation
//!
//! Turns merged raw layers into a `ResolvedConfig`:
//! 1. reject keys the registry does not know
//! 2. convert each value to its declared kind
//! 3. rewrite absolute paths inside the working tree to relative ones
//! 4. run every validation strategy and exclusion group
//!
//! Failures from steps 2 to 4 are collected together and the one belonging
//! to the earliest declared attribute is reported.

mod checks;
mod convert;
mod paths;
mod project;

pub use checks::CheckContext;
pub use convert::to_typed;
pub use paths::{normalize_path, relativize, split_contract_suffix};
pub use project::{is_contract_name, ContractKind, ContractSet, DeclaredContract, InputMode};

use prover_attrs::AttributeRegistry;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::{LayerOrigin, MergedLayers, ResolvedConfig, ResolvedEntry};
use crate::error::ConfError;

/// Validate merged layers into a resolved configuration
pub fn validate(
    registry: &AttributeRegistry,
    merged: &MergedLayers,
    working_dir: &Path,
) -> Result<ResolvedConfig, ConfError> {
    for (key, entry) in &merged.entries {
        if !registry.contains(key) {
            return Err(ConfError::UnknownAttribute {
                key: key.clone(),
                location: entry.location.clone(),
            });
        }
    }

    let mut entries = BTreeMap::new();
    let mut failures = Vec::new();
    for (position, attr) in registry.iter().enumerate() {
        let entry = match merged.entries.get(attr.name) {
            Some(raw) => {
                let value = to_typed(attr, &raw.value).and_then(|value| {
                    value
                        .map(|value| relativize(attr.name, attr.path_kind, value, working_dir))
                        .transpose()
                });
                let value = value.unwrap_or_else(|err| {
                    failures.push((position, err));
                    None
                });
                ResolvedEntry {
                    value,
                    origin: raw.origin,
                }
            }
            None => ResolvedEntry {
                value: None,
                origin: LayerOrigin::Default,
            },
        };
        entries.insert(attr.name.to_string(), entry);
    }

    let config = ResolvedConfig::new(entries, merged.sources.clone());
    let ctx = CheckContext::new(&config, working_dir);
    failures.extend(checks::run_checks(registry, &ctx));
    failures.sort_by_key(|(position, _)| *position);
    let mut failures = failures.into_iter();

    if let Some((_, first)) = failures.next() {
        for (_, suppressed) in failures {
            debug!(error = %suppressed, "additional validation failure");
        }
        return Err(first);
    }

    Ok(config)
}
