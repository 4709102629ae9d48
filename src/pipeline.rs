//! Resolution pipeline
//!
//! Runs the stages in order:
//! - load the base, primary and command-line layers
//! - add the registry defaults and merge
//! - validate into a `ResolvedConfig`
//! - plan the build: per-file compilers, optimizer runs and linkage
//!
//! Loading and validation fail fast. Build planning runs the compiler map
//! and linkage checks independently and reports every error from both.

use prover_attrs::AttributeRegistry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::compiler::{resolve_compilers, resolve_optimize_runs};
use crate::config::{default_layer, merge_layers, RawLayer, ResolvedConfig};
use crate::error::{ConfError, PlanError};
use crate::linkage::{validate_layouts, validate_linkage, LinkageGraph, StorageLayout};
use crate::source::load_sources;
use crate::validate::{validate, ContractSet, InputMode};

/// Resolve command-line tokens into a validated configuration
pub fn resolve(
    registry: &AttributeRegistry,
    tokens: &[String],
    working_dir: &Path,
) -> Result<ResolvedConfig, ConfError> {
    let layers = load_sources(registry, tokens, working_dir)?;
    resolve_layers(registry, layers, working_dir)
}

/// Resolve already loaded layers; the default layer is added here
pub fn resolve_layers(
    registry: &AttributeRegistry,
    layers: Vec<RawLayer>,
    working_dir: &Path,
) -> Result<ResolvedConfig, ConfError> {
    let mut all = Vec::with_capacity(layers.len() + 1);
    all.push(default_layer(registry));
    all.extend(layers);

    let merged = merge_layers(&all);
    debug!(keys = merged.entries.len(), "layers merged");

    let config = validate(registry, &merged, working_dir)?;
    info!(sources = config.sources().len(), "configuration resolved");
    Ok(config)
}

/// Everything the external compile step needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub input_mode: InputMode,
    pub contracts: ContractSet,
    /// Compiler per source file
    pub compilers: BTreeMap<String, String>,
    /// Optimizer runs per source file, empty when the optimizer is off
    pub optimize_runs: BTreeMap<String, u64>,
    pub linkage: LinkageGraph,
}

/// Plan the build, collecting every compiler and linkage error.
///
/// With `layouts`, links are also checked against the built storage
/// layouts.
pub fn prepare_build(
    config: &ResolvedConfig,
    layouts: Option<&BTreeMap<String, StorageLayout>>,
) -> Result<BuildPlan, PlanError> {
    let input_mode = InputMode::detect(config)?;
    let contracts = ContractSet::from_config(config)?;
    let mut errors = Vec::new();

    let (compilers, optimize_runs) = if input_mode == InputMode::Sources {
        let compilers = resolve_compilers(config, &contracts).unwrap_or_else(|err| {
            errors.push(err);
            BTreeMap::new()
        });
        let optimize_runs = resolve_optimize_runs(config, &contracts).unwrap_or_else(|err| {
            errors.push(err);
            BTreeMap::new()
        });
        (compilers, optimize_runs)
    } else {
        (BTreeMap::new(), BTreeMap::new())
    };

    let linkage = match validate_linkage(&contracts, config) {
        Ok(graph) => {
            if let Some(layouts) = layouts {
                if let Err(err) = validate_layouts(&graph, layouts) {
                    errors.extend(err.errors);
                }
            }
            graph
        }
        Err(err) => {
            errors.extend(err.errors);
            LinkageGraph::default()
        }
    };

    if !errors.is_empty() {
        return Err(PlanError { errors });
    }

    info!(
        mode = ?input_mode,
        contracts = contracts.len(),
        files = compilers.len(),
        "build planned"
    );
    Ok(BuildPlan {
        input_mode,
        contracts,
        compilers,
        optimize_runs,
        linkage,
    })
}
