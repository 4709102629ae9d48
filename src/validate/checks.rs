//! Validation strategy dispatch
//!
//! Every strategy of the closed `Validation` set is handled by one arm of
//! `run_validation`. Checks run after all attributes are converted, so a
//! check may look at any sibling attribute.

use indexmap::IndexMap;
use prover_attrs::{
    AttrValue, AttributeDefinition, AttributeRegistry, ExclusionGroup, Validation, COMPILER_GROUP,
    SOURCE_EXTENSIONS,
};
use std::path::Path;

use super::convert::insert_unique;
use super::project::{ContractSet, InputMode};
use crate::config::{LayerOrigin, ResolvedConfig};
use crate::error::ConfError;

/// Shared state for one validation pass
pub struct CheckContext<'a> {
    pub config: &'a ResolvedConfig,
    pub working_dir: &'a Path,
    /// Declared contracts, when `files` parses
    pub contracts: Option<ContractSet>,
}

impl<'a> CheckContext<'a> {
    pub fn new(config: &'a ResolvedConfig, working_dir: &'a Path) -> Self {
        let contracts = ContractSet::from_config(config).ok();
        Self {
            config,
            working_dir,
            contracts,
        }
    }

    /// Whether an attribute carries a meaningful value; `false` counts as unset
    pub fn is_set(&self, name: &str) -> bool {
        match self.config.get(name) {
            None => false,
            Some(AttrValue::Bool(b)) => *b,
            Some(AttrValue::List(items)) => !items.is_empty(),
            Some(AttrValue::Map(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Set from a layer above the built-in defaults
    pub fn is_explicit(&self, name: &str) -> bool {
        self.is_set(name) && self.config.origin(name) != Some(LayerOrigin::Default)
    }
}

/// Run every validation of every set attribute, returning failures tagged
/// with the declaration position of the attribute they belong to
pub fn run_checks(registry: &AttributeRegistry, ctx: &CheckContext<'_>) -> Vec<(usize, ConfError)> {
    let mut failures = Vec::new();

    for (position, attr) in registry.iter().enumerate() {
        for validation in &attr.validations {
            if let Err(err) = run_validation(attr, *validation, ctx) {
                failures.push((position, err));
            }
        }
    }

    for group in registry.groups() {
        if let Some((position, err)) = check_group(registry, group, ctx) {
            failures.push((position, err));
        }
    }

    failures.sort_by_key(|(position, _)| *position);
    failures
}

/// Conflict when explicit members sit on more than one side of the group
fn check_group(
    registry: &AttributeRegistry,
    group: &ExclusionGroup,
    ctx: &CheckContext<'_>,
) -> Option<(usize, ConfError)> {
    let mut explicit: Vec<(usize, &'static str)> = group
        .members()
        .filter(|name| ctx.is_explicit(name))
        .filter_map(|name| registry.position(name).map(|p| (p, name)))
        .collect();
    explicit.sort();

    let first_side = group.side_of(explicit.first()?.1);
    if explicit.iter().all(|(_, name)| group.side_of(name) == first_side) {
        return None;
    }

    let position = explicit[0].0;
    let names: Vec<String> = explicit.iter().map(|(_, name)| name.to_string()).collect();
    let err = if group.id == COMPILER_GROUP {
        ConfError::MixedCompilerFlags { flags: names }
    } else {
        ConfError::validation(
            explicit[0].1,
            format!("{} (got {})", group.reason, names.join(", ")),
        )
    };
    Some((position, err))
}

fn run_validation(
    attr: &AttributeDefinition,
    validation: Validation,
    ctx: &CheckContext<'_>,
) -> Result<(), ConfError> {
    let name = attr.name;

    // Project-level checks apply whether or not the attribute is set.
    match validation {
        Validation::Files => return check_files(ctx),
        Validation::VerifyTarget => return check_verify(ctx),
        _ => {}
    }

    if !ctx.is_set(name) {
        return Ok(());
    }
    let Some(value) = ctx.config.get(name) else {
        return Ok(());
    };

    match validation {
        Validation::OneOf(allowed) => {
            let v = value.as_str().unwrap_or_default();
            if allowed.contains(&v) {
                Ok(())
            } else {
                Err(ConfError::validation(
                    name,
                    format!("'{}' is not one of: {}", v, allowed.join(", ")),
                ))
            }
        }
        Validation::Range { min, max } => match value.as_number() {
            Some(n) if n < min || n > max => Err(ConfError::validation(
                name,
                format!("{} is out of range, expected {} to {}", n, min, max),
            )),
            _ => Ok(()),
        },
        Validation::CompilerExecutable => {
            let v = value.as_str().unwrap_or_default();
            if has_source_extension(v) {
                let language = if name == "vyper" { "Vyper" } else { "Solidity" };
                Err(ConfError::validation(
                    name,
                    format!("wrong {} executable given: {}", language, v),
                ))
            } else {
                Ok(())
            }
        }
        Validation::CompilerMapKeys => {
            for (key, compiler) in value.as_map().into_iter().flatten() {
                let ext = Path::new(key).extension().and_then(|e| e.to_str());
                if let Some(ext) = ext {
                    if !SOURCE_EXTENSIONS.contains(&ext) && !ext.contains('*') {
                        return Err(ConfError::validation(
                            name,
                            format!(
                                "{} is not a source file pattern; keys must name .sol, .vy or .yul sources, globs or contract names",
                                key
                            ),
                        ));
                    }
                }
                if compiler.is_empty() {
                    return Err(ConfError::validation(name, format!("no value given for {}", key)));
                }
                if name != "solc_optimize_map" && has_source_extension(compiler) {
                    let language = if ext == Some("vy") { "Vyper" } else { "Solidity" };
                    return Err(ConfError::validation(
                        name,
                        format!("wrong {} executable given: {}", language, compiler),
                    ));
                }
            }
            Ok(())
        }
        Validation::OptimizeRuns => {
            for (key, runs) in value.as_map().into_iter().flatten() {
                if runs.parse::<u64>().is_err() {
                    return Err(ConfError::validation(
                        name,
                        format!(
                            "optimizer runs for {} must be a non-negative integer, got '{}'",
                            key, runs
                        ),
                    ));
                }
            }
            Ok(())
        }
        Validation::KeyedList { separator } => {
            let mut seen = IndexMap::new();
            for entry in value.as_list().unwrap_or_default() {
                let (key, path) = entry.split_once(separator).ok_or_else(|| {
                    ConfError::validation(
                        name,
                        format!("'{}' must be of the form name{}path", entry, separator),
                    )
                })?;
                insert_unique(name, &mut seen, key, path).map_err(|_| ConfError::DuplicateKey {
                    attr: name.to_string(),
                    key: key.to_string(),
                    reason: format!("package {} was given two paths", key),
                })?;
            }
            Ok(())
        }
        Validation::ExistingPath => {
            let v = value.as_str().unwrap_or_default();
            if ctx.working_dir.join(v).exists() {
                Ok(())
            } else {
                Err(ConfError::validation(name, format!("path {} does not exist", v)))
            }
        }
        Validation::NoCurlyQuotes => {
            let v = value.as_str().unwrap_or_default();
            match v.chars().find(|c| matches!(c, '\u{201c}' | '\u{201d}')) {
                Some(quote) => Err(ConfError::validation(
                    name,
                    format!("Please replace {} with \" quotation marks", quote),
                )),
                None => Ok(()),
            }
        }
        Validation::Uuid => {
            let v = value.as_str().unwrap_or_default();
            uuid::Uuid::parse_str(v)
                .map(|_| ())
                .map_err(|_| ConfError::validation(name, format!("'{}' is not a valid UUID", v)))
        }
        Validation::Requires(other) => {
            if ctx.is_set(other) {
                Ok(())
            } else {
                Err(ConfError::validation(
                    name,
                    format!("'{}' requires '{}' to be set", name, other),
                ))
            }
        }
        Validation::ConflictsWith(other) => {
            if ctx.is_explicit(name) && ctx.is_explicit(other) {
                Err(ConfError::validation(
                    name,
                    format!("Cannot use both '{}' and '{}'", name, other),
                ))
            } else {
                Ok(())
            }
        }
        Validation::Forbidden(reason) => {
            if ctx.is_explicit(name) {
                Err(ConfError::validation(name, reason))
            } else {
                Ok(())
            }
        }
        Validation::ProverArgs => check_prover_args(name, value.as_str().unwrap_or_default(), ctx),
        Validation::RuleFilter => {
            if ctx.is_set("verify") || ctx.is_set("bytecode_spec") {
                Ok(())
            } else {
                Err(ConfError::validation(
                    name,
                    format!("'{}' can only be used with a spec: set 'verify' or 'bytecode_spec'", name),
                ))
            }
        }
        Validation::KnownContracts => {
            let Some(contracts) = &ctx.contracts else {
                return Ok(());
            };
            for contract in value.as_list().unwrap_or_default() {
                if !contracts.contains(contract) {
                    return Err(ConfError::validation(
                        name,
                        format!("contract {} is not one of the declared contracts", contract),
                    ));
                }
            }
            Ok(())
        }
        Validation::Files | Validation::VerifyTarget => Ok(()),
    }
}

fn check_files(ctx: &CheckContext<'_>) -> Result<(), ConfError> {
    InputMode::detect(ctx.config)?;
    ContractSet::from_config(ctx.config)?;
    Ok(())
}

fn check_verify(ctx: &CheckContext<'_>) -> Result<(), ConfError> {
    let stops_early = ctx.is_set("build_only") || ctx.is_set("compilation_steps_only");
    let Some(verify) = ctx.config.get_str("verify") else {
        if InputMode::detect(ctx.config).ok() == Some(InputMode::Sources) && !stops_early {
            return Err(ConfError::validation(
                "verify",
                "You must use 'verify' when running on source files",
            ));
        }
        return Ok(());
    };

    let Some((contract, spec)) = verify.split_once(':') else {
        return Err(ConfError::validation(
            "verify",
            format!("'{}' must be of the form Contract:path.spec", verify),
        ));
    };
    let spec_ext = Path::new(spec).extension().and_then(|e| e.to_str());
    if !matches!(spec_ext, Some("spec") | Some("cvl")) {
        return Err(ConfError::validation(
            "verify",
            format!("spec file {} must have a .spec or .cvl extension", spec),
        ));
    }
    if let Some(contracts) = &ctx.contracts {
        if !contracts.contains(contract) {
            return Err(ConfError::validation(
                "verify",
                format!("'verify' argument, {}, doesn't match any contract name", contract),
            ));
        }
    }
    Ok(())
}

fn check_prover_args(name: &str, args: &str, ctx: &CheckContext<'_>) -> Result<(), ConfError> {
    for token in args.split_whitespace() {
        if token == "-spec" {
            return Err(ConfError::validation(
                name,
                "'-spec' cannot be passed through prover_args; use 'verify'",
            ));
        }
        if token == "-smt_preciseBitwiseOps" && ctx.is_set("precise_bitwise_ops") {
            return Err(ConfError::validation(
                name,
                "Cannot use '-smt_preciseBitwiseOps' in prover_args together with 'precise_bitwise_ops'",
            ));
        }
    }
    Ok(())
}

fn has_source_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
}
