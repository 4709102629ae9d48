//! Source loading
//!
//! Turns command-line tokens into the raw layers above the built-in
//! defaults: an optional base config, an optional primary config file and
//! the command line itself. At most one level of nesting is allowed.

mod cli;
mod file;

pub use cli::{command, parse_args, CliInput};
pub use file::{is_config_file, parse_json, parse_toml, read_config_file};

use prover_attrs::AttributeRegistry;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{LayerOrigin, RawLayer, OVERRIDE_BASE_CONFIG};
use crate::error::ConfError;

/// Load every layer named by the command line, lowest precedence first.
///
/// Relative paths are taken from `working_dir`; a base config path is
/// taken relative to the file declaring it.
pub fn load_sources(
    registry: &AttributeRegistry,
    tokens: &[String],
    working_dir: &Path,
) -> Result<Vec<RawLayer>, ConfError> {
    let CliInput { layer, config_file } = parse_args(registry, tokens)?;

    let mut layers = Vec::with_capacity(3);
    if let Some(config_file) = config_file {
        let path = working_dir.join(config_file);
        let child = read_config_file(&path, LayerOrigin::ChildConf, registry)?;
        reject_nested_configs(&child, &path)?;

        if let Some(base_path) = base_config_path(&child, &path)? {
            let base = load_base(registry, &base_path, &path)?;
            layers.push(base);
        }
        info!(file = %path.display(), "loaded config file");
        layers.push(child);
    }
    layers.push(layer);
    Ok(layers)
}

fn base_config_path(child: &RawLayer, child_path: &Path) -> Result<Option<PathBuf>, ConfError> {
    let Some(value) = child.get(OVERRIDE_BASE_CONFIG) else {
        return Ok(None);
    };
    let Some(relative) = value.as_str() else {
        return Err(ConfError::ConfigParse {
            file: child_path.to_path_buf(),
            key: Some(OVERRIDE_BASE_CONFIG.to_string()),
            reason: format!("value of '{}' is not a string", OVERRIDE_BASE_CONFIG),
        });
    };
    let dir = child_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(Some(dir.join(relative)))
}

fn load_base(
    registry: &AttributeRegistry,
    base_path: &Path,
    child_path: &Path,
) -> Result<RawLayer, ConfError> {
    let base = read_config_file(base_path, LayerOrigin::BaseConf, registry).map_err(|err| {
        ConfError::ConfigNesting {
            file: Some(child_path.to_path_buf()),
            reason: format!(
                "Error when reading {}: Cannot load base config: {}: {}",
                child_path.display(),
                base_path.display(),
                err
            ),
        }
    })?;

    if base.get(OVERRIDE_BASE_CONFIG).is_some() {
        return Err(ConfError::ConfigNesting {
            file: Some(base_path.to_path_buf()),
            reason: format!(
                "base config {} cannot include '{}'",
                base_path.display(),
                OVERRIDE_BASE_CONFIG
            ),
        });
    }
    reject_nested_configs(&base, base_path)?;

    debug!(file = %base_path.display(), "loaded base config");
    Ok(base)
}

fn reject_nested_configs(layer: &RawLayer, path: &Path) -> Result<(), ConfError> {
    let nested = match layer.get("files") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(is_config_file),
        Some(Value::String(s)) => s.split(',').map(str::trim).any(is_config_file),
        _ => false,
    };
    if nested {
        return Err(ConfError::ConfigNesting {
            file: Some(path.to_path_buf()),
            reason: format!(
                "Error when reading {}: Cannot use conf files inside a conf file",
                path.display()
            ),
        });
    }
    Ok(())
}
