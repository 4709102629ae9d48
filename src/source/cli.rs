//! Command-line layer
//!
//! The flag set is generated from the attribute registry, so every
//! registered attribute has exactly one flag and nothing else parses.
//! Only flags actually present on the command line enter the layer.

use clap::error::{ContextKind, ContextValue, ErrorKind as ClapErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use prover_attrs::{AttrKind, AttributeDefinition, AttributeRegistry, Validation};
use serde_json::Value;
use std::path::PathBuf;

use super::file::is_config_file;
use crate::config::{ConfigSource, RawLayer};
use crate::error::{ConfError, COMMAND_LINE};

/// Parsed command line: the CLI layer and the positional config file, if any
#[derive(Debug, Clone)]
pub struct CliInput {
    pub layer: RawLayer,
    pub config_file: Option<PathBuf>,
}

/// Build the flag parser for a registry
pub fn command(registry: &AttributeRegistry) -> Command {
    let mut cmd = Command::new("prover-conf")
        .no_binary_name(true)
        .args_override_self(true)
        .disable_help_flag(true)
        .disable_version_flag(true);

    for attr in registry.iter() {
        cmd = cmd.arg(flag_for(attr));
    }
    cmd
}

fn flag_for(attr: &AttributeDefinition) -> Arg {
    let arg = Arg::new(attr.name).help(attr.help);

    if attr.positional {
        return arg.num_args(1..).action(ArgAction::Append);
    }

    let arg = arg.long(attr.name);
    match attr.kind {
        AttrKind::Boolean => arg.action(ArgAction::SetTrue),
        AttrKind::StringList => arg.num_args(1..).action(ArgAction::Append),
        AttrKind::Mapping => arg.num_args(1).action(ArgAction::Append),
        AttrKind::String | AttrKind::Number => {
            let arg = match attr.missing_value {
                Some(missing) => arg.num_args(0..=1).default_missing_value(missing),
                None => arg.num_args(1),
            };
            if attr.validations.contains(&Validation::ProverArgs) {
                arg.allow_hyphen_values(true)
            } else {
                arg
            }
        }
    }
}

/// Parse command-line tokens into the CLI layer
pub fn parse_args(registry: &AttributeRegistry, tokens: &[String]) -> Result<CliInput, ConfError> {
    let matches = command(registry)
        .try_get_matches_from(tokens)
        .map_err(from_clap)?;

    let mut layer = RawLayer::new(ConfigSource::cli());
    let mut config_file = None;

    for attr in registry.iter() {
        if matches.value_source(attr.name) != Some(ValueSource::CommandLine) {
            continue;
        }

        if attr.positional {
            let (configs, inputs): (Vec<String>, Vec<String>) =
                strings(&matches, attr.name).partition(|token| is_config_file(token));
            match configs.as_slice() {
                [] => {}
                [single] if inputs.is_empty() => config_file = Some(PathBuf::from(single)),
                _ => {
                    return Err(ConfError::ConfigNesting {
                        file: configs.first().map(PathBuf::from),
                        reason: "No other files are allowed when using a config file".to_string(),
                    })
                }
            }
            if !inputs.is_empty() {
                layer.insert(attr.name, Value::from(inputs));
            }
            continue;
        }

        let value = match attr.kind {
            AttrKind::Boolean => Value::Bool(matches.get_flag(attr.name)),
            AttrKind::StringList => Value::from(strings(&matches, attr.name).collect::<Vec<_>>()),
            AttrKind::Mapping => {
                Value::String(strings(&matches, attr.name).collect::<Vec<_>>().join(","))
            }
            AttrKind::String | AttrKind::Number => match matches.get_one::<String>(attr.name) {
                Some(value) => Value::String(value.clone()),
                None => continue,
            },
        };
        layer.insert(attr.name, value);
    }

    Ok(CliInput { layer, config_file })
}

fn strings<'a>(matches: &'a ArgMatches, name: &str) -> impl Iterator<Item = String> + 'a {
    matches
        .get_many::<String>(name)
        .into_iter()
        .flatten()
        .cloned()
}

fn from_clap(err: clap::Error) -> ConfError {
    if err.kind() == ClapErrorKind::UnknownArgument {
        if let Some(ContextValue::String(arg)) = err.get(ContextKind::InvalidArg) {
            let key = arg.trim_start_matches('-');
            let key = key.split('=').next().unwrap_or(key);
            return ConfError::UnknownAttribute {
                key: key.to_string(),
                location: COMMAND_LINE.to_string(),
            };
        }
    }

    let rendered = err.to_string();
    let reason = rendered
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string();
    ConfError::ConfigParse {
        file: PathBuf::from(COMMAND_LINE),
        key: None,
        reason,
    }
}
