//! Input mode and the declared contract set
//!
//! Derived from `files` and `bytecode_jsons` of a resolved configuration.
//! An empty input list never implies bytecode mode; bytecode mode is only
//! selected by `bytecode_jsons` itself.

use prover_attrs::{ARTIFACT_EXTENSIONS, SOURCE_EXTENSIONS};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::paths::{normalize_path, split_contract_suffix};
use crate::config::ResolvedConfig;
use crate::error::ConfError;

/// What the run is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Solidity, Vyper or Yul sources
    Sources,
    /// A single prebuilt `.tac` or `.json` artifact
    Artifact,
    /// Bytecode JSON inputs checked against `bytecode_spec`
    Bytecode,
}

impl InputMode {
    /// Determine the mode from the input attributes
    pub fn detect(config: &ResolvedConfig) -> Result<Self, ConfError> {
        let files = config.list("files");

        if !config.list("bytecode_jsons").is_empty() {
            if !files.is_empty() {
                return Err(ConfError::validation(
                    "bytecode_jsons",
                    "Cannot use 'bytecode_jsons' with other files",
                ));
            }
            return Ok(InputMode::Bytecode);
        }

        if files.is_empty() {
            return Err(ConfError::validation(
                "files",
                "no input files given: pass source files, one .tac/.json artifact, or use 'bytecode_jsons'",
            ));
        }

        if let Some(ext) = files
            .iter()
            .filter_map(|f| extension(file_part(f)))
            .find(|ext| ARTIFACT_EXTENSIONS.contains(ext))
        {
            if files.len() > 1 {
                return Err(ConfError::validation(
                    "files",
                    format!("No other files are allowed with a file of type .{}", ext),
                ));
            }
            return Ok(InputMode::Artifact);
        }

        for file in files {
            let path = file_part(file);
            match extension(path) {
                Some(ext) if SOURCE_EXTENSIONS.contains(&ext) => {}
                _ => {
                    return Err(ConfError::validation(
                        "files",
                        format!(
                            "{} has an unsupported file type; expected one of .sol, .vy, .yul, .tac or .json",
                            path
                        ),
                    ))
                }
            }
        }
        Ok(InputMode::Sources)
    }
}

/// Whether a contract comes from sources or from a prebuilt artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    Source,
    /// No structural layout is ever available
    Artifact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredContract {
    pub name: String,
    pub file: String,
    pub kind: ContractKind,
}

/// Contracts declared through `files`, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractSet {
    contracts: BTreeMap<String, DeclaredContract>,
    /// Input files in declaration order, without contract suffixes
    files: Vec<String>,
}

impl ContractSet {
    /// Parse `path` and `path:Contract` entries
    pub fn from_files(entries: &[String]) -> Result<Self, ConfError> {
        let mut set = ContractSet::default();

        for entry in entries {
            let (file, explicit) = match split_contract_suffix(entry) {
                Some((file, contract)) => (file, Some(contract)),
                None => (entry.as_str(), None),
            };
            let file = normalize_path(file);

            let name = match explicit {
                Some(name) => name.to_string(),
                None => Path::new(&file)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            if !is_contract_name(&name) {
                return Err(ConfError::validation(
                    "files",
                    format!("{} should be a valid contract name", name),
                ));
            }

            let kind = match extension(&file) {
                Some(ext) if ARTIFACT_EXTENSIONS.contains(&ext) => ContractKind::Artifact,
                _ => ContractKind::Source,
            };

            if let Some(existing) = set.contracts.get(&name) {
                if existing.file != file {
                    return Err(ConfError::validation(
                        "files",
                        format!("A contract named {} was declared twice", name),
                    ));
                }
                continue;
            }

            if !set.files.contains(&file) {
                set.files.push(file.clone());
            }
            set.contracts
                .insert(name.clone(), DeclaredContract { name, file, kind });
        }

        Ok(set)
    }

    pub fn from_config(config: &ResolvedConfig) -> Result<Self, ConfError> {
        Self::from_files(config.list("files"))
    }

    pub fn get(&self, name: &str) -> Option<&DeclaredContract> {
        self.contracts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contracts.contains_key(name)
    }

    /// Whether the named contract is backed by a prebuilt artifact
    pub fn is_artifact(&self, name: &str) -> bool {
        self.get(name)
            .map(|c| c.kind == ContractKind::Artifact)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeclaredContract> {
        self.contracts.values()
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Source files, skipping artifacts
    pub fn source_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| {
                extension(f).map_or(false, |ext| SOURCE_EXTENSIONS.contains(&ext))
            })
            .map(String::as_str)
            .collect()
    }

    /// Files declaring the named contract
    pub fn files_of(&self, name: &str) -> Vec<&str> {
        self.get(name).map(|c| vec![c.file.as_str()]).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// `[A-Za-z_$][A-Za-z0-9_$]*`
pub fn is_contract_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn file_part(entry: &str) -> &str {
    split_contract_suffix(entry).map_or(entry, |(file, _)| file)
}

fn extension(path: &str) -> Option<&str> {
    Path::new(path).extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_names_default_to_stem() {
        let set = ContractSet::from_files(&files(&["A.sol", "lib/B.sol:Token"])).unwrap();
        assert!(set.contains("A"));
        assert!(set.contains("Token"));
        assert!(!set.contains("B"));
        assert_eq!(set.get("Token").unwrap().file, "lib/B.sol");
        assert_eq!(set.files(), ["A.sol".to_string(), "lib/B.sol".to_string()]);
    }

    #[test]
    fn test_same_pair_may_repeat() {
        let set = ContractSet::from_files(&files(&["A.sol", "./A.sol:A"])).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_name_declared_twice() {
        let err = ContractSet::from_files(&files(&["a/B.sol", "b/B.sol"])).unwrap_err();
        assert!(err.to_string().contains("A contract named B was declared twice"));
    }

    #[test]
    fn test_invalid_contract_name() {
        let err = ContractSet::from_files(&files(&["my-token.sol"])).unwrap_err();
        assert!(err.to_string().contains("my-token should be a valid contract name"));
    }

    #[test]
    fn test_contract_name_grammar() {
        assert!(is_contract_name("A"));
        assert!(is_contract_name("_x$1"));
        assert!(!is_contract_name("1A"));
        assert!(!is_contract_name(""));
    }

    #[test]
    fn test_artifact_kind() {
        let set = ContractSet::from_files(&files(&["empty.tac"])).unwrap();
        assert!(set.is_artifact("empty"));
        assert!(set.source_files().is_empty());
    }
}
