//! Compiler map resolution
//!
//! Assigns each declared source file exactly one compiler (and optionally
//! an optimizer run count). A pattern map entry is an exact path, a bare
//! contract name, a directory glob (`dir/*.sol`) or a global glob
//! (`**/*.sol`); the most specific match wins and ties go to the first
//! declared entry.

use globset::{GlobBuilder, GlobMatcher};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::{LayerOrigin, ResolvedConfig};
use crate::error::ConfError;
use crate::validate::{is_contract_name, normalize_path, ContractSet};

const DEFAULT_SOLC: &str = "solc";
const DEFAULT_VYPER: &str = "vyper";

/// Pattern specificity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PatternKind {
    /// Contains `**`
    Global,
    /// Glob without `**`
    DirGlob,
    /// Exact path or contract name
    Exact,
}

impl PatternKind {
    pub fn classify(pattern: &str) -> Self {
        if pattern.contains("**") {
            PatternKind::Global
        } else if pattern.contains(['*', '?', '[', '{']) {
            PatternKind::DirGlob
        } else {
            PatternKind::Exact
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Path(String),
    Contract(Vec<String>),
    Glob(GlobMatcher),
}

#[derive(Debug, Clone)]
struct MapEntry {
    pattern: String,
    value: String,
    kind: PatternKind,
    matcher: Matcher,
}

impl MapEntry {
    fn matches(&self, file: &str) -> bool {
        match &self.matcher {
            Matcher::Path(path) => path == file,
            Matcher::Contract(files) => files.iter().any(|f| f == file),
            Matcher::Glob(glob) => glob.is_match(file),
        }
    }
}

/// Ordered pattern map for one attribute
#[derive(Debug, Clone)]
pub struct PatternMap {
    attr: String,
    entries: Vec<MapEntry>,
}

impl PatternMap {
    /// Compile a pattern map. Bare contract names match the files declaring them.
    pub fn new(
        attr: &str,
        map: &IndexMap<String, String>,
        contracts: &ContractSet,
    ) -> Result<Self, ConfError> {
        let mut entries = Vec::with_capacity(map.len());
        for (pattern, value) in map {
            let kind = PatternKind::classify(pattern);
            let matcher = match kind {
                PatternKind::Exact if is_contract_name(pattern) => {
                    Matcher::Contract(
                        contracts
                            .files_of(pattern)
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    )
                }
                PatternKind::Exact => Matcher::Path(normalize_path(pattern)),
                PatternKind::DirGlob | PatternKind::Global => {
                    let glob = GlobBuilder::new(&normalize_path(pattern))
                        .literal_separator(true)
                        .build()
                        .map_err(|e| {
                            ConfError::validation(attr, format!("invalid pattern {}: {}", pattern, e))
                        })?;
                    Matcher::Glob(glob.compile_matcher())
                }
            };
            entries.push(MapEntry {
                pattern: pattern.clone(),
                value: value.clone(),
                kind,
                matcher,
            });
        }

        Ok(Self {
            attr: attr.to_string(),
            entries,
        })
    }

    /// Most specific matching value for one file
    pub fn select(&self, file: &str) -> Option<&str> {
        let mut best: Option<&MapEntry> = None;
        for entry in self.entries.iter().filter(|e| e.matches(file)) {
            if best.map_or(true, |b| entry.kind > b.kind) {
                best = Some(entry);
            }
        }
        best.map(|entry| {
            debug!(file, pattern = %entry.pattern, attr = %self.attr, "pattern selected");
            entry.value.as_str()
        })
    }

    /// Assign a value to every file, failing once with every unmatched file
    pub fn resolve(&self, files: &[&str]) -> Result<BTreeMap<String, String>, ConfError> {
        let mut resolved = BTreeMap::new();
        let mut unmatched = Vec::new();

        for file in files {
            match self.select(file) {
                Some(value) => {
                    resolved.insert(file.to_string(), value.to_string());
                }
                None => unmatched.push(file.to_string()),
            }
        }

        if unmatched.is_empty() {
            return Ok(resolved);
        }
        unmatched.sort();
        Err(ConfError::UnmatchedSourceFiles {
            attr: self.attr.clone(),
            files: unmatched,
        })
    }
}

/// Compiler per source file
pub fn resolve_compilers(
    config: &ResolvedConfig,
    contracts: &ContractSet,
) -> Result<BTreeMap<String, String>, ConfError> {
    let single: Vec<&str> = ["solc", "vyper"]
        .into_iter()
        .filter(|name| is_explicit(config, name))
        .collect();
    let maps: Vec<&str> = ["compiler_map", "solc_map"]
        .into_iter()
        .filter(|name| is_explicit(config, name))
        .collect();

    if !single.is_empty() && !maps.is_empty() {
        return Err(ConfError::MixedCompilerFlags {
            flags: single.iter().chain(&maps).map(|s| s.to_string()).collect(),
        });
    }

    let files = contracts.source_files();
    if let Some(attr) = maps.first() {
        let map = config.map(attr).cloned().unwrap_or_default();
        return PatternMap::new(attr, &map, contracts)?.resolve(&files);
    }

    let solc = config.get_str("solc").unwrap_or(DEFAULT_SOLC);
    let vyper = config.get_str("vyper").unwrap_or(DEFAULT_VYPER);
    Ok(files
        .into_iter()
        .map(|file| {
            let is_vyper = Path::new(file).extension().and_then(|e| e.to_str()) == Some("vy");
            let compiler = if is_vyper { vyper } else { solc };
            (file.to_string(), compiler.to_string())
        })
        .collect())
}

/// Optimizer runs per source file; empty when the optimizer is off
pub fn resolve_optimize_runs(
    config: &ResolvedConfig,
    contracts: &ContractSet,
) -> Result<BTreeMap<String, u64>, ConfError> {
    let files = contracts.source_files();

    if let Some(map) = config.map("solc_optimize_map").filter(|m| !m.is_empty()) {
        let resolved = PatternMap::new("solc_optimize_map", map, contracts)?.resolve(&files)?;
        return resolved
            .into_iter()
            .map(|(file, runs)| {
                runs.parse::<u64>().map(|runs| (file, runs)).map_err(|_| {
                    ConfError::validation(
                        "solc_optimize_map",
                        format!("optimizer runs must be a non-negative integer, got '{}'", runs),
                    )
                })
            })
            .collect();
    }

    Ok(match config.number("solc_optimize") {
        Some(runs) => files.into_iter().map(|f| (f.to_string(), runs)).collect(),
        None => BTreeMap::new(),
    })
}

fn is_explicit(config: &ResolvedConfig, name: &str) -> bool {
    let set = match config.get(name) {
        Some(value) => value.as_map().map_or(true, |m| !m.is_empty()),
        None => false,
    };
    set && config.origin(name) != Some(LayerOrigin::Default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contracts(files: &[&str]) -> ContractSet {
        let files: Vec<String> = files.iter().map(|f| f.to_string()).collect();
        ContractSet::from_files(&files).unwrap()
    }

    fn map(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify() {
        assert_eq!(PatternKind::classify("A.sol"), PatternKind::Exact);
        assert_eq!(PatternKind::classify("dir1/*.sol"), PatternKind::DirGlob);
        assert_eq!(PatternKind::classify("**/*.sol"), PatternKind::Global);
        assert!(PatternKind::Exact > PatternKind::DirGlob);
        assert!(PatternKind::DirGlob > PatternKind::Global);
    }

    #[test]
    fn test_specificity_wins() {
        let set = contracts(&["A.sol", "B.sol", "dir1/A.sol:A1"]);
        let patterns = PatternMap::new(
            "compiler_map",
            &map(&[
                ("A.sol", "v1"),
                ("B.sol", "v2"),
                ("dir1/*.sol", "v3"),
                ("**/*.sol", "v4"),
            ]),
            &set,
        )
        .unwrap();

        let resolved = patterns.resolve(&set.source_files()).unwrap();
        assert_eq!(resolved["A.sol"], "v1");
        assert_eq!(resolved["B.sol"], "v2");
        assert_eq!(resolved["dir1/A.sol"], "v3");
    }

    #[test]
    fn test_global_glob_is_fallback() {
        let set = contracts(&["A.sol", "dir1/dir2/C.sol"]);
        let patterns = PatternMap::new("compiler_map", &map(&[("**/*.sol", "v4")]), &set).unwrap();
        let resolved = patterns.resolve(&set.source_files()).unwrap();
        assert_eq!(resolved["dir1/dir2/C.sol"], "v4");
        assert_eq!(resolved["A.sol"], "v4");
    }

    #[test]
    fn test_dir_glob_does_not_cross_directories() {
        let set = contracts(&["dir1/sub/A.sol"]);
        let patterns = PatternMap::new("compiler_map", &map(&[("dir1/*.sol", "v3")]), &set).unwrap();
        let err = patterns.resolve(&set.source_files()).unwrap_err();
        assert!(matches!(err, ConfError::UnmatchedSourceFiles { .. }));
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let set = contracts(&["dir1/A.sol"]);
        let patterns = PatternMap::new(
            "compiler_map",
            &map(&[("dir1/*.sol", "first"), ("dir1/A.*", "second")]),
            &set,
        )
        .unwrap();
        assert_eq!(patterns.select("dir1/A.sol"), Some("first"));
    }

    #[test]
    fn test_equivalent_paths_match() {
        let set = contracts(&["A.sol", "./dir1/sub/../B.sol"]);
        let patterns = PatternMap::new(
            "solc_map",
            &map(&[("dir1/../A.sol", "solc6.10"), ("./dir1/./*.sol", "solc8.1")]),
            &set,
        )
        .unwrap();
        let resolved = patterns.resolve(&set.source_files()).unwrap();
        assert_eq!(resolved["A.sol"], "solc6.10");
        assert_eq!(resolved["dir1/B.sol"], "solc8.1");
    }

    #[test]
    fn test_contract_name_key() {
        let set = contracts(&["src/Token.sol", "src/Vault.sol"]);
        let patterns = PatternMap::new(
            "compiler_map",
            &map(&[("Token", "solc8.1"), ("**/*.sol", "solc7.6")]),
            &set,
        )
        .unwrap();
        let resolved = patterns.resolve(&set.source_files()).unwrap();
        assert_eq!(resolved["src/Token.sol"], "solc8.1");
        assert_eq!(resolved["src/Vault.sol"], "solc7.6");
    }

    #[test]
    fn test_unmatched_files_collected_and_sorted() {
        let set = contracts(&["D.sol", "A.sol", "C.sol"]);
        let patterns = PatternMap::new("compiler_map", &map(&[("A.sol", "v1")]), &set).unwrap();
        let err = patterns.resolve(&set.source_files()).unwrap_err();
        assert_eq!(
            err,
            ConfError::UnmatchedSourceFiles {
                attr: "compiler_map".to_string(),
                files: vec!["C.sol".to_string(), "D.sol".to_string()],
            }
        );
    }
}
