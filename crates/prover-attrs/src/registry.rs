//! The attribute table
//!
//! Built once at startup and passed by reference to every component that
//! needs it. Declaration order is significant: validation failures are
//! reported for the first failing attribute in this order.

use std::collections::HashMap;

use crate::attribute::{AttributeDefinition as Attr, ExclusionGroup, PathKind, Validation};
use crate::AttrValue;

/// Group of single-version compiler flags vs compiler pattern maps
pub const COMPILER_GROUP: &str = "compiler";

/// Source file extensions accepted by the compilers
pub const SOURCE_EXTENSIONS: &[&str] = &["sol", "vy", "yul"];

/// Extensions of prebuilt artifacts without a structural layout
pub const ARTIFACT_EXTENSIONS: &[&str] = &["tac", "json"];

const EVM_VERSIONS: &[&str] = &[
    "homestead",
    "tangerineWhistle",
    "spuriousDragon",
    "byzantium",
    "constantinople",
    "petersburg",
    "istanbul",
    "berlin",
    "london",
    "paris",
    "shanghai",
    "cancun",
    "prague",
];

const SERVERS: &[&str] = &["production", "staging", "vaas-dev", "vaas-stg"];

/// Longest accepted timeout, one day
const MAX_TIMEOUT_SECONDS: u64 = 86_400;

/// Registry consistency errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("attribute '{0}' is declared twice")]
    DuplicateAttribute(String),

    #[error("attribute '{attr}' names unknown exclusion group '{group}'")]
    UnknownGroup { attr: String, group: String },

    #[error("exclusion group '{group}' lists '{attr}', which does not declare the group")]
    StrayGroupMember { group: String, attr: String },

    #[error("attribute '{attr}' references unknown attribute '{target}'")]
    DanglingReference { attr: String, target: String },
}

/// Read-only table of every recognized configuration key
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    attributes: Vec<Attr>,
    index: HashMap<&'static str, usize>,
    groups: Vec<ExclusionGroup>,
}

impl AttributeRegistry {
    /// Build a registry from a declarative list
    pub fn from_parts(attributes: Vec<Attr>, groups: Vec<ExclusionGroup>) -> Self {
        let index = attributes
            .iter()
            .enumerate()
            .map(|(i, attr)| (attr.name, i))
            .collect();
        Self {
            attributes,
            index,
            groups,
        }
    }

    /// The attribute set understood by the prover run
    pub fn standard() -> Self {
        let attributes = vec![
            // Inputs
            Attr::list("files", "Source files, optionally as path:Contract, or one artifact file")
                .positional()
                .validate(Validation::Files)
                .paths(PathKind::FileWithContract),
            Attr::string("verify", "Contract and spec to verify, as Contract:path.spec")
                .validate(Validation::VerifyTarget)
                .paths(PathKind::ContractPrefixed),
            Attr::list("bytecode_jsons", "Bytecode JSON inputs")
                .validate(Validation::Requires("bytecode_spec"))
                .paths(PathKind::Plain),
            Attr::string("bytecode_spec", "Spec used with bytecode_jsons")
                .validate(Validation::Requires("bytecode_jsons"))
                .paths(PathKind::Plain),
            Attr::string("msg", "Message attached to the run")
                .validate(Validation::NoCurlyQuotes),
            // Rule selection
            Attr::list("rule", "Rules to verify (glob patterns)")
                .validate(Validation::RuleFilter),
            Attr::list("exclude_rule", "Rules to skip (glob patterns)")
                .validate(Validation::RuleFilter),
            Attr::list("split_rules", "Rules to run in their own job (glob patterns)")
                .validate(Validation::RuleFilter),
            Attr::string("group_id", "Correlation identifier shared by split runs")
                .validate(Validation::Uuid),
            // Compilers
            Attr::string("solc", "Solidity compiler executable")
                .validate(Validation::CompilerExecutable)
                .group(COMPILER_GROUP),
            Attr::string("vyper", "Vyper compiler executable")
                .validate(Validation::CompilerExecutable)
                .group(COMPILER_GROUP),
            Attr::mapping("compiler_map", "Compiler per source pattern, as pattern=compiler")
                .validate(Validation::CompilerMapKeys)
                .group(COMPILER_GROUP)
                .paths(PathKind::MapKeys),
            Attr::mapping("solc_map", "Alias of compiler_map for Solidity sources")
                .validate(Validation::CompilerMapKeys)
                .validate(Validation::ConflictsWith("compiler_map"))
                .group(COMPILER_GROUP)
                .paths(PathKind::MapKeys),
            Attr::number("solc_optimize", "Enable the optimizer, optionally with a run count")
                .optional_value("200")
                .group("optimize"),
            Attr::mapping("solc_optimize_map", "Optimizer runs per source pattern")
                .validate(Validation::CompilerMapKeys)
                .validate(Validation::OptimizeRuns)
                .group("optimize")
                .paths(PathKind::MapKeys),
            Attr::boolean("solc_via_ir", "Compile through the IR pipeline"),
            Attr::string("solc_evm_version", "Target EVM version")
                .validate(Validation::OneOf(EVM_VERSIONS)),
            Attr::string("solc_allow_path", "Extra path the compiler may read")
                .paths(PathKind::Plain),
            Attr::list("packages", "Package remappings, as name=path")
                .validate(Validation::KeyedList { separator: '=' })
                .paths(PathKind::KeyValue),
            Attr::string("packages_path", "Directory holding packages")
                .validate(Validation::ExistingPath)
                .paths(PathKind::Plain),
            // Linkage
            Attr::list("link", "Storage links, as Contract:slot=target"),
            Attr::list("struct_link", "Struct field links, as Contract:slot=target"),
            Attr::list("address", "Fixed contract addresses, as Contract:number"),
            Attr::list("parametric_contracts", "Contracts checked by parametric rules")
                .validate(Validation::KnownContracts),
            // Run control
            Attr::boolean("build_only", "Stop after building").group("build_mode"),
            Attr::boolean("compilation_steps_only", "Stop after compilation").group("build_mode"),
            Attr::boolean("disable_local_typechecking", "Skip local spec typechecking"),
            Attr::boolean("optimistic_loop", "Assume loops exit within loop_iter iterations"),
            Attr::number("loop_iter", "Loop unrolling bound")
                .validate(Validation::Range { min: 0, max: 1_000 }),
            Attr::number("smt_timeout", "Per-query solver timeout in seconds")
                .validate(Validation::Range { min: 0, max: MAX_TIMEOUT_SECONDS }),
            Attr::number("global_timeout", "Overall run timeout in seconds")
                .validate(Validation::Range { min: 0, max: MAX_TIMEOUT_SECONDS }),
            Attr::number("cloud_global_timeout", "Reserved for the service").validate(
                Validation::Forbidden(
                    "Cannot set the global timeout for the cloud. Use 'global_timeout' instead",
                ),
            ),
            Attr::boolean("precise_bitwise_ops", "Model bitwise operations precisely"),
            Attr::string("prover_args", "Extra arguments passed to the prover")
                .validate(Validation::ProverArgs),
            // Submission
            Attr::string("server", "Verification service")
                .default_value(AttrValue::Str("production".to_string()))
                .validate(Validation::OneOf(SERVERS)),
            Attr::string("prover_version", "Prover branch to run").group("prover_target"),
            Attr::string("commit_sha1", "Prover commit to run").group("prover_target"),
        ];

        let groups = vec![
            ExclusionGroup::new(
                COMPILER_GROUP,
                vec![vec!["solc", "vyper"], vec!["compiler_map", "solc_map"]],
                "compiler map flags cannot be set with other compiler flags",
            ),
            ExclusionGroup::new(
                "optimize",
                vec![vec!["solc_optimize"], vec!["solc_optimize_map"]],
                "You cannot use both 'solc_optimize' and 'solc_optimize_map' arguments",
            ),
            ExclusionGroup::new(
                "build_mode",
                vec![vec!["compilation_steps_only"], vec!["build_only"]],
                "cannot use both 'compilation_steps_only' and 'build_only'",
            ),
            ExclusionGroup::new(
                "prover_target",
                vec![vec!["prover_version"], vec!["commit_sha1"]],
                "Cannot run on both a specific branch and a specific commit",
            ),
        ];

        Self::from_parts(attributes, groups)
    }

    pub fn get(&self, name: &str) -> Option<&Attr> {
        self.index.get(name).map(|&i| &self.attributes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declaration position, used for deterministic error ordering
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Attributes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn groups(&self) -> &[ExclusionGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&ExclusionGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Attribute supplied by positional tokens, if any
    pub fn positional(&self) -> Option<&Attr> {
        self.attributes.iter().find(|a| a.positional)
    }

    /// Check that names are unique and every cross reference resolves
    pub fn check_consistency(&self) -> Result<(), RegistryError> {
        if self.index.len() != self.attributes.len() {
            let mut seen = std::collections::HashSet::new();
            for attr in &self.attributes {
                if !seen.insert(attr.name) {
                    return Err(RegistryError::DuplicateAttribute(attr.name.to_string()));
                }
            }
        }

        for attr in &self.attributes {
            if let Some(group_id) = attr.exclusion_group {
                let group = self.group(group_id).ok_or_else(|| RegistryError::UnknownGroup {
                    attr: attr.name.to_string(),
                    group: group_id.to_string(),
                })?;
                if group.side_of(attr.name).is_none() {
                    return Err(RegistryError::StrayGroupMember {
                        group: group_id.to_string(),
                        attr: attr.name.to_string(),
                    });
                }
            }
            for validation in &attr.validations {
                if let Validation::Requires(target) | Validation::ConflictsWith(target) = validation {
                    if !self.contains(target) {
                        return Err(RegistryError::DanglingReference {
                            attr: attr.name.to_string(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        for group in &self.groups {
            for member in group.members() {
                let declared = self.get(member).and_then(|a| a.exclusion_group);
                if declared != Some(group.id) {
                    return Err(RegistryError::StrayGroupMember {
                        group: group.id.to_string(),
                        attr: member.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
