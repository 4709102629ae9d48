//! Attribute definitions
//!
//! An attribute definition is immutable once the registry is built. The
//! validation strategies form a closed set so that every strategy can be
//! dispatched explicitly and tested on its own.

use serde::Serialize;

use crate::AttrValue;

/// Declared kind of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrKind {
    String,
    StringList,
    Mapping,
    Boolean,
    Number,
}

impl AttrKind {
    /// Name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            AttrKind::String => "a string",
            AttrKind::StringList => "a list",
            AttrKind::Mapping => "a map",
            AttrKind::Boolean => "a boolean",
            AttrKind::Number => "a number",
        }
    }
}

/// How path-valued attributes embed their paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Not a path
    #[default]
    None,
    /// The whole value is a path
    Plain,
    /// `path` or `path:Contract`
    FileWithContract,
    /// `Contract:path`
    ContractPrefixed,
    /// `name=path`
    KeyValue,
    /// Mapping whose keys are paths or path patterns
    MapKeys,
}

/// Validation strategy attached to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", content = "arg", rename_all = "snake_case")]
pub enum Validation {
    /// Value must be one of the listed strings
    OneOf(&'static [&'static str]),
    /// Inclusive numeric range
    Range { min: u64, max: u64 },
    /// Compiler executable name, never a source file
    CompilerExecutable,
    /// Compiler map keys name sources, globs or contracts
    CompilerMapKeys,
    /// Optimizer map values are run counts
    OptimizeRuns,
    /// List of `key<sep>value` entries, one value per key
    KeyedList { separator: char },
    /// Path must exist relative to the working tree
    ExistingPath,
    /// Rejects typographic quotation marks
    NoCurlyQuotes,
    /// Value must be a UUID
    Uuid,
    /// The named attribute must also be set
    Requires(&'static str),
    /// The named attribute must not be set
    ConflictsWith(&'static str),
    /// The attribute may never be set
    Forbidden(&'static str),
    /// Free-form prover arguments
    ProverArgs,
    /// Rule selection needs a spec
    RuleFilter,
    /// Input files and the input mode they select
    Files,
    /// `Contract:spec` against the declared contracts
    VerifyTarget,
    /// Every entry names a declared contract
    KnownContracts,
}

/// A mutual-exclusion group
///
/// Attributes on different sides of a group cannot both be set from a
/// non-default layer. Attributes on the same side may be combined.
#[derive(Debug, Clone, Serialize)]
pub struct ExclusionGroup {
    pub id: &'static str,
    pub sides: Vec<Vec<&'static str>>,
    pub reason: &'static str,
}

impl ExclusionGroup {
    pub fn new(id: &'static str, sides: Vec<Vec<&'static str>>, reason: &'static str) -> Self {
        Self { id, sides, reason }
    }

    /// Index of the side the attribute belongs to
    pub fn side_of(&self, name: &str) -> Option<usize> {
        self.sides.iter().position(|side| side.contains(&name))
    }

    pub fn members(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sides.iter().flat_map(|side| side.iter().copied())
    }
}

/// Definition of one recognized configuration key
#[derive(Debug, Clone, Serialize)]
pub struct AttributeDefinition {
    pub name: &'static str,
    pub kind: AttrKind,
    pub help: &'static str,
    pub default: Option<AttrValue>,
    pub validations: Vec<Validation>,
    pub exclusion_group: Option<&'static str>,
    pub path_kind: PathKind,
    /// Supplied as positional command-line tokens rather than a flag
    pub positional: bool,
    /// Value used when the flag is given without one
    pub missing_value: Option<&'static str>,
}

impl AttributeDefinition {
    pub fn new(name: &'static str, kind: AttrKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            help,
            default: None,
            validations: Vec::new(),
            exclusion_group: None,
            path_kind: PathKind::None,
            positional: false,
            missing_value: None,
        }
    }

    pub fn string(name: &'static str, help: &'static str) -> Self {
        Self::new(name, AttrKind::String, help)
    }

    pub fn list(name: &'static str, help: &'static str) -> Self {
        Self::new(name, AttrKind::StringList, help)
    }

    pub fn mapping(name: &'static str, help: &'static str) -> Self {
        Self::new(name, AttrKind::Mapping, help)
    }

    /// Boolean attributes default to `false`
    pub fn boolean(name: &'static str, help: &'static str) -> Self {
        Self::new(name, AttrKind::Boolean, help).default_value(AttrValue::Bool(false))
    }

    pub fn number(name: &'static str, help: &'static str) -> Self {
        Self::new(name, AttrKind::Number, help)
    }

    pub fn default_value(mut self, value: AttrValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn validate(mut self, validation: Validation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn group(mut self, id: &'static str) -> Self {
        self.exclusion_group = Some(id);
        self
    }

    pub fn paths(mut self, kind: PathKind) -> Self {
        self.path_kind = kind;
        self
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn optional_value(mut self, missing: &'static str) -> Self {
        self.missing_value = Some(missing);
        self
    }

    /// Command-line flag text, `None` for positional attributes
    pub fn flag(&self) -> Option<String> {
        if self.positional {
            None
        } else {
            Some(format!("--{}", self.name))
        }
    }
}
