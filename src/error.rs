//! Error taxonomy for configuration resolution
//!
//! Every variant is a user-input error. Nothing here is retried; the caller
//! fixes the input and resolves again from a clean state.

use serde::Serialize;
use std::path::PathBuf;

/// Where a command-line value came from, for error reporting
pub const COMMAND_LINE: &str = "command line";

/// Configuration resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfError {
    #[error("Error when reading {}: {reason}", .file.display())]
    ConfigParse {
        file: PathBuf,
        key: Option<String>,
        reason: String,
    },

    #[error("{reason}")]
    ConfigNesting {
        file: Option<PathBuf>,
        reason: String,
    },

    #[error("Error when reading {location}: {key} is not a known attribute")]
    UnknownAttribute { key: String, location: String },

    #[error("attribute/flag '{attr}': {reason}")]
    DuplicateKey {
        attr: String,
        key: String,
        reason: String,
    },

    #[error("attribute/flag '{attr}': {reason}")]
    AttributeValidation { attr: String, reason: String },

    #[error("compiler map flags cannot be set with other compiler flags (got {})", .flags.join(", "))]
    MixedCompilerFlags { flags: Vec<String> },

    #[error("The following files are not matched in {attr}: {files:?}")]
    UnmatchedSourceFiles { attr: String, files: Vec<String> },

    #[error("'{attr}' argument {directive} must be of the form {expected}")]
    LinkSyntax {
        attr: String,
        directive: String,
        expected: String,
    },

    #[error("Error in {attr}: `{directive}`, contract {contract} does not exist")]
    UnknownContract {
        attr: String,
        directive: String,
        contract: String,
    },

    #[error("Error in {attr}: slot {contract}:{slot} was defined multiple times ({first} and {second})")]
    SlotConflict {
        attr: String,
        contract: String,
        slot: String,
        first: String,
        second: String,
    },

    #[error("contract {contract} was given two different addresses ({first} and {second})")]
    DuplicateAddress {
        contract: String,
        first: String,
        second: String,
    },

    #[error("'{attr}' argument {directive} is illegal: contract {contract} has no structural layout")]
    IllegalLinkTarget {
        attr: String,
        directive: String,
        contract: String,
    },

    #[error("Error in linkage: {attr} {contract}:{slot}, variable {slot} does not exist in contract {contract}")]
    UndeclaredField {
        attr: String,
        contract: String,
        slot: String,
    },

    #[error("Failed to get rules: no rule of {discovered} discovered rules is left after filtering")]
    EmptyRuleSet { discovered: usize },
}

/// Taxonomy name of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ConfigParseError")]
    ConfigParse,
    #[serde(rename = "ConfigNestingError")]
    ConfigNesting,
    #[serde(rename = "UnknownAttributeError")]
    UnknownAttribute,
    #[serde(rename = "DuplicateKeyError")]
    DuplicateKey,
    #[serde(rename = "AttributeValidationError")]
    AttributeValidation,
    #[serde(rename = "MixedCompilerFlagsError")]
    MixedCompilerFlags,
    #[serde(rename = "UnmatchedSourceFilesError")]
    UnmatchedSourceFiles,
    #[serde(rename = "LinkSyntaxError")]
    LinkSyntax,
    #[serde(rename = "UnknownContractError")]
    UnknownContract,
    #[serde(rename = "SlotConflictError")]
    SlotConflict,
    #[serde(rename = "DuplicateAddressError")]
    DuplicateAddress,
    #[serde(rename = "IllegalLinkTargetError")]
    IllegalLinkTarget,
    #[serde(rename = "UndeclaredFieldError")]
    UndeclaredField,
    #[serde(rename = "EmptyRuleSetError")]
    EmptyRuleSet,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigParse => "ConfigParseError",
            ErrorKind::ConfigNesting => "ConfigNestingError",
            ErrorKind::UnknownAttribute => "UnknownAttributeError",
            ErrorKind::DuplicateKey => "DuplicateKeyError",
            ErrorKind::AttributeValidation => "AttributeValidationError",
            ErrorKind::MixedCompilerFlags => "MixedCompilerFlagsError",
            ErrorKind::UnmatchedSourceFiles => "UnmatchedSourceFilesError",
            ErrorKind::LinkSyntax => "LinkSyntaxError",
            ErrorKind::UnknownContract => "UnknownContractError",
            ErrorKind::SlotConflict => "SlotConflictError",
            ErrorKind::DuplicateAddress => "DuplicateAddressError",
            ErrorKind::IllegalLinkTarget => "IllegalLinkTargetError",
            ErrorKind::UndeclaredField => "UndeclaredFieldError",
            ErrorKind::EmptyRuleSet => "EmptyRuleSetError",
        }
    }
}

/// Structured error surfaced to the end user
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ConfError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfError::ConfigParse { .. } => ErrorKind::ConfigParse,
            ConfError::ConfigNesting { .. } => ErrorKind::ConfigNesting,
            ConfError::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            ConfError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            ConfError::AttributeValidation { .. } => ErrorKind::AttributeValidation,
            ConfError::MixedCompilerFlags { .. } => ErrorKind::MixedCompilerFlags,
            ConfError::UnmatchedSourceFiles { .. } => ErrorKind::UnmatchedSourceFiles,
            ConfError::LinkSyntax { .. } => ErrorKind::LinkSyntax,
            ConfError::UnknownContract { .. } => ErrorKind::UnknownContract,
            ConfError::SlotConflict { .. } => ErrorKind::SlotConflict,
            ConfError::DuplicateAddress { .. } => ErrorKind::DuplicateAddress,
            ConfError::IllegalLinkTarget { .. } => ErrorKind::IllegalLinkTarget,
            ConfError::UndeclaredField { .. } => ErrorKind::UndeclaredField,
            ConfError::EmptyRuleSet { .. } => ErrorKind::EmptyRuleSet,
        }
    }

    /// The offending attribute or key, when there is one
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfError::ConfigParse { key, .. } => key.as_deref(),
            ConfError::ConfigNesting { .. } => None,
            ConfError::UnknownAttribute { key, .. } => Some(key),
            ConfError::DuplicateKey { attr, .. } | ConfError::AttributeValidation { attr, .. } => {
                Some(attr)
            }
            ConfError::MixedCompilerFlags { flags } => flags.first().map(String::as_str),
            ConfError::UnmatchedSourceFiles { attr, .. }
            | ConfError::LinkSyntax { attr, .. }
            | ConfError::UnknownContract { attr, .. }
            | ConfError::SlotConflict { attr, .. }
            | ConfError::IllegalLinkTarget { attr, .. }
            | ConfError::UndeclaredField { attr, .. } => Some(attr),
            ConfError::DuplicateAddress { .. } => Some("address"),
            ConfError::EmptyRuleSet { .. } => Some("rule"),
        }
    }

    /// The file the error originated in, when there is one
    pub fn file(&self) -> Option<String> {
        match self {
            ConfError::ConfigParse { file, .. } => Some(file.display().to_string()),
            ConfError::ConfigNesting { file, .. } => file.as_ref().map(|f| f.display().to_string()),
            ConfError::UnknownAttribute { location, .. } => Some(location.clone()),
            _ => None,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
            key: self.key().map(str::to_string),
            file: self.file(),
        }
    }

    pub(crate) fn validation(attr: &str, reason: impl Into<String>) -> Self {
        ConfError::AttributeValidation {
            attr: attr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Every error found by one pass over independent checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_all(.errors))]
pub struct PlanError {
    pub errors: Vec<ConfError>,
}

fn render_all(errors: &[ConfError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl PlanError {
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.errors.iter().map(ConfError::report).collect()
    }
}

impl From<ConfError> for PlanError {
    fn from(error: ConfError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}
