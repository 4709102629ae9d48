//! The resolved, fully typed configuration

use indexmap::IndexMap;
use prover_attrs::AttrValue;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::layer::{ConfigSource, LayerOrigin};
use super::record::RecordError;

/// One resolved attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEntry {
    /// Typed value, `None` when neither a layer nor the registry supplies one
    pub value: Option<AttrValue>,
    /// Layer that supplied the value
    pub origin: LayerOrigin,
}

/// Immutable configuration with exactly one entry per registered attribute.
///
/// Only constructed by the validator after every check passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, ResolvedEntry>,
    sources: Vec<ConfigSource>,
}

impl ResolvedConfig {
    pub(crate) fn new(entries: BTreeMap<String, ResolvedEntry>, sources: Vec<ConfigSource>) -> Self {
        Self { entries, sources }
    }

    pub fn entry(&self, name: &str) -> Option<&ResolvedEntry> {
        self.entries.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.entries.get(name).and_then(|e| e.value.as_ref())
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(AttrValue::as_str)
    }

    /// List value, empty when unset
    pub fn list(&self, name: &str) -> &[String] {
        self.get(name).and_then(AttrValue::as_list).unwrap_or(&[])
    }

    pub fn map(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.get(name).and_then(AttrValue::as_map)
    }

    /// Boolean value, `false` when unset
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(AttrValue::as_bool).unwrap_or(false)
    }

    pub fn number(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(AttrValue::as_number)
    }

    pub fn origin(&self, name: &str) -> Option<LayerOrigin> {
        self.entries.get(name).map(|e| e.origin)
    }

    /// Whether a non-default layer supplied this attribute
    pub fn is_explicit(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map(|e| e.value.is_some() && e.origin != LayerOrigin::Default)
            .unwrap_or(false)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResolvedEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Copy with one attribute replaced
    pub fn with_value(&self, name: &str, value: Option<AttrValue>, origin: LayerOrigin) -> Self {
        let mut narrowed = self.clone();
        narrowed
            .entries
            .insert(name.to_string(), ResolvedEntry { value, origin });
        narrowed
    }

    /// Attribute values only, `null` for unset attributes
    pub fn values(&self) -> BTreeMap<&str, Option<&AttrValue>> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_ref()))
            .collect()
    }

    /// Compact JSON; identical inputs give identical bytes
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// SHA-256 of the RFC 8785 canonical form of the values
    pub fn config_digest(&self) -> Result<String, RecordError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(&self.values())
            .map_err(|e| RecordError::Jcs(e.to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResolvedConfig {
        let mut entries = BTreeMap::new();
        entries.insert(
            "solc".to_string(),
            ResolvedEntry {
                value: Some(AttrValue::Str("solc5.11".into())),
                origin: LayerOrigin::BaseConf,
            },
        );
        entries.insert(
            "build_only".to_string(),
            ResolvedEntry {
                value: Some(AttrValue::Bool(false)),
                origin: LayerOrigin::Default,
            },
        );
        entries.insert(
            "rule".to_string(),
            ResolvedEntry {
                value: None,
                origin: LayerOrigin::Default,
            },
        );
        ResolvedConfig::new(entries, vec![ConfigSource::builtin()])
    }

    #[test]
    fn test_accessors() {
        let config = sample();
        assert_eq!(config.get_str("solc"), Some("solc5.11"));
        assert!(config.list("rule").is_empty());
        assert!(!config.flag("build_only"));
        assert!(config.is_explicit("solc"));
        assert!(!config.is_explicit("build_only"));
        assert!(!config.is_explicit("rule"));
    }

    #[test]
    fn test_with_value_leaves_original() {
        let config = sample();
        let narrowed = config.with_value(
            "rule",
            Some(AttrValue::List(vec!["r1".into()])),
            LayerOrigin::Cli,
        );
        assert_eq!(narrowed.list("rule"), ["r1".to_string()]);
        assert!(config.list("rule").is_empty());
    }

    #[test]
    fn test_digest_is_stable() {
        let a = sample().config_digest().unwrap();
        let b = sample().config_digest().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(sample().to_json().unwrap(), sample().to_json().unwrap());
    }
}
