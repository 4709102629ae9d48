//! Raw configuration layers with provenance

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::COMMAND_LINE;

/// Origin of a configuration layer, ordered from lowest to highest precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerOrigin {
    Default,
    BaseConf,
    ChildConf,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: LayerOrigin,

    /// File path (None for defaults/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// SHA-256 digest of raw file bytes (None for defaults/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    pub fn builtin() -> Self {
        Self {
            origin: LayerOrigin::Default,
            path: None,
            digest: None,
        }
    }

    pub fn cli() -> Self {
        Self {
            origin: LayerOrigin::Cli,
            path: None,
            digest: None,
        }
    }

    pub fn file(origin: LayerOrigin, path: &Path, digest: String) -> Self {
        Self {
            origin,
            path: Some(path.to_path_buf()),
            digest: Some(digest),
        }
    }

    /// Human-readable location for error messages
    pub fn location(&self) -> String {
        match (&self.path, self.origin) {
            (Some(path), _) => path.display().to_string(),
            (None, LayerOrigin::Cli) => COMMAND_LINE.to_string(),
            (None, _) => "built-in defaults".to_string(),
        }
    }
}

/// Untyped key/value pairs read from one source
#[derive(Debug, Clone, PartialEq)]
pub struct RawLayer {
    pub source: ConfigSource,
    pub entries: BTreeMap<String, Value>,
}

impl RawLayer {
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            entries: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> LayerOrigin {
        self.source.origin
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Build a layer from a JSON object, mostly useful for CLI overrides and tests
    pub fn from_value(source: ConfigSource, value: Value) -> Self {
        let entries = match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        Self { source, entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_precedence_order() {
        assert!(LayerOrigin::Default < LayerOrigin::BaseConf);
        assert!(LayerOrigin::BaseConf < LayerOrigin::ChildConf);
        assert!(LayerOrigin::ChildConf < LayerOrigin::Cli);
    }

    #[test]
    fn test_origin_serializes_camel_case() {
        let json = serde_json::to_string(&LayerOrigin::ChildConf).unwrap();
        assert_eq!(json, "\"childConf\"");
    }

    #[test]
    fn test_location() {
        assert_eq!(ConfigSource::cli().location(), COMMAND_LINE);
        let source = ConfigSource::file(LayerOrigin::BaseConf, Path::new("base.conf"), "ab".into());
        assert_eq!(source.location(), "base.conf");
    }
}
