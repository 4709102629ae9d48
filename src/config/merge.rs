//! Configuration merge logic
//!
//! Layers are combined per key, lowest precedence first:
//! built-in defaults → base config → child config → command line.
//! A key's value is taken whole from the highest layer defining it; lists
//! and maps are replaced, never combined.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::layer::{ConfigSource, LayerOrigin, RawLayer};

/// Meta-key requesting a base configuration beneath the current file
pub const OVERRIDE_BASE_CONFIG: &str = "override_base_config";

/// Keys that steer loading and never reach the typed configuration
pub const META_KEYS: &[&str] = &[OVERRIDE_BASE_CONFIG];

/// A merged value and the layer that supplied it
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntry {
    pub value: Value,
    pub origin: LayerOrigin,
    /// File path or other description of the supplying layer
    pub location: String,
}

/// Result of merging all layers
#[derive(Debug, Clone, PartialEq)]
pub struct MergedLayers {
    pub entries: BTreeMap<String, MergedEntry>,
    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl MergedLayers {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn origin(&self, key: &str) -> Option<LayerOrigin> {
        self.entries.get(key).map(|e| e.origin)
    }
}

/// Merge layers in precedence order (last has highest precedence).
///
/// Layers are stably ordered by origin first, so a caller passing them out
/// of order still gets the documented precedence.
pub fn merge_layers(layers: &[RawLayer]) -> MergedLayers {
    let mut ordered: Vec<&RawLayer> = layers.iter().collect();
    ordered.sort_by_key(|layer| layer.origin());

    let mut entries: BTreeMap<String, MergedEntry> = BTreeMap::new();
    let mut sources = Vec::with_capacity(ordered.len());

    for layer in ordered {
        let location = layer.source.location();
        for (key, value) in &layer.entries {
            if META_KEYS.contains(&key.as_str()) {
                continue;
            }
            let entry = MergedEntry {
                value: value.clone(),
                origin: layer.origin(),
                location: location.clone(),
            };
            if let Some(shadowed) = entries.insert(key.clone(), entry) {
                debug!(
                    key = %key,
                    from = ?shadowed.origin,
                    to = ?layer.origin(),
                    "configuration value overridden"
                );
            }
        }
        sources.push(layer.source.clone());
    }

    MergedLayers { entries, sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn layer(origin: LayerOrigin, value: Value) -> RawLayer {
        let source = match origin {
            LayerOrigin::Default => ConfigSource::builtin(),
            LayerOrigin::Cli => ConfigSource::cli(),
            LayerOrigin::BaseConf => ConfigSource::file(origin, Path::new("base.conf"), "0".into()),
            LayerOrigin::ChildConf => {
                ConfigSource::file(origin, Path::new("child.conf"), "1".into())
            }
        };
        RawLayer::from_value(source, value)
    }

    #[test]
    fn test_scalar_override() {
        let merged = merge_layers(&[
            layer(LayerOrigin::BaseConf, json!({"solc": "solc5.11"})),
            layer(LayerOrigin::Cli, json!({"solc": "solc6.10"})),
        ]);
        assert_eq!(merged.get("solc"), Some(&json!("solc6.10")));
        assert_eq!(merged.origin("solc"), Some(LayerOrigin::Cli));
    }

    #[test]
    fn test_base_value_survives_when_not_shadowed() {
        let merged = merge_layers(&[
            layer(LayerOrigin::Default, json!({"server": "production"})),
            layer(LayerOrigin::BaseConf, json!({"solc": "solc5.11"})),
            layer(LayerOrigin::ChildConf, json!({"verify": "A:a.spec"})),
            layer(LayerOrigin::Cli, json!({})),
        ]);
        assert_eq!(merged.get("solc"), Some(&json!("solc5.11")));
        assert_eq!(merged.origin("solc"), Some(LayerOrigin::BaseConf));
        assert_eq!(merged.entries["solc"].location, "base.conf");
        assert_eq!(merged.origin("server"), Some(LayerOrigin::Default));
    }

    #[test]
    fn test_map_is_replaced_not_combined() {
        let merged = merge_layers(&[
            layer(LayerOrigin::BaseConf, json!({"solc_map": {"A": "v1", "B": "v2"}})),
            layer(LayerOrigin::ChildConf, json!({"solc_map": {"A": "v3"}})),
        ]);
        assert_eq!(merged.get("solc_map"), Some(&json!({"A": "v3"})));
    }

    #[test]
    fn test_array_replace() {
        let merged = merge_layers(&[
            layer(LayerOrigin::ChildConf, json!({"rule": ["A", "B", "C"]})),
            layer(LayerOrigin::Cli, json!({"rule": ["X"]})),
        ]);
        assert_eq!(merged.get("rule"), Some(&json!(["X"])));
    }

    #[test]
    fn test_meta_keys_stripped() {
        let merged = merge_layers(&[layer(
            LayerOrigin::ChildConf,
            json!({"override_base_config": "base.conf", "msg": "hi"}),
        )]);
        assert!(merged.get(OVERRIDE_BASE_CONFIG).is_none());
        assert_eq!(merged.get("msg"), Some(&json!("hi")));
    }

    #[test]
    fn test_out_of_order_layers_keep_precedence() {
        let merged = merge_layers(&[
            layer(LayerOrigin::Cli, json!({"solc": "cli"})),
            layer(LayerOrigin::ChildConf, json!({"solc": "child"})),
        ]);
        assert_eq!(merged.get("solc"), Some(&json!("cli")));
        assert_eq!(merged.sources[0].origin, LayerOrigin::ChildConf);
        assert_eq!(merged.sources[1].origin, LayerOrigin::Cli);
    }
}
