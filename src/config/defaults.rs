//! Built-in defaults (lowest layer)
//!
//! Derived from the attribute registry so there is one place declaring
//! every default.

use prover_attrs::{AttrValue, AttributeRegistry};
use serde_json::Value;

use super::layer::{ConfigSource, RawLayer};

/// Build the default layer from the registry
pub fn default_layer(registry: &AttributeRegistry) -> RawLayer {
    let mut layer = RawLayer::new(ConfigSource::builtin());
    for attr in registry.iter() {
        if let Some(default) = &attr.default {
            layer.insert(attr.name, to_raw(default));
        }
    }
    layer
}

/// Convert a typed value back to its raw form
pub fn to_raw(value: &AttrValue) -> Value {
    match value {
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Number(n) => Value::from(*n),
        AttrValue::Str(s) => Value::String(s.clone()),
        AttrValue::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttrValue::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerOrigin;

    #[test]
    fn test_defaults() {
        let registry = AttributeRegistry::standard();
        let layer = default_layer(&registry);

        assert_eq!(layer.origin(), LayerOrigin::Default);
        assert_eq!(layer.get("server"), Some(&Value::from("production")));
        assert_eq!(layer.get("build_only"), Some(&Value::Bool(false)));
        assert!(layer.get("solc").is_none());
    }

    #[test]
    fn test_to_raw_map() {
        let mut map = indexmap::IndexMap::new();
        map.insert("A.sol".to_string(), "solc6.10".to_string());
        let raw = to_raw(&AttrValue::Map(map));
        assert_eq!(raw["A.sol"], "solc6.10");
    }
}
