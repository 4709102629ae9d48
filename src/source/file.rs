//! Configuration file parsing
//!
//! JSON files go through a strict deserializer that rejects duplicate keys
//! at any depth; TOML files are parsed by the `toml` crate, which rejects
//! them itself. Both end up as `serde_json::Value` objects.

use prover_attrs::{AttrKind, AttributeRegistry};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::{ConfigSource, LayerOrigin, RawLayer};
use crate::error::ConfError;

/// JSON value that refuses duplicate object keys
struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(StrictVisitor).map(StrictValue)
    }
}

struct StrictVisitor;

impl<'de> Visitor<'de> for StrictVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(StrictValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("Duplicate key '{}'", key)));
            }
            let StrictValue(value) = access.next_value()?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

/// Parse JSON text, rejecting duplicate keys
pub fn parse_json(contents: &str) -> Result<Value, String> {
    serde_json::from_str::<StrictValue>(contents)
        .map(|v| v.0)
        .map_err(|e| e.to_string())
}

/// Parse TOML text into a JSON value
pub fn parse_toml(contents: &str) -> Result<Value, String> {
    toml::from_str::<toml::Value>(contents)
        .map(toml_to_json)
        .map_err(|e| format!("TOML parse error: {}", e))
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

/// Whether a path names a configuration file rather than a project input
pub fn is_config_file(path: &str) -> bool {
    matches!(
        Path::new(path).extension().and_then(|e| e.to_str()),
        Some("conf") | Some("toml")
    )
}

/// Read one configuration file into a raw layer
pub fn read_config_file(
    path: &Path,
    origin: LayerOrigin,
    registry: &AttributeRegistry,
) -> Result<RawLayer, ConfError> {
    let parse_error = |key: Option<&str>, reason: String| ConfError::ConfigParse {
        file: path.to_path_buf(),
        key: key.map(str::to_string),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| parse_error(None, e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents =
        String::from_utf8(bytes).map_err(|e| parse_error(None, format!("Invalid UTF-8: {}", e)))?;

    let is_toml = path.extension().and_then(|e| e.to_str()) == Some("toml");
    let value = if is_toml {
        parse_toml(&contents)
    } else {
        parse_json(&contents)
    }
    .map_err(|reason| parse_error(None, reason))?;

    let Value::Object(entries) = value else {
        return Err(parse_error(
            None,
            "the top level must be an object of attributes".to_string(),
        ));
    };

    for (key, value) in &entries {
        if let Some(attr) = registry.get(key) {
            check_shape(attr.kind, value).map_err(|reason| {
                parse_error(Some(key.as_str()), format!("value of '{}' {}", key, reason))
            })?;
        }
    }

    Ok(RawLayer {
        source: ConfigSource::file(origin, path, digest),
        entries: entries.into_iter().collect(),
    })
}

/// Check that a file value's runtime type fits the declared kind
fn check_shape(kind: AttrKind, value: &Value) -> Result<(), String> {
    let fits = match kind {
        AttrKind::String => value.is_string(),
        AttrKind::StringList => match value {
            Value::String(_) => true,
            Value::Array(items) => items.iter().all(Value::is_string),
            _ => false,
        },
        AttrKind::Mapping => match value {
            Value::String(s) => s.contains('='),
            Value::Object(map) => map.values().all(|v| v.is_string() || v.is_u64()),
            _ => false,
        },
        AttrKind::Boolean => value.is_boolean(),
        AttrKind::Number => value.is_u64() || value.as_str().map_or(false, is_decimal),
    };

    if fits {
        return Ok(());
    }
    Err(match kind {
        AttrKind::String => "is not a string".to_string(),
        AttrKind::StringList => "is not a list of strings".to_string(),
        AttrKind::Mapping => "should be stored as a map".to_string(),
        AttrKind::Boolean => "is not a boolean".to_string(),
        AttrKind::Number => "is not a non-negative number".to_string(),
    })
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
        let mut temp = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        write!(temp, "{}", contents).unwrap();
        temp
    }

    #[test]
    fn test_duplicate_top_level_key_rejected() {
        let err = parse_json(r#"{"solc_map": {"A": "v1"}, "solc_map": {"B": "v2"}}"#).unwrap_err();
        assert!(err.contains("Duplicate key 'solc_map'"));
    }

    #[test]
    fn test_duplicate_nested_key_rejected() {
        let err = parse_json(r#"{"solc_map": {"A.sol": "v1", "A.sol": "v1"}}"#).unwrap_err();
        assert!(err.contains("Duplicate key 'A.sol'"));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(parse_json(r#"{"solc_map": {"A": "v1", "B":: "v2"}}"#).is_err());
        assert!(parse_json(r#"{"msg": "x",}"#).is_err());
    }

    #[test]
    fn test_toml_file() {
        let temp = write_temp(".toml", "solc = \"solc8.17\"\nrule = [\"r1\"]\n");
        let registry = AttributeRegistry::standard();
        let layer = read_config_file(temp.path(), LayerOrigin::ChildConf, &registry).unwrap();

        assert_eq!(layer.get("solc"), Some(&Value::from("solc8.17")));
        assert_eq!(layer.source.digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_list_where_string_expected() {
        let temp = write_temp(".conf", r#"{"msg": ["msg"]}"#);
        let registry = AttributeRegistry::standard();
        let err = read_config_file(temp.path(), LayerOrigin::ChildConf, &registry).unwrap_err();

        assert!(matches!(err, ConfError::ConfigParse { ref key, .. } if key.as_deref() == Some("msg")));
        assert!(err.to_string().contains("is not a string"));
    }

    #[test]
    fn test_string_where_map_expected() {
        let temp = write_temp(".conf", r#"{"solc_map": "solc6.1"}"#);
        let registry = AttributeRegistry::standard();
        let err = read_config_file(temp.path(), LayerOrigin::ChildConf, &registry).unwrap_err();
        assert!(err.to_string().contains("should be stored as a map"));
    }

    #[test]
    fn test_object_where_list_expected() {
        let temp = write_temp(".conf", r#"{"rule": {}}"#);
        let registry = AttributeRegistry::standard();
        let err = read_config_file(temp.path(), LayerOrigin::ChildConf, &registry).unwrap_err();
        assert!(err.to_string().contains("is not a list"));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let temp = write_temp(".conf", "[1, 2]");
        let registry = AttributeRegistry::standard();
        assert!(read_config_file(temp.path(), LayerOrigin::ChildConf, &registry).is_err());
    }

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file("run.conf"));
        assert!(is_config_file("dir/run.toml"));
        assert!(!is_config_file("A.sol"));
        assert!(!is_config_file("empty.tac"));
    }
}
