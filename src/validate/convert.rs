//! Conversion of merged raw values to their declared kinds
//!
//! Lists and mappings accept a native collection or one delimited string;
//! entries are split on commas and trimmed.

use indexmap::IndexMap;
use prover_attrs::{AttrKind, AttrValue, AttributeDefinition};
use serde_json::Value;

use crate::error::ConfError;

/// Convert one raw value, `None` for an explicit null
pub fn to_typed(attr: &AttributeDefinition, raw: &Value) -> Result<Option<AttrValue>, ConfError> {
    if raw.is_null() {
        return Ok(None);
    }

    let mismatch = || {
        ConfError::validation(
            attr.name,
            format!("expected {}, got {}", attr.kind.describe(), raw),
        )
    };

    let value = match attr.kind {
        AttrKind::String => match raw {
            Value::String(s) => AttrValue::Str(s.clone()),
            _ => return Err(mismatch()),
        },
        AttrKind::Boolean => match raw {
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => AttrValue::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => AttrValue::Bool(false),
            _ => return Err(mismatch()),
        },
        AttrKind::Number => AttrValue::Number(to_number(attr.name, raw)?),
        AttrKind::StringList => AttrValue::List(to_list(raw).ok_or_else(mismatch)?),
        AttrKind::Mapping => AttrValue::Map(to_map(attr.name, raw)?),
    };
    Ok(Some(value))
}

fn to_number(name: &str, raw: &Value) -> Result<u64, ConfError> {
    let negative = || ConfError::validation(name, format!("{} must be a non-negative integer", raw));
    match raw {
        Value::Number(n) => match n.as_u64() {
            Some(n) => Ok(n),
            None => Err(negative()),
        },
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                Ok(n)
            } else if s.parse::<i64>().is_ok() {
                Err(negative())
            } else {
                Err(ConfError::validation(name, format!("'{}' is not a number", s)))
            }
        }
        _ => Err(ConfError::validation(name, format!("{} is not a number", raw))),
    }
}

/// Identical entries collapse to the first occurrence
fn to_list(raw: &Value) -> Option<Vec<String>> {
    let entries: Vec<String> = match raw {
        Value::String(s) => split_delimited(s).map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<_>>()?,
        _ => return None,
    };

    let mut list: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        if !list.contains(&entry) {
            list.push(entry);
        }
    }
    Some(list)
}

fn to_map(name: &str, raw: &Value) -> Result<IndexMap<String, String>, ConfError> {
    match raw {
        Value::Object(object) => object
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                Value::Number(n) => Ok((k.clone(), n.to_string())),
                other => Err(ConfError::validation(
                    name,
                    format!("value of {} should be a string, got {}", k, other),
                )),
            })
            .collect(),
        Value::String(s) => {
            let mut map = IndexMap::new();
            for entry in split_delimited(s) {
                let (key, value) = entry.split_once('=').ok_or_else(|| {
                    ConfError::validation(
                        name,
                        format!("'{}' should be stored as a map of key=value entries", entry),
                    )
                })?;
                insert_unique(name, &mut map, key.trim(), value.trim())?;
            }
            Ok(map)
        }
        _ => Err(ConfError::validation(name, "should be stored as a map")),
    }
}

/// Insert a map entry, accepting a repeated key only with the same value
pub fn insert_unique(
    name: &str,
    map: &mut IndexMap<String, String>,
    key: &str,
    value: &str,
) -> Result<(), ConfError> {
    match map.get(key) {
        Some(existing) if existing != value => Err(ConfError::DuplicateKey {
            attr: name.to_string(),
            key: key.to_string(),
            reason: format!(
                "{} was given two different values: {} and {}",
                key, existing, value
            ),
        }),
        Some(_) => Ok(()),
        None => {
            map.insert(key.to_string(), value.to_string());
            Ok(())
        }
    }
}

fn split_delimited(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|entry| !entry.is_empty())
}
