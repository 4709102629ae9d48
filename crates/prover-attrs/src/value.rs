//! Typed attribute values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::AttrKind;

/// A converted attribute value.
///
/// Mappings keep declaration order: the compiler pattern map breaks
/// specificity ties by the first declared entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(u64),
    Str(String),
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

impl AttrValue {
    /// The kind this value was converted to
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Bool(_) => AttrKind::Boolean,
            AttrValue::Number(_) => AttrKind::Number,
            AttrValue::Str(_) => AttrKind::String,
            AttrValue::List(_) => AttrKind::StringList,
            AttrValue::Map(_) => AttrKind::Mapping,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, String>> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Str(s) => write!(f, "{}", s),
            AttrValue::List(items) => write!(f, "{}", items.join(" ")),
            AttrValue::Map(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_declaration_order() {
        let mut map = IndexMap::new();
        map.insert("B.sol".to_string(), "solc6.10".to_string());
        map.insert("A.sol".to_string(), "solc5.11".to_string());
        let value = AttrValue::Map(map);

        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"B.sol":"solc6.10","A.sol":"solc5.11"}"#);
        assert_eq!(value.to_string(), "B.sol=solc6.10,A.sol=solc5.11");
    }

    #[test]
    fn test_accessors_match_kind() {
        let value = AttrValue::List(vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(value.kind(), AttrKind::StringList);
        assert_eq!(value.as_list().map(|l| l.len()), Some(2));
        assert!(value.as_str().is_none());
        assert_eq!(AttrValue::Number(0).as_number(), Some(0));
    }
}
