//! Post-build linkage check against structural layouts
//!
//! Layouts come from the external build once sources are compiled. A link
//! slot must then name an actual field of the linking contract, and both
//! sides of a struct link need a layout.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::directive::{canonical_number, SlotId};
use super::{LinkTarget, LinkageGraph, LINK_ATTRS};
use crate::error::{ConfError, PlanError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageField {
    pub name: String,
    /// Slot number, decimal or hex
    pub slot: String,
}

/// Storage fields of one contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    pub fields: Vec<StorageField>,
}

impl StorageLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, slot: impl Into<String>) -> Self {
        self.fields.push(StorageField {
            name: name.into(),
            slot: slot.into(),
        });
        self
    }

    /// Whether a field matches the slot by name or by number
    pub fn has_slot(&self, slot: &SlotId) -> bool {
        self.fields.iter().any(|field| match slot {
            SlotId::Name(name) => field.name == *name,
            SlotId::Number(number) => canonical_number(&field.slot).as_deref() == Some(number),
        })
    }
}

/// Re-check every link against the layouts produced by the build
pub fn validate_layouts(
    graph: &LinkageGraph,
    layouts: &BTreeMap<String, StorageLayout>,
) -> Result<(), PlanError> {
    let mut errors = Vec::new();

    for attr in LINK_ATTRS {
        for (contract, slots) in graph.slots(attr) {
            let layout = layouts.get(contract);
            for entry in slots.values() {
                if *attr == "struct_link" {
                    let mut sides = vec![contract.as_str()];
                    if let LinkTarget::Contract(target) = &entry.target {
                        sides.push(target);
                    }
                    if let Some(missing) = sides.into_iter().find(|c| !layouts.contains_key(*c)) {
                        errors.push(ConfError::IllegalLinkTarget {
                            attr: attr.to_string(),
                            directive: entry.directive.clone(),
                            contract: missing.to_string(),
                        });
                        continue;
                    }
                }

                if let Some(layout) = layout {
                    if !layout.has_slot(&entry.slot) {
                        errors.push(ConfError::UndeclaredField {
                            attr: attr.to_string(),
                            contract: contract.clone(),
                            slot: entry.slot.to_string(),
                        });
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(PlanError { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkage::validate_linkage;
    use crate::config::{ConfigSource, LayerOrigin, ResolvedConfig, ResolvedEntry};
    use crate::validate::ContractSet;
    use prover_attrs::AttrValue;

    fn graph(attr: &str, entries: &[&str]) -> LinkageGraph {
        let mut map = BTreeMap::new();
        map.insert(
            attr.to_string(),
            ResolvedEntry {
                value: Some(AttrValue::List(entries.iter().map(|e| e.to_string()).collect())),
                origin: LayerOrigin::Cli,
            },
        );
        let config = ResolvedConfig::new(map, vec![ConfigSource::cli()]);
        let contracts =
            ContractSet::from_files(&["A.sol".to_string(), "B.sol".to_string()]).unwrap();
        validate_linkage(&contracts, &config).unwrap()
    }

    fn layouts() -> BTreeMap<String, StorageLayout> {
        let mut layouts = BTreeMap::new();
        layouts.insert(
            "A".to_string(),
            StorageLayout::new().with_field("token", "0").with_field("vault", "1"),
        );
        layouts
    }

    #[test]
    fn test_field_by_name_and_number() {
        validate_layouts(&graph("link", &["A:token=B", "A:0x1=B"]), &layouts()).unwrap();
    }

    #[test]
    fn test_undeclared_field() {
        let err = validate_layouts(&graph("link", &["A:owner=B", "A:7=B"]), &layouts()).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err
            .errors
            .iter()
            .all(|e| matches!(e, ConfError::UndeclaredField { .. })));
    }

    #[test]
    fn test_struct_link_target_without_layout() {
        let err = validate_layouts(&graph("struct_link", &["A:token=B"]), &layouts()).unwrap_err();
        assert!(matches!(
            err.errors[0],
            ConfError::IllegalLinkTarget { ref contract, .. } if contract == "B"
        ));
    }
}
