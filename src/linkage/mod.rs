//! Linkage validation
//!
//! Builds the linkage graph from `link`, `struct_link` and `address`
//! against the declared contracts. Redefining a slot with the same target
//! is a no-op; any other redefinition is a conflict. Errors from separate
//! directives are collected so one report covers all of them.

mod directive;
mod layout;

pub use directive::{canonical_number, parse_address, parse_link, LinkDirective, LinkTarget, SlotId};
pub use layout::{validate_layouts, StorageField, StorageLayout};

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::{ConfError, PlanError};
use crate::validate::ContractSet;

/// Attributes carrying `contract:slot=target` directives
pub const LINK_ATTRS: &[&str] = &["link", "struct_link"];

/// One linked slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEntry {
    pub slot: SlotId,
    pub target: LinkTarget,
    /// First directive defining this slot
    pub directive: String,
}

/// Slots per contract, keyed by canonical slot text
pub type SlotMap = BTreeMap<String, BTreeMap<String, LinkEntry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkageGraph {
    pub links: SlotMap,
    pub struct_links: SlotMap,
    /// Canonical hex address per contract
    pub addresses: BTreeMap<String, String>,
}

impl LinkageGraph {
    pub fn slots(&self, attr: &str) -> &SlotMap {
        if attr == "struct_link" {
            &self.struct_links
        } else {
            &self.links
        }
    }

    fn slots_mut(&mut self, attr: &str) -> &mut SlotMap {
        if attr == "struct_link" {
            &mut self.struct_links
        } else {
            &mut self.links
        }
    }

    /// Add one directive, detecting conflicting redefinitions
    fn insert(&mut self, attr: &str, directive: LinkDirective) -> Result<(), ConfError> {
        let slots = self
            .slots_mut(attr)
            .entry(directive.contract.clone())
            .or_default();
        let key = directive.slot.to_string();

        match slots.get(&key) {
            Some(existing) if existing.target == directive.target => {
                debug!(directive = %directive.raw, "identical link redefinition ignored");
                Ok(())
            }
            Some(existing) => Err(ConfError::SlotConflict {
                attr: attr.to_string(),
                contract: directive.contract,
                slot: key,
                first: existing.target.to_string(),
                second: directive.target.to_string(),
            }),
            None => {
                slots.insert(
                    key,
                    LinkEntry {
                        slot: directive.slot,
                        target: directive.target,
                        directive: directive.raw,
                    },
                );
                Ok(())
            }
        }
    }
}

/// Build the linkage graph, collecting every failing directive
pub fn validate_linkage(
    contracts: &ContractSet,
    config: &ResolvedConfig,
) -> Result<LinkageGraph, PlanError> {
    let mut graph = LinkageGraph::default();
    let mut errors = Vec::new();

    for attr in LINK_ATTRS {
        for raw in config.list(attr) {
            if let Err(err) = link_one(&mut graph, contracts, attr, raw) {
                errors.push(err);
            }
        }
    }

    for raw in config.list("address") {
        if let Err(err) = address_one(&mut graph, contracts, raw) {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        Ok(graph)
    } else {
        Err(PlanError { errors })
    }
}

fn link_one(
    graph: &mut LinkageGraph,
    contracts: &ContractSet,
    attr: &str,
    raw: &str,
) -> Result<(), ConfError> {
    let directive = parse_link(attr, raw)?;

    let mut named = vec![directive.contract.as_str()];
    if let LinkTarget::Contract(target) = &directive.target {
        named.push(target);
    }
    for contract in &named {
        if !contracts.contains(contract) {
            return Err(ConfError::UnknownContract {
                attr: attr.to_string(),
                directive: raw.to_string(),
                contract: contract.to_string(),
            });
        }
    }

    if attr == "struct_link" {
        if let Some(artifact) = named.iter().find(|c| contracts.is_artifact(c)) {
            return Err(ConfError::IllegalLinkTarget {
                attr: attr.to_string(),
                directive: raw.to_string(),
                contract: artifact.to_string(),
            });
        }
    }

    graph.insert(attr, directive)
}

fn address_one(graph: &mut LinkageGraph, contracts: &ContractSet, raw: &str) -> Result<(), ConfError> {
    let (contract, address) = parse_address(raw)?;
    if !contracts.contains(&contract) {
        return Err(ConfError::UnknownContract {
            attr: "address".to_string(),
            directive: raw.to_string(),
            contract,
        });
    }

    match graph.addresses.get(&contract) {
        Some(existing) if *existing != address => Err(ConfError::DuplicateAddress {
            contract,
            first: existing.clone(),
            second: address,
        }),
        Some(_) => Ok(()),
        None => {
            graph.addresses.insert(contract, address);
            Ok(())
        }
    }
}
