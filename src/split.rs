//! Rule selection and splitting
//!
//! Selects concrete rules from the discovered rule set with the `rule` and
//! `exclude_rule` globs, then partitions them into run units that share one
//! correlation identifier. Partitioning depends only on the rule set and
//! the split request.

use globset::{Glob, GlobSet, GlobSetBuilder};
use prover_attrs::AttrValue;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::{LayerOrigin, RecordError, ResolvedConfig, RunRecord};
use crate::error::ConfError;

/// One independently dispatchable unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunUnit {
    pub rules: Vec<String>,
    pub group_id: String,
    /// Configuration narrowed to this unit
    #[serde(skip)]
    pub config: ResolvedConfig,
}

/// Rules of one verification request and their partitioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleGroup {
    pub group_id: String,
    pub units: Vec<RunUnit>,
}

impl RuleGroup {
    /// All rules across units, in unit order
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.units
            .iter()
            .flat_map(|unit| unit.rules.iter().map(String::as_str))
    }

    /// Provenance record of the configuration the group was split from
    pub fn record(&self, config: &ResolvedConfig) -> Result<RunRecord, RecordError> {
        Ok(RunRecord::from_config(config)?.with_group_id(self.group_id.clone()))
    }
}

fn glob_set(attr: &str, patterns: &[String]) -> Result<GlobSet, ConfError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ConfError::validation(attr, format!("invalid rule pattern {}: {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| ConfError::validation(attr, e.to_string()))
}

/// Included rules in lexicographic order
pub fn select_rules(config: &ResolvedConfig, discovered: &[String]) -> Result<Vec<String>, ConfError> {
    let include = config.list("rule");
    let include_set = glob_set("rule", include)?;
    let exclude_set = glob_set("exclude_rule", config.list("exclude_rule"))?;

    let mut rules: Vec<String> = discovered
        .iter()
        .filter(|rule| include.is_empty() || include_set.is_match(rule.as_str()))
        .filter(|rule| !exclude_set.is_match(rule.as_str()))
        .cloned()
        .collect();
    rules.sort();
    rules.dedup();

    if rules.is_empty() {
        return Err(ConfError::EmptyRuleSet {
            discovered: discovered.len(),
        });
    }
    Ok(rules)
}

/// Select rules and partition them into run units
pub fn split_rules(config: &ResolvedConfig, discovered: &[String]) -> Result<RuleGroup, ConfError> {
    let rules = select_rules(config, discovered)?;
    let group_id = correlation_id(config)?;

    let split_set = glob_set("split_rules", config.list("split_rules"))?;
    let (separate, rest): (Vec<String>, Vec<String>) = rules
        .into_iter()
        .partition(|rule| split_set.is_match(rule.as_str()));

    let mut partitions: Vec<Vec<String>> = separate.into_iter().map(|rule| vec![rule]).collect();
    if !rest.is_empty() {
        partitions.push(rest);
    }

    let units: Vec<RunUnit> = partitions
        .into_iter()
        .map(|rules| RunUnit {
            config: narrow(config, &rules, &group_id),
            rules,
            group_id: group_id.clone(),
        })
        .collect();

    info!(group_id = %group_id, units = units.len(), "rules split");
    Ok(RuleGroup { group_id, units })
}

fn correlation_id(config: &ResolvedConfig) -> Result<String, ConfError> {
    let id = match config.get_str("group_id") {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };
    Uuid::parse_str(&id)
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|_| ConfError::validation("group_id", format!("'{}' is not a valid UUID", id)))
}

fn narrow(config: &ResolvedConfig, rules: &[String], group_id: &str) -> ResolvedConfig {
    config
        .with_value("rule", Some(AttrValue::List(rules.to_vec())), LayerOrigin::Cli)
        .with_value("split_rules", None, LayerOrigin::Cli)
        .with_value("group_id", Some(AttrValue::Str(group_id.to_string())), LayerOrigin::Cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, ResolvedEntry};
    use std::collections::BTreeMap;

    fn config(values: &[(&str, AttrValue)]) -> ResolvedConfig {
        let mut entries = BTreeMap::new();
        for (name, value) in values {
            entries.insert(
                name.to_string(),
                ResolvedEntry {
                    value: Some(value.clone()),
                    origin: LayerOrigin::Cli,
                },
            );
        }
        ResolvedConfig::new(entries, vec![ConfigSource::cli()])
    }

    fn list(items: &[&str]) -> AttrValue {
        AttrValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    fn discovered() -> Vec<String> {
        ["r3", "r1", "r2", "withdraw_ok", "withdraw_fails"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_include_minus_exclude() {
        let config = config(&[
            ("rule", list(&["r*", "withdraw_*"])),
            ("exclude_rule", list(&["*_fails"])),
        ]);
        let rules = select_rules(&config, &discovered()).unwrap();
        assert_eq!(rules, vec!["r1", "r2", "r3", "withdraw_ok"]);
    }

    #[test]
    fn test_no_rule_means_all() {
        let rules = select_rules(&config(&[]), &discovered()).unwrap();
        assert_eq!(rules.len(), 5);
    }

    #[test]
    fn test_empty_selection() {
        let config = config(&[("rule", list(&["nothing_*"]))]);
        let err = select_rules(&config, &discovered()).unwrap_err();
        assert_eq!(err, ConfError::EmptyRuleSet { discovered: 5 });
    }

    #[test]
    fn test_group_record_carries_group_id() {
        let config = config(&[("split_rules", list(&["withdraw_*"]))]);
        let group = split_rules(&config, &discovered()).unwrap();
        let record = group.record(&config).unwrap();

        assert_eq!(record.group_id.as_deref(), Some(group.group_id.as_str()));
        assert_eq!(record.provenance.get("split_rules"), Some(&LayerOrigin::Cli));
    }

    #[test]
    fn test_split_units() {
        let config = config(&[("split_rules", list(&["withdraw_*"]))]);
        let group = split_rules(&config, &discovered()).unwrap();

        let units: Vec<Vec<String>> = group.units.iter().map(|u| u.rules.clone()).collect();
        assert_eq!(
            units,
            vec![
                vec!["withdraw_fails".to_string()],
                vec!["withdraw_ok".to_string()],
                vec!["r1".to_string(), "r2".to_string(), "r3".to_string()],
            ]
        );
        for unit in &group.units {
            assert_eq!(unit.group_id, group.group_id);
            assert_eq!(unit.config.list("rule"), unit.rules.as_slice());
            assert!(unit.config.get("split_rules").is_none());
            assert_eq!(unit.config.get_str("group_id"), Some(group.group_id.as_str()));
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let config = config(&[("split_rules", list(&["r1"]))]);
        let first = split_rules(&config, &discovered()).unwrap();
        let second = split_rules(&config, &discovered()).unwrap();

        let members = |g: &RuleGroup| g.units.iter().map(|u| u.rules.clone()).collect::<Vec<_>>();
        assert_eq!(members(&first), members(&second));
        assert!(Uuid::parse_str(&first.group_id).is_ok());
        assert!(Uuid::parse_str(&second.group_id).is_ok());
    }

    #[test]
    fn test_user_group_id_kept() {
        let id = "5f0c3a52-8d1e-4b43-9a51-0c0f4e2f8a11";
        let config = config(&[("group_id", AttrValue::Str(id.to_string()))]);
        let group = split_rules(&config, &discovered()).unwrap();
        assert_eq!(group.group_id, id);
        assert_eq!(group.units.len(), 1);
    }
}
