//! Persisted run record with full provenance
//!
//! The run record captures the resolved configuration plus which layer
//! supplied each value. It is written for the submission step and for
//! audit; the base-config meta-key never appears in it.

use chrono::{DateTime, Utc};
use prover_attrs::AttrValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::layer::{ConfigSource, LayerOrigin};
use super::resolved::ResolvedConfig;

/// Schema version for run_record
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "prover-conf/run_record@1";

/// Run record errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JCS canonicalization error: {0}")]
    Jcs(String),
}

/// Persisted run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this record was produced
    pub created_at: DateTime<Utc>,

    /// Correlation identifier of a split run (set later)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Attribute values, `null` when unset
    pub config: BTreeMap<String, Option<AttrValue>>,

    /// Layer that supplied each attribute
    pub provenance: BTreeMap<String, LayerOrigin>,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// SHA-256 of the canonical configuration values
    pub config_digest: String,
}

impl RunRecord {
    /// Build the record for a resolved configuration
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, RecordError> {
        let mut values = BTreeMap::new();
        let mut provenance = BTreeMap::new();
        for (name, entry) in config.entries() {
            values.insert(name.to_string(), entry.value.clone());
            provenance.insert(name.to_string(), entry.origin);
        }

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            group_id: config.get_str("group_id").map(str::to_string),
            config: values,
            provenance,
            sources: config.sources().to_vec(),
            config_digest: config.config_digest()?,
        })
    }

    /// Set the correlation identifier
    pub fn with_group_id(mut self, group_id: String) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> Result<(), RecordError> {
        let json = self.to_json()?;
        fs::write(path, json)?;
        Ok(())
    }
}
