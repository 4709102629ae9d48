//! Shared fixtures for integration tests
//!
//! A `Project` is a temporary working tree holding config files and
//! empty source files, resolved through the public pipeline.

#![allow(dead_code)]

use prover_conf::{resolve, AttributeRegistry, ConfError, ResolvedConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary working tree
pub struct Project {
    dir: TempDir,
    registry: AttributeRegistry,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
            registry: AttributeRegistry::standard(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write a file, creating parent directories
    pub fn write(&self, relative: &str, contents: &str) -> &Self {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    /// Write a config file from a JSON value
    pub fn write_conf(&self, relative: &str, value: serde_json::Value) -> &Self {
        self.write(relative, &serde_json::to_string_pretty(&value).expect("serialize conf"))
    }

    pub fn resolve(&self, tokens: &[&str]) -> Result<ResolvedConfig, ConfError> {
        resolve(&self.registry, &argv(tokens), self.root())
    }
}

/// Owned argument vector
pub fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
