//! Rewriting of absolute paths inside the working tree
//!
//! Lexical only: nothing here touches the filesystem, so symlinks are not
//! resolved and paths outside the tree are left as given.

use indexmap::IndexMap;
use prover_attrs::{AttrValue, PathKind};
use std::path::{Component, Path};

use super::convert::insert_unique;
use crate::error::ConfError;

/// Rewrite every path embedded in a value according to its path kind
///
/// Map keys that collapse onto the same path must agree on their value.
pub fn relativize(
    name: &str,
    kind: PathKind,
    value: AttrValue,
    root: &Path,
) -> Result<AttrValue, ConfError> {
    if kind == PathKind::None {
        return Ok(value);
    }
    let value = match value {
        AttrValue::Str(s) => AttrValue::Str(rewrite_entry(kind, &s, root)),
        AttrValue::List(items) => AttrValue::List(
            items
                .iter()
                .map(|item| rewrite_entry(kind, item, root))
                .collect(),
        ),
        AttrValue::Map(map) if kind == PathKind::MapKeys => {
            let mut rewritten = IndexMap::with_capacity(map.len());
            for (key, value) in &map {
                let key = normalize_path(&rewrite_path(key, root));
                insert_unique(name, &mut rewritten, &key, value)?;
            }
            AttrValue::Map(rewritten)
        }
        other => other,
    };
    Ok(value)
}

fn rewrite_entry(kind: PathKind, entry: &str, root: &Path) -> String {
    match kind {
        PathKind::None | PathKind::MapKeys => entry.to_string(),
        PathKind::Plain => rewrite_path(entry, root),
        PathKind::FileWithContract => match split_contract_suffix(entry) {
            Some((path, contract)) => format!("{}:{}", rewrite_path(path, root), contract),
            None => rewrite_path(entry, root),
        },
        PathKind::ContractPrefixed => match entry.split_once(':') {
            Some((contract, path)) => format!("{}:{}", contract, rewrite_path(path, root)),
            None => entry.to_string(),
        },
        PathKind::KeyValue => match entry.split_once('=') {
            Some((name, path)) => format!("{}={}", name, rewrite_path(path, root)),
            None => entry.to_string(),
        },
    }
}

/// Split `path:Contract`; a trailing segment containing a separator is part of the path
pub fn split_contract_suffix(entry: &str) -> Option<(&str, &str)> {
    let (path, contract) = entry.rsplit_once(':')?;
    if path.is_empty() || contract.is_empty() || contract.contains(['/', '\\', '.']) {
        return None;
    }
    Some((path, contract))
}

fn rewrite_path(path: &str, root: &Path) -> String {
    let candidate = Path::new(path);
    if !candidate.is_absolute() {
        return path.to_string();
    }
    match candidate.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}

/// Lexically fold `.` and `..` out of a path
///
/// `..` directly under the root is dropped; a leading `..` in a relative
/// path is kept. An empty result becomes `.`.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return ".".to_string();
    }
    parts
        .iter()
        .collect::<std::path::PathBuf>()
        .to_string_lossy()
        .into_owned()
}
