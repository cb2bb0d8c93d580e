//! JSON Tree Helpers - Path Navigation for Local Stores
//!
//! Shared by the in-memory and file stores. Paths are `a/b/c`; empty
//! segments are ignored. Writing `null` removes the key, which matches
//! Firebase Realtime Database semantics.

use anyhow::{bail, Result};
use serde_json::{Map, Value};

/// Split a store path into its non-empty segments.
pub(crate) fn segments(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        if segment.contains(['.', '$', '#', '[', ']']) {
            bail!("invalid store path segment {segment:?} in {path:?}");
        }
    }
    Ok(segments)
}

/// Find the subtree at `path`. `null` counts as absent.
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let node = path.iter().try_fold(root, |node, key| node.get(*key))?;
    (!node.is_null()).then_some(node)
}

/// Replace the subtree at `path`, creating parents as needed.
pub(crate) fn assign(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for key in parents {
        node = as_object(node)
            .entry((*key).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let object = as_object(node);
    if value.is_null() {
        object.remove(*last);
    } else {
        object.insert((*last).to_string(), value);
    }
}

/// Coerce a node into an object, replacing scalars.
fn as_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
