//! Deep value mapping over nested content structures.
//!
//! A pre-order visitor over the JSON value tree (object / array /
//! scalar). The transform runs on a node *before* its children, and its
//! return value replaces the node before descent - so a transform that
//! replaces a composite node with a scalar stops recursion at that point.
//!
//! The main consumer is asset flattening: embedded asset references are
//! collapsed to their bare URL string, but only below the top level.
//! Callers must be able to request the full asset object at the root
//! while still flattening nested references.

use crate::content::{ASSET_MODEL_NAME, ContentObject};
use serde_json::Value;

// ============================================================================
// Key Paths
// ============================================================================

/// One step in a key path through the value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Field(String),
    Index(usize),
}

// ============================================================================
// Pre-order Mapping
// ============================================================================

/// Recursively map a value tree, pre-order.
///
/// `transform` receives each node together with its key path from the
/// root (empty at the root, so `path.len()` is the node's depth).
pub fn map_deep<F>(value: Value, mut transform: F) -> Value
where
    F: FnMut(Value, &[Key]) -> Value,
{
    let mut path = Vec::new();
    map_deep_inner(value, &mut transform, &mut path)
}

fn map_deep_inner<F>(value: Value, transform: &mut F, path: &mut Vec<Key>) -> Value
where
    F: FnMut(Value, &[Key]) -> Value,
{
    let value = transform(value, path);
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, child)| {
                    path.push(Key::Field(key.clone()));
                    let child = map_deep_inner(child, transform, path);
                    path.pop();
                    (key, child)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(index, child)| {
                    path.push(Key::Index(index));
                    let child = map_deep_inner(child, transform, path);
                    path.pop();
                    child
                })
                .collect(),
        ),
        scalar => scalar,
    }
}

// ============================================================================
// Asset Flattening
// ============================================================================

/// Replace embedded asset references below the top level with their bare
/// URL string. Depth 1 nodes are left intact.
pub fn flatten_asset_urls(value: Value) -> Value {
    map_deep(value, |value, path| {
        if path.len() > 1
            && is_asset_reference(&value)
            && let Some(url) = value.get("url")
        {
            return url.clone();
        }
        value
    })
}

/// Flatten asset references across a whole object set.
///
/// Each object sits at depth 1 of the mapped tree, so objects that *are*
/// assets survive intact while references inside their fields collapse.
pub fn flatten_objects(objects: Vec<ContentObject>) -> Vec<ContentObject> {
    let tree = Value::Array(objects.into_iter().map(Value::from).collect());
    match flatten_asset_urls(tree) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(ContentObject::new(map)),
                _ => None,
            })
            .collect(),
        _ => unreachable!("array root maps to array root"),
    }
}

fn is_asset_reference(value: &Value) -> bool {
    value
        .pointer("/metadata/modelName")
        .and_then(Value::as_str)
        == Some(ASSET_MODEL_NAME)
        && value.get("url").is_some()
}
