//! Declarative page-type and props specifications.
//!
//! Page and props rules are plain data: a small predicate language
//! evaluated by [`Predicate::matches`], so rules round-trip through the
//! config file and stay testable. Pipelines whose rules cannot be
//! expressed as predicates register callback reducers instead (see
//! `reduce`).
//!
//! # Example
//! ```toml
//! [[pages]]
//! path = "/blog/{slug}"
//! predicate = { model = "post" }
//!
//! [pages.props.banner]
//! single = true
//! predicate = { model = "banner" }
//!
//! [props.siteConfig]
//! single = true
//! predicate = { field = "metadata.modelName", equals = "config" }
//! ```

use super::defaults;
use crate::content::ContentObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Common-props and per-page-type props specification: prop name to rule.
///
/// Keys are unique by construction (TOML table).
pub type PropsMap = BTreeMap<String, PropDef>;

/// One `[[pages]]` entry: which content objects become pages of this
/// kind and what template generates their URL path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageTypeDef {
    /// Selects the content objects of this page type.
    pub predicate: Predicate,

    /// Path template with `{fieldPath}` placeholders (default: `/{slug}`).
    #[serde(default = "defaults::pages::path")]
    pub path: String,

    /// Props attached to every page of this type, computed against the
    /// entire object set.
    #[serde(default)]
    pub props: PropsMap,
}

/// One prop rule: which objects feed the prop and whether it is a single
/// object or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropDef {
    pub predicate: Predicate,

    /// Take the first match (source order) instead of all matches.
    #[serde(default)]
    pub single: bool,
}

/// Predicate over a content object.
///
/// Forms:
/// - `{ model = "post" }` - sugar for equality on `metadata.modelName`
/// - `{ field = "a.b", equals = <json value> }`
/// - `{ field = "a.b", exists = true }`
/// - `{ all = [p, ...] }` / `{ any = [p, ...] }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Model { model: String },
    Equals { field: String, equals: Value },
    Exists { field: String, exists: bool },
    All { all: Vec<Predicate> },
    Any { any: Vec<Predicate> },
}

impl Predicate {
    /// Evaluate this predicate against one content object.
    pub fn matches(&self, object: &ContentObject) -> bool {
        match self {
            Predicate::Model { model } => {
                object.lookup("metadata.modelName").and_then(Value::as_str) == Some(model)
            }
            Predicate::Equals { field, equals } => object.lookup(field) == Some(equals),
            Predicate::Exists { field, exists } => object.lookup(field).is_some() == *exists,
            Predicate::All { all } => all.iter().all(|p| p.matches(object)),
            Predicate::Any { any } => any.iter().any(|p| p.matches(object)),
        }
    }
}
