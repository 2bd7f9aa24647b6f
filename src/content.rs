//! Core data types for the transform pipeline.
//!
//! These types are serialized to the JSON cache file consumed by the
//! data access client on the rendering side.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Model name reserved for embedded asset references.
pub const ASSET_MODEL_NAME: &str = "__asset";

/// Props attached to a page or shared by every page.
pub type PropsBag = Map<String, Value>;

// ============================================================================
// Content Objects
// ============================================================================

/// A single record emitted by the upstream content pipeline.
///
/// Field layout is source-defined and arbitrary apart from the reserved
/// `metadata` sub-record. Identity is structural; objects are never
/// mutated after the pipeline produces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentObject(pub Map<String, Value>);

impl ContentObject {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Look up a value by dotted field path (e.g. `"metadata.modelName"`).
    ///
    /// Numeric segments index into arrays.
    pub fn lookup(&self, field_path: &str) -> Option<&Value> {
        let mut current: Option<&Value> = None;
        for segment in field_path.split('.') {
            current = Some(match current {
                None => self.0.get(segment)?,
                Some(Value::Object(map)) => map.get(segment)?,
                Some(Value::Array(items)) => items.get(segment.parse::<usize>().ok()?)?,
                Some(_) => return None,
            });
        }
        current
    }

    /// Typed view of the reserved `metadata` sub-record, if present and
    /// well-formed.
    pub fn metadata(&self) -> Option<Metadata> {
        let value = self.0.get("metadata")?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Fast access to `metadata.modelName` without a full metadata parse.
    pub fn model_name(&self) -> Option<&str> {
        self.lookup("metadata.modelName").and_then(Value::as_str)
    }
}

impl From<ContentObject> for Value {
    fn from(object: ContentObject) -> Self {
        Value::Object(object.0)
    }
}

/// The reserved `metadata` sub-record tagging every content object with
/// its model and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Source model name (e.g. "post", or `__asset` for asset references)
    pub model_name: String,

    /// Upstream source plugin identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Source project identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    /// Source project environment (e.g. "master")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_environment: Option<String>,
}

// ============================================================================
// Transform Output
// ============================================================================

/// A resolved route: path + backing content + props, ready for a routing
/// layer to render. Produced fresh on every transform, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Absolute URL path (single leading slash, no trailing slash except
    /// root). `None` only for callback-built entries kept under the
    /// pass-through failure policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// The content object backing this page
    pub page: ContentObject,

    /// Page-type props, computed against the entire object set
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: PropsBag,
}

/// The unit serialized to the cache file: everything the rendering side
/// needs for one generation of content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformedData {
    /// All content objects, post asset-flattening
    pub objects: Vec<ContentObject>,

    /// Common props attached to every page
    #[serde(default)]
    pub props: PropsBag,

    /// Resolved page entries, in page-type then source order
    #[serde(default)]
    pub pages: Vec<PageEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> ContentObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_lookup_top_level_and_nested() {
        let obj = object(json!({
            "title": "Hello",
            "author": { "name": "Ada", "links": ["a", "b"] }
        }));

        assert_eq!(obj.lookup("title"), Some(&json!("Hello")));
        assert_eq!(obj.lookup("author.name"), Some(&json!("Ada")));
        assert_eq!(obj.lookup("author.links.1"), Some(&json!("b")));
        assert_eq!(obj.lookup("author.missing"), None);
        assert_eq!(obj.lookup("title.nested"), None);
    }

    #[test]
    fn test_metadata_typed_view() {
        let obj = object(json!({
            "metadata": {
                "modelName": "post",
                "source": "cms-source",
                "projectId": "p1",
                "projectEnvironment": "master"
            }
        }));

        let meta = obj.metadata().unwrap();
        assert_eq!(meta.model_name, "post");
        assert_eq!(meta.source.as_deref(), Some("cms-source"));
        assert_eq!(meta.project_id.as_deref(), Some("p1"));
        assert_eq!(meta.project_environment.as_deref(), Some("master"));
        assert_eq!(obj.model_name(), Some("post"));
    }

    #[test]
    fn test_metadata_missing() {
        let obj = object(json!({ "title": "x" }));
        assert!(obj.metadata().is_none());
        assert!(obj.model_name().is_none());
    }

    #[test]
    fn test_page_entry_serialization_shape() {
        let entry = PageEntry {
            path: Some("/blog/hello".into()),
            page: object(json!({ "slug": "hello" })),
            props: PropsBag::new(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path"], "/blog/hello");
        assert_eq!(json["page"]["slug"], "hello");
        // Empty props are omitted from the wire format
        assert!(json.get("props").is_none());
    }

    #[test]
    fn test_unpathed_entry_omits_path() {
        let entry = PageEntry {
            path: None,
            page: object(json!({})),
            props: PropsBag::new(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("path").is_none());
    }

    #[test]
    fn test_transformed_data_round_trip() {
        let data = TransformedData {
            objects: vec![object(json!({ "slug": "a" }))],
            props: serde_json::from_value(json!({ "siteName": "Y" })).unwrap(),
            pages: vec![PageEntry {
                path: Some("/a".into()),
                page: object(json!({ "slug": "a" })),
                props: PropsBag::new(),
            }],
        };
        let text = serde_json::to_string(&data).unwrap();
        let back: TransformedData = serde_json::from_str(&text).unwrap();
        assert_eq!(back, data);
    }
}
