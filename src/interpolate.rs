//! Page path interpolation.
//!
//! Resolves a path template like `/blog/{slug}` against one content
//! object. Placeholders name fields by dotted path; substituted values
//! are stripped of surrounding slashes so a field value can never inject
//! extra path segments. Failures are per-record: the caller drops the one
//! page whose template cannot be resolved and moves on.

use crate::content::ContentObject;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

/// `{fieldPath}` placeholders in a path template.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex is valid"));

/// A template placeholder named a field that is absent, falsy, or not
/// usable as a path segment on the record.
#[derive(Debug, Clone, Error)]
#[error("page has no usable value in field '{field}'")]
pub struct MissingFieldError {
    pub field: String,
}

/// Resolve a path template against one content object.
///
/// Each `{fieldPath}` placeholder is looked up on the record (dotted
/// paths reach into nested values), rejected if falsy, stripped of
/// leading/trailing slashes and substituted. The final result carries
/// exactly one leading slash and no trailing slash; an empty result
/// normalizes to `/`.
pub fn interpolate(template: &str, record: &ContentObject) -> Result<String, MissingFieldError> {
    let mut resolved = String::with_capacity(template.len());
    let mut last_end = 0;

    for captures in PLACEHOLDER_RE.captures_iter(template) {
        let placeholder = captures.get(0).expect("capture 0 always present");
        let field = captures[1].trim();

        let value = record
            .lookup(field)
            .filter(|value| !is_falsy(value))
            .ok_or_else(|| MissingFieldError {
                field: field.to_string(),
            })?;
        let segment = scalar_segment(value).ok_or_else(|| MissingFieldError {
            field: field.to_string(),
        })?;

        resolved.push_str(&template[last_end..placeholder.start()]);
        resolved.push_str(segment.trim_matches('/'));
        last_end = placeholder.end();
    }
    resolved.push_str(&template[last_end..]);

    Ok(normalize_path(&resolved))
}

/// Collapse a path to a single leading slash and no trailing slash.
/// The empty path normalizes to `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Render a scalar value as a path segment. Composite values (objects,
/// arrays) have no segment rendering.
fn scalar_segment(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// JSON falsiness: null, false, 0, and the empty string.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
