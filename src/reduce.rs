//! Props/pages reduction.
//!
//! Classifies content objects into page entries and aggregated common
//! props, either through the declarative specs in the config file or
//! through registered callback reducers (the escape hatch for pipelines
//! whose rules cannot be expressed as predicates).
//!
//! Ordering guarantees: page entries preserve the relative order of
//! page-type definitions, and within a page type, the source order of
//! matching objects. Props take matches in source order.

use crate::config::{PageTypeDef, PathFailurePolicy, PropsMap};
use crate::content::{ContentObject, PageEntry, PropsBag, TransformedData};
use crate::interpolate::{MissingFieldError, interpolate};
use crate::log;
use crate::utils::slug::slugify;
use serde_json::Value;

// ============================================================================
// Callback Reducers
// ============================================================================

/// Capabilities handed to callback reducers.
///
/// Keeps user code on the same interpolation and slug rules as the
/// declarative path.
pub struct Helpers {
    _private: (),
}

impl Helpers {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }

    /// URL-safe slug of arbitrary text.
    pub fn slugify(&self, text: &str) -> String {
        slugify(text)
    }

    /// Resolve a path template against a content object.
    pub fn interpolate(
        &self,
        template: &str,
        record: &ContentObject,
    ) -> Result<String, MissingFieldError> {
        interpolate(template, record)
    }
}

/// Callback replacement for the declarative `[[pages]]` specs.
///
/// Entries may carry a `path` that is itself a template; every path is
/// re-validated through the interpolator after the callback returns (see
/// [`PathFailurePolicy`] for what happens when that fails).
pub trait PagesReducer: Send + Sync {
    fn reduce_pages(&self, objects: &[ContentObject], helpers: &Helpers) -> Vec<PageEntry>;
}

/// Callback replacement for the declarative `[props]` map.
pub trait PropsReducer: Send + Sync {
    fn reduce_props(&self, objects: &[ContentObject], helpers: &Helpers) -> PropsBag;
}

impl<F> PagesReducer for F
where
    F: Fn(&[ContentObject], &Helpers) -> Vec<PageEntry> + Send + Sync,
{
    fn reduce_pages(&self, objects: &[ContentObject], helpers: &Helpers) -> Vec<PageEntry> {
        self(objects, helpers)
    }
}

impl<F> PropsReducer for F
where
    F: Fn(&[ContentObject], &Helpers) -> PropsBag + Send + Sync,
{
    fn reduce_props(&self, objects: &[ContentObject], helpers: &Helpers) -> PropsBag {
        self(objects, helpers)
    }
}

// ============================================================================
// Reduction
// ============================================================================

/// Declarative and callback specs for one reduction run.
pub struct ReduceSpecs<'a> {
    pub page_types: &'a [PageTypeDef],
    pub common_props: &'a PropsMap,
    pub pages_reducer: Option<&'a dyn PagesReducer>,
    pub props_reducer: Option<&'a dyn PropsReducer>,
    pub path_failure: PathFailurePolicy,
}

/// Reduce a content object set into pages and props.
///
/// Callback reducers, when registered, take over their half entirely;
/// otherwise the declarative specs are interpreted.
pub fn reduce(objects: Vec<ContentObject>, specs: &ReduceSpecs) -> TransformedData {
    let helpers = Helpers::new();

    let props = match specs.props_reducer {
        Some(reducer) => reducer.reduce_props(&objects, &helpers),
        None => reduce_props_map(specs.common_props, &objects),
    };

    let pages = match specs.pages_reducer {
        Some(reducer) => revalidate_paths(
            reducer.reduce_pages(&objects, &helpers),
            specs.path_failure,
        ),
        None => reduce_page_types(specs.page_types, &objects),
    };

    TransformedData {
        objects,
        props,
        pages,
    }
}

/// Interpret a props map against the object set.
///
/// `single` props take the first match in source order and stay absent
/// when nothing matches; list props always materialize (possibly empty).
pub fn reduce_props_map(props_map: &PropsMap, objects: &[ContentObject]) -> PropsBag {
    let mut bag = PropsBag::new();
    for (name, def) in props_map {
        if def.single {
            if let Some(found) = objects.iter().find(|o| def.predicate.matches(o)) {
                bag.insert(name.clone(), found.clone().into());
            }
        } else {
            let matches: Vec<Value> = objects
                .iter()
                .filter(|o| def.predicate.matches(o))
                .map(|o| o.clone().into())
                .collect();
            bag.insert(name.clone(), Value::Array(matches));
        }
    }
    bag
}

/// Interpret the ordered page-type definitions.
///
/// An interpolation failure excludes exactly the one failing object,
/// never the whole page type. Per-page props are computed against the
/// entire object set, not the filtered subset.
fn reduce_page_types(page_types: &[PageTypeDef], objects: &[ContentObject]) -> Vec<PageEntry> {
    let mut entries = Vec::new();
    for def in page_types {
        for object in objects.iter().filter(|o| def.predicate.matches(o)) {
            match interpolate(&def.path, object) {
                Ok(path) => entries.push(PageEntry {
                    path: Some(path),
                    page: object.clone(),
                    props: reduce_props_map(&def.props, objects),
                }),
                Err(err) => {
                    log!("transform"; "dropping page for template '{}': {err}", def.path);
                }
            }
        }
    }
    entries
}

/// Re-validate callback-built entries through the interpolator.
///
/// An entry's `path` may be a template against its own page object.
/// Unpathed entries always pass through; failed interpolation applies
/// the configured policy.
fn revalidate_paths(entries: Vec<PageEntry>, policy: PathFailurePolicy) -> Vec<PageEntry> {
    entries
        .into_iter()
        .filter_map(|mut entry| {
            let Some(template) = entry.path.clone() else {
                return Some(entry);
            };
            match interpolate(&template, &entry.page) {
                Ok(path) => {
                    entry.path = Some(path);
                    Some(entry)
                }
                Err(err) => match policy {
                    PathFailurePolicy::PassThrough => Some(entry),
                    PathFailurePolicy::Drop => {
                        log!("transform"; "dropping callback page entry: {err}");
                        None
                    }
                },
            }
        })
        .collect()
}
