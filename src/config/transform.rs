//! `[transform]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// Policy for a callback-built page entry whose path fails interpolation.
///
/// Two generations of this pipeline shipped different behaviors; both are
/// kept available and the choice is explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathFailurePolicy {
    /// Keep the entry unmodified (possibly unpathed).
    #[default]
    PassThrough,
    /// Discard the entry.
    Drop,
}

/// `[transform]` section in pagebridge.toml - reduction settings.
///
/// # Example
/// ```toml
/// [transform]
/// flatten_asset_urls = true
/// path_failure = "drop"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TransformConfig {
    /// Replace embedded asset references below the top level with their
    /// bare URL string.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub flatten_asset_urls: bool,

    /// What to do when a callback reducer produces a page entry whose
    /// path template cannot be interpolated.
    #[serde(default)]
    pub path_failure: PathFailurePolicy,
}
