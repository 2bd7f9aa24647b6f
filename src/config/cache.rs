//! `[cache]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[cache]` section in pagebridge.toml - cache file settings.
///
/// The cache file is the single JSON artifact that decouples the content
/// transform stage from the page-rendering stage.
///
/// # Example
/// ```toml
/// [cache]
/// file = "~/.cache/site/props.json"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Cache file path. Relative paths resolve against the working
    /// directory; `~` is expanded.
    #[serde(default = "defaults::cache::file")]
    #[educe(Default = defaults::cache::file())]
    pub file: PathBuf,
}

impl CacheConfig {
    /// Resolve the configured cache path, expanding `~`.
    pub fn resolve(&self) -> PathBuf {
        let raw = self.file.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::super::BridgeConfig;

    #[test]
    fn test_cache_config_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(
            config.cache.file.to_string_lossy(),
            ".pagebridge-cache.json"
        );
    }

    #[test]
    fn test_cache_config_custom_file() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [cache]
            file = "out/props.json"
        "#,
        )
        .unwrap();
        assert_eq!(config.cache.file.to_string_lossy(), "out/props.json");
    }

    #[test]
    fn test_cache_unknown_field_rejection() {
        let result: Result<BridgeConfig, _> = toml::from_str(
            r#"
            [cache]
            files = "typo.json"
        "#,
        );
        assert!(result.is_err());
    }
}
