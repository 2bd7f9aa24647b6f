//! `[serve]` section configuration.
//!
//! Settings for the `serve` command, which watches the content input
//! file and re-runs the transform on change.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[serve]` section in pagebridge.toml - watch pipeline settings.
///
/// # Example
/// ```toml
/// [serve]
/// input = "content.json"
/// debounce_ms = 300
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Content objects JSON file produced by the upstream fetch stage.
    #[serde(default = "defaults::serve::input")]
    #[educe(Default = defaults::serve::input())]
    pub input: PathBuf,

    /// Milliseconds of quiet time before a burst of file events triggers
    /// a re-transform.
    #[serde(default = "defaults::serve::debounce_ms")]
    #[educe(Default = defaults::serve::debounce_ms())]
    pub debounce_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::super::BridgeConfig;

    #[test]
    fn test_serve_config_defaults() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.serve.input.to_string_lossy(), "content.json");
        assert_eq!(config.serve.debounce_ms, 300);
    }

    #[test]
    fn test_serve_config_custom() {
        let config: BridgeConfig = toml::from_str(
            r#"
            [serve]
            input = "fetched/objects.json"
            debounce_ms = 50
        "#,
        )
        .unwrap();
        assert_eq!(config.serve.input.to_string_lossy(), "fetched/objects.json");
        assert_eq!(config.serve.debounce_ms, 50);
    }

    #[test]
    fn test_serve_unknown_field_rejection() {
        let result: Result<BridgeConfig, _> = toml::from_str(
            r#"
            [serve]
            watch = true
        "#,
        );
        assert!(result.is_err());
    }
}
