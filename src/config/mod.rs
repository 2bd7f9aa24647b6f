//! Bridge configuration management for `pagebridge.toml`.
//!
//! # Sections
//!
//! | Section         | Purpose                                         |
//! |-----------------|-------------------------------------------------|
//! | `[cache]`       | Cache file location                             |
//! | `[live_update]` | Change notification socket (port, event, path)  |
//! | `[transform]`   | Reduction options (asset flattening, policies)  |
//! | `[[pages]]`     | Declarative page-type definitions               |
//! | `[props]`       | Common props attached to every page             |
//! | `[serve]`       | Watch pipeline input                            |
//!
//! # Example
//!
//! ```toml
//! [cache]
//! file = ".pagebridge-cache.json"
//!
//! [live_update]
//! port = 8088
//!
//! [[pages]]
//! path = "/blog/{slug}"
//! predicate = { model = "post" }
//!
//! [props.siteConfig]
//! single = true
//! predicate = { model = "config" }
//! ```

mod cache;
pub mod defaults;
mod error;
mod live_update;
mod pages;
mod serve;
mod transform;

// Re-export public types used by other modules
pub use cache::CacheConfig;
pub use error::ConfigError;
pub use live_update::LiveUpdateConfig;
pub use pages::{PageTypeDef, Predicate, PropDef, PropsMap};
pub use serve::ServeConfig;
pub use transform::{PathFailurePolicy, TransformConfig};

use crate::cli::{Cli, Commands};
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Environment variable selecting the execution mode.
pub const ENV_MODE: &str = "PAGEBRIDGE_ENV";

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

// ============================================================================
// Execution Mode
// ============================================================================

/// Execution mode, resolved from the `PAGEBRIDGE_ENV` environment variable.
///
/// Development mode turns live update on by default and makes the data
/// client tolerate trailing-slash route variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    Development,
    #[default]
    Production,
}

impl ExecMode {
    /// Resolve the mode from the process environment.
    pub fn detect() -> Self {
        match std::env::var(ENV_MODE).as_deref() {
            Ok("development") => ExecMode::Development,
            _ => ExecMode::Production,
        }
    }

    pub fn is_dev(self) -> bool {
        self == ExecMode::Development
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing pagebridge.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Execution mode (resolved from the environment, not the file)
    #[serde(skip)]
    pub mode: ExecMode,

    /// Cache file settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Change notification settings
    #[serde(default)]
    pub live_update: LiveUpdateConfig,

    /// Reduction settings
    #[serde(default)]
    pub transform: TransformConfig,

    /// Ordered page-type definitions
    #[serde(default)]
    pub pages: Vec<PageTypeDef>,

    /// Common props attached to every page
    #[serde(default)]
    pub props: PropsMap,

    /// Watch pipeline settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl BridgeConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let mut config: BridgeConfig = toml::from_str(content).map_err(ConfigError::from)?;
        config.mode = ExecMode::detect();
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.cache.file, cli.cache.as_ref());

        match &cli.command {
            Commands::Transform { input } => {
                Self::update_option(&mut self.serve.input, input.as_ref());
            }
            Commands::Serve { input, port } => {
                Self::update_option(&mut self.serve.input, input.as_ref());
                Self::update_option(&mut self.live_update.port, port.as_ref());
            }
            _ => {}
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate configuration consistency after loading and CLI merge.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.file.as_os_str().is_empty() {
            return Err(invalid("cache file path must not be empty"));
        }
        if self.live_update.port == 0 {
            return Err(invalid("live update port must not be 0"));
        }
        if self.live_update.event_name.is_empty() {
            return Err(invalid("live update event name must not be empty"));
        }
        if !self.live_update.namespace.starts_with('/') {
            return Err(invalid(format!(
                "live update namespace must start with '/', got '{}'",
                self.live_update.namespace
            )));
        }
        for def in &self.pages {
            if def.path.is_empty() {
                return Err(invalid("page type path template must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_valid() {
        let config = BridgeConfig::from_str("").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_full_config_round_trip() {
        let config = BridgeConfig::from_str(
            r#"
            [cache]
            file = "out/cache.json"

            [live_update]
            enable = true
            port = 9000
            event_name = "content_changed"
            namespace = "/updates"

            [transform]
            flatten_asset_urls = true

            [[pages]]
            path = "/blog/{slug}"
            predicate = { model = "post" }

            [[pages]]
            predicate = { model = "page" }

            [props.header]
            single = true
            predicate = { model = "header" }

            [serve]
            input = "objects.json"
        "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.pages[0].path, "/blog/{slug}");
        assert_eq!(config.pages[1].path, "/{slug}");
        assert!(config.props.contains_key("header"));
        assert_eq!(config.live_update.port, 9000);
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        let config = BridgeConfig::from_str(
            r#"
            [live_update]
            namespace = "no-leading-slash"
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_port_rejected() {
        let config = BridgeConfig::from_str(
            r#"
            [live_update]
            port = 0
        "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_top_level_section_rejected() {
        let result = BridgeConfig::from_str(
            r#"
            [unknown]
            key = "value"
        "#,
        );
        assert!(result.is_err());
    }
}
