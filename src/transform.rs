//! Cache writer and pipeline orchestration.
//!
//! `Transformer` is the write side of the bridge: it reduces a content
//! object set, persists the result to the cache file, and publishes a
//! change event for connected dev clients. One instance per process; it
//! owns the change bus and starts the notifier socket at bootstrap.

use crate::config::BridgeConfig;
use crate::content::{ContentObject, TransformedData};
use crate::live_update::{ChangeBus, ServerHandle, start_server};
use crate::log;
use crate::mapper::flatten_objects;
use crate::reduce::{PagesReducer, PropsReducer, ReduceSpecs, reduce};
use anyhow::{Context, Result};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Write side of the data bridge.
pub struct Transformer {
    config: BridgeConfig,
    bus: Arc<ChangeBus>,
    pages_reducer: Option<Box<dyn PagesReducer>>,
    props_reducer: Option<Box<dyn PropsReducer>>,
    server: Option<ServerHandle>,
}

impl Transformer {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            bus: Arc::new(ChangeBus::new()),
            pages_reducer: None,
            props_reducer: None,
            server: None,
        }
    }

    /// Register a callback pages reducer, replacing the declarative
    /// `[[pages]]` specs.
    pub fn with_pages_reducer(mut self, reducer: Box<dyn PagesReducer>) -> Self {
        self.pages_reducer = Some(reducer);
        self
    }

    /// Register a callback props reducer, replacing the declarative
    /// `[props]` map.
    pub fn with_props_reducer(mut self, reducer: Box<dyn PropsReducer>) -> Self {
        self.props_reducer = Some(reducer);
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The change bus this transformer publishes on.
    pub fn bus(&self) -> Arc<ChangeBus> {
        Arc::clone(&self.bus)
    }

    fn live_update_enabled(&self) -> bool {
        self.config.live_update.enabled(self.config.mode)
    }

    /// Prepare the process for pipeline runs: remove any stale cache
    /// file and, when live update is enabled, start the notifier socket.
    /// The socket starts exactly once; repeated calls are no-ops for it.
    pub fn bootstrap(&mut self) -> Result<()> {
        let cache_path = self.config.cache.resolve();
        match fs::remove_file(&cache_path) {
            Ok(()) => log!("transform"; "removed stale cache '{}'", cache_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to remove stale cache '{}'", cache_path.display())
                });
            }
        }

        if self.live_update_enabled() && self.server.is_none() {
            let handle = start_server(&self.config.live_update, Arc::clone(&self.bus))?;
            self.server = Some(handle);
        }

        Ok(())
    }

    /// One full pipeline run: flatten, reduce, persist, notify.
    ///
    /// The cache write replaces any prior content; readers only ever see
    /// a complete document (see [`write_cache`]).
    pub fn transform(&self, objects: Vec<ContentObject>) -> Result<TransformedData> {
        let objects = if self.config.transform.flatten_asset_urls {
            flatten_objects(objects)
        } else {
            objects
        };

        let specs = ReduceSpecs {
            page_types: &self.config.pages,
            common_props: &self.config.props,
            pages_reducer: self.pages_reducer.as_deref(),
            props_reducer: self.props_reducer.as_deref(),
            path_failure: self.config.transform.path_failure,
        };
        let mut data = reduce(objects, &specs);

        if self.live_update_enabled() {
            self.attach_live_update_props(&mut data);
        }

        let cache_path = self.config.cache.resolve();
        write_cache(&cache_path, &data)?;
        log!(
            "transform";
            "wrote {} pages to '{}'",
            data.pages.len(),
            cache_path.display()
        );

        if self.live_update_enabled() {
            self.bus.publish();
        }

        Ok(data)
    }

    /// Embed the notification channel into the common props so the
    /// client side can locate it without separate configuration.
    fn attach_live_update_props(&self, data: &mut TransformedData) {
        let live = &self.config.live_update;
        data.props.insert("liveUpdate".into(), true.into());
        data.props
            .insert("liveUpdatePort".into(), live.client_port().into());
        data.props
            .insert("liveUpdateEventName".into(), live.event_name.clone().into());
        data.props
            .insert("liveUpdateNamespace".into(), live.namespace.clone().into());
    }
}

/// Load content objects from the upstream pipeline's JSON output.
pub fn load_objects(path: &Path) -> Result<Vec<ContentObject>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read content input '{}'", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse content input '{}'", path.display()))
}

/// Persist the cache document atomically: serialize, write a sibling
/// temp file, rename over the target. A reader never observes a
/// truncated document.
fn write_cache(path: &Path, data: &TransformedData) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create cache directory '{}'", parent.display()))?;
    }

    let json = serde_json::to_vec(data).context("failed to serialize transformed data")?;
    let tmp = temp_sibling(path);
    fs::write(&tmp, &json)
        .with_context(|| format!("failed to write cache temp file '{}'", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move cache into place at '{}'", path.display()))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "cache".into());
    name.push(".tmp");
    path.with_file_name(name)
}
