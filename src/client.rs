//! Cache-reading data access client.
//!
//! The read side of the bridge: loads the cache file written by the
//! transform stage (tolerating a concurrent writer through bounded
//! retries) and serves page/props lookups by request path. One logical
//! instance per process, but explicitly constructed so tests and
//! embedders can hold independent instances.

use crate::config::{ExecMode, defaults};
use crate::content::{PropsBag, TransformedData};
use crate::interpolate::normalize_path;
use crate::log;
use crate::retry::RetryPolicy;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Overrides the cache file location on the reading side.
pub const ENV_CACHE_FILE: &str = "PAGEBRIDGE_CACHE_FILE";
/// Overrides the client-facing notification port.
pub const ENV_CLIENT_PORT: &str = "PAGEBRIDGE_CLIENT_PORT";
/// Overrides the notification namespace path.
pub const ENV_LIVE_UPDATE_PATH: &str = "PAGEBRIDGE_LIVE_UPDATE_PATH";
/// Overrides the change event name.
pub const ENV_LIVE_UPDATE_EVENT: &str = "PAGEBRIDGE_LIVE_UPDATE_EVENT";

/// The upstream pipeline may still be running when a reader starts, so
/// existence polling is patient.
const EXISTS_RETRY: RetryPolicy = RetryPolicy::new(10, Duration::from_millis(500));

/// A writer replacing the file mid-read resolves within milliseconds, so
/// parse retries are short and few.
const PARSE_RETRY: RetryPolicy = RetryPolicy::new(3, Duration::from_millis(5));

// ============================================================================
// Errors
// ============================================================================

/// Why a single cache read attempt failed.
#[derive(Debug, Error)]
pub enum CacheReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Data access failures surfaced to the rendering layer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(
        "cache file '{path}' was not found after {attempts} attempts. \
         Check that the content pipeline ran and wrote the cache before reading it."
    )]
    CacheNotFound { path: PathBuf, attempts: u32 },

    #[error(
        "cache file '{path}' could not be read after {attempts} attempts \
         (a concurrent writer is the usual suspect). \
         Check that the content pipeline completed successfully."
    )]
    CacheParse {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: CacheReadError,
    },
}

// ============================================================================
// Client
// ============================================================================

/// Resolve the cache path the reading side should use: environment
/// override first, then the configured path, then the default file in
/// the working directory.
pub fn resolve_cache_path(configured: Option<PathBuf>) -> PathBuf {
    if let Ok(overridden) = std::env::var(ENV_CACHE_FILE)
        && !overridden.is_empty()
    {
        return PathBuf::from(overridden);
    }
    configured.unwrap_or_else(defaults::cache::file)
}

/// Notification channel coordinates resolved from cache props plus
/// environment overrides, ready for a consuming client to dial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveUpdateChannel {
    pub port: u16,
    pub namespace: String,
    pub event_name: String,
}

/// Read-side accessor over the cache file.
pub struct DataClient {
    cache_path: PathBuf,
    mode: ExecMode,
    exists_retry: RetryPolicy,
    parse_retry: RetryPolicy,
}

impl DataClient {
    pub fn new(cache_path: PathBuf, mode: ExecMode) -> Self {
        Self {
            cache_path,
            mode,
            exists_retry: EXISTS_RETRY,
            parse_retry: PARSE_RETRY,
        }
    }

    /// Construct from the process environment alone (mode and cache
    /// path overrides).
    pub fn from_env() -> Self {
        Self::new(resolve_cache_path(None), ExecMode::detect())
    }

    /// Replace the retry budgets (tests and embedders with their own
    /// timing assumptions).
    pub fn with_retry_policies(mut self, exists: RetryPolicy, parse: RetryPolicy) -> Self {
        self.exists_retry = exists;
        self.parse_retry = parse;
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Load the full transformed document from the cache file.
    ///
    /// Polls for the file's existence with bounded retries, then parses
    /// with a shorter retry loop to absorb a mid-write race.
    pub fn get_data(&self) -> Result<TransformedData, ClientError> {
        let path = &self.cache_path;

        self.exists_retry
            .run(
                || if path.exists() { Ok(()) } else { Err(()) },
                |retry, _| {
                    log!(
                        "client";
                        "cache file '{}' was not found, waiting {}ms and retry #{retry}",
                        path.display(),
                        self.exists_retry.delay.as_millis()
                    );
                },
            )
            .map_err(|()| ClientError::CacheNotFound {
                path: path.clone(),
                attempts: self.exists_retry.max_attempts(),
            })?;

        self.parse_retry
            .run(
                || -> Result<TransformedData, CacheReadError> {
                    let content = fs::read_to_string(path)?;
                    Ok(serde_json::from_str(&content)?)
                },
                |retry, _| {
                    log!(
                        "client";
                        "cache file '{}' was not parsed, waiting {}ms and retry #{retry}",
                        path.display(),
                        self.parse_retry.delay.as_millis()
                    );
                },
            )
            .map_err(|source| ClientError::CacheParse {
                path: path.clone(),
                attempts: self.parse_retry.max_attempts(),
                source,
            })
    }

    /// Every page's path, in cache order.
    ///
    /// In development mode each non-root path is duplicated with a
    /// trailing slash so routing layers that distinguish the two
    /// variants resolve both.
    pub fn list_page_paths(&self) -> Result<Vec<String>, ClientError> {
        let data = self.get_data()?;
        let mut paths: Vec<String> = data
            .pages
            .iter()
            .filter_map(|page| page.path.clone())
            .collect();

        if self.mode.is_dev() {
            let with_trailing: Vec<String> = paths
                .iter()
                .filter(|path| path.as_str() != "/")
                .map(|path| format!("{path}/"))
                .collect();
            paths.extend(with_trailing);
        }

        Ok(paths)
    }

    /// Merged props for the page at `path`.
    pub fn props_for_path(&self, path: &str) -> Result<PropsBag, ClientError> {
        let data = self.get_data()?;
        Ok(props_from_data(&data, path))
    }

    /// Merged props for a path given as individual segments, as routing
    /// frameworks deliver catch-all parameters.
    pub fn props_for_segments<S: AsRef<str>>(
        &self,
        segments: &[S],
    ) -> Result<PropsBag, ClientError> {
        let joined = segments
            .iter()
            .map(|segment| segment.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        self.props_for_path(&joined)
    }

    /// Notification channel coordinates for a consuming client, if live
    /// update was enabled at transform time. Environment overrides win
    /// over the values embedded in the cache.
    pub fn live_update_channel(&self) -> Result<Option<LiveUpdateChannel>, ClientError> {
        let data = self.get_data()?;
        if data.props.get("liveUpdate") != Some(&Value::Bool(true)) {
            return Ok(None);
        }

        let port = std::env::var(ENV_CLIENT_PORT)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .or_else(|| {
                data.props
                    .get("liveUpdatePort")
                    .and_then(Value::as_u64)
                    .and_then(|port| u16::try_from(port).ok())
            })
            .unwrap_or_else(defaults::live_update::port);

        let namespace = std::env::var(ENV_LIVE_UPDATE_PATH).ok().unwrap_or_else(|| {
            data.props
                .get("liveUpdateNamespace")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(defaults::live_update::namespace)
        });

        let event_name = std::env::var(ENV_LIVE_UPDATE_EVENT).ok().unwrap_or_else(|| {
            data.props
                .get("liveUpdateEventName")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(defaults::live_update::event_name)
        });

        Ok(Some(LiveUpdateChannel {
            port,
            namespace,
            event_name,
        }))
    }
}

/// Merged props for `path` against already-loaded data.
///
/// The requested path is normalized (single leading slash, no trailing
/// slash) and matched exactly. The page entry's own props are flattened
/// over the common props - page-level values win on key collision - and
/// the entry's `path` and `page` ride along. Without a matching page,
/// the common props alone are returned.
pub fn props_from_data(data: &TransformedData, path: &str) -> PropsBag {
    let requested = normalize_path(path);
    let mut merged = data.props.clone();

    if let Some(entry) = data
        .pages
        .iter()
        .find(|page| page.path.as_deref() == Some(requested.as_str()))
    {
        for (key, value) in &entry.props {
            merged.insert(key.clone(), value.clone());
        }
        merged.insert("page".into(), entry.page.clone().into());
        merged.insert("path".into(), Value::String(requested));
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentObject, PageEntry};
    use serde_json::json;
    use std::fs;

    const INSTANT: RetryPolicy = RetryPolicy::new(2, Duration::ZERO);

    fn sample_data() -> TransformedData {
        let page: ContentObject =
            serde_json::from_value(json!({ "slug": "my-post" })).unwrap();
        TransformedData {
            objects: vec![page.clone()],
            props: serde_json::from_value(json!({ "siteName": "Y" })).unwrap(),
            pages: vec![
                PageEntry {
                    path: Some("/".into()),
                    page: page.clone(),
                    props: PropsBag::new(),
                },
                PageEntry {
                    path: Some("/blog/my-post".into()),
                    page,
                    props: serde_json::from_value(json!({ "title": "X" })).unwrap(),
                },
            ],
        }
    }

    fn write_cache(dir: &Path, data: &TransformedData) -> PathBuf {
        let path = dir.join("cache.json");
        fs::write(&path, serde_json::to_vec(data).unwrap()).unwrap();
        path
    }

    fn client(path: PathBuf, mode: ExecMode) -> DataClient {
        DataClient::new(path, mode).with_retry_policies(INSTANT, INSTANT)
    }

    #[test]
    fn test_get_data_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let data = client(path, ExecMode::Production).get_data().unwrap();
        assert_eq!(data, sample_data());
    }

    #[test]
    fn test_missing_cache_fails_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let err = client(dir.path().join("nope.json"), ExecMode::Production)
            .get_data()
            .unwrap_err();
        match err {
            ClientError::CacheNotFound { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_cache_fails_with_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ truncated").unwrap();

        let err = client(path, ExecMode::Production).get_data().unwrap_err();
        assert!(matches!(err, ClientError::CacheParse { .. }));
    }

    #[test]
    fn test_list_page_paths_production() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let paths = client(path, ExecMode::Production)
            .list_page_paths()
            .unwrap();
        assert_eq!(paths, vec!["/", "/blog/my-post"]);
    }

    #[test]
    fn test_list_page_paths_dev_duplicates_non_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let paths = client(path, ExecMode::Development)
            .list_page_paths()
            .unwrap();
        assert_eq!(paths, vec!["/", "/blog/my-post", "/blog/my-post/"]);
    }

    #[test]
    fn test_unpathed_entries_excluded_from_paths() {
        let mut data = sample_data();
        data.pages.push(PageEntry {
            path: None,
            page: serde_json::from_value(json!({})).unwrap(),
            props: PropsBag::new(),
        });
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &data);
        let paths = client(path, ExecMode::Production)
            .list_page_paths()
            .unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_props_round_trip_without_leading_slash() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let props = client(path, ExecMode::Production)
            .props_for_path("blog/my-post")
            .unwrap();

        assert_eq!(props["title"], json!("X"));
        assert_eq!(props["siteName"], json!("Y"));
        assert_eq!(props["path"], json!("/blog/my-post"));
        assert_eq!(props["page"]["slug"], json!("my-post"));
    }

    #[test]
    fn test_props_from_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let props = client(path, ExecMode::Production)
            .props_for_segments(&["blog", "my-post"])
            .unwrap();
        assert_eq!(props["title"], json!("X"));
    }

    #[test]
    fn test_page_props_win_over_common_props() {
        let mut data = sample_data();
        data.props.insert("title".into(), json!("common"));
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &data);
        let props = client(path, ExecMode::Production)
            .props_for_path("/blog/my-post")
            .unwrap();
        assert_eq!(props["title"], json!("X"));
    }

    #[test]
    fn test_unknown_path_returns_common_props_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let props = client(path, ExecMode::Production)
            .props_for_path("/nowhere")
            .unwrap();
        assert_eq!(props["siteName"], json!("Y"));
        assert!(!props.contains_key("page"));
    }

    #[test]
    fn test_live_update_channel_from_props_and_env() {
        let mut data = sample_data();
        data.props.insert("liveUpdate".into(), json!(true));
        data.props.insert("liveUpdatePort".into(), json!(8088));
        data.props
            .insert("liveUpdateEventName".into(), json!("props_changed"));
        data.props
            .insert("liveUpdateNamespace".into(), json!("/nextjs-live-updates"));

        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &data);
        let reader = client(path, ExecMode::Development);

        let channel = reader.live_update_channel().unwrap().unwrap();
        assert_eq!(
            channel,
            LiveUpdateChannel {
                port: 8088,
                namespace: "/nextjs-live-updates".into(),
                event_name: "props_changed".into(),
            }
        );

        // Environment overrides win over cache-embedded values.
        unsafe {
            std::env::set_var(ENV_CLIENT_PORT, "9999");
            std::env::set_var(ENV_LIVE_UPDATE_PATH, "/proxied");
            std::env::set_var(ENV_LIVE_UPDATE_EVENT, "content_changed");
        }
        let channel = reader.live_update_channel().unwrap().unwrap();
        unsafe {
            std::env::remove_var(ENV_CLIENT_PORT);
            std::env::remove_var(ENV_LIVE_UPDATE_PATH);
            std::env::remove_var(ENV_LIVE_UPDATE_EVENT);
        }
        assert_eq!(
            channel,
            LiveUpdateChannel {
                port: 9999,
                namespace: "/proxied".into(),
                event_name: "content_changed".into(),
            }
        );
    }

    #[test]
    fn test_read_racing_writer_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ \"objects\": [").unwrap();

        let valid = serde_json::to_vec(&sample_data()).unwrap();
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            let tmp = writer_path.with_extension("json.tmp");
            fs::write(&tmp, &valid).unwrap();
            fs::rename(&tmp, &writer_path).unwrap();
        });

        let reader = DataClient::new(path, ExecMode::Production).with_retry_policies(
            INSTANT,
            RetryPolicy::new(5, Duration::from_millis(50)),
        );
        let data = reader.get_data().unwrap();
        writer.join().unwrap();
        assert_eq!(data, sample_data());
    }

    #[test]
    fn test_resolve_cache_path_env_override() {
        assert_eq!(
            resolve_cache_path(Some(PathBuf::from("configured.json"))),
            PathBuf::from("configured.json")
        );
        assert_eq!(
            resolve_cache_path(None),
            PathBuf::from(".pagebridge-cache.json")
        );

        unsafe { std::env::set_var(ENV_CACHE_FILE, "/tmp/override.json") };
        let resolved = resolve_cache_path(Some(PathBuf::from("configured.json")));
        unsafe { std::env::remove_var(ENV_CACHE_FILE) };
        assert_eq!(resolved, PathBuf::from("/tmp/override.json"));
    }

    #[test]
    fn test_live_update_channel_absent_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_cache(dir.path(), &sample_data());
        let channel = client(path, ExecMode::Production)
            .live_update_channel()
            .unwrap();
        assert!(channel.is_none());
    }
}
