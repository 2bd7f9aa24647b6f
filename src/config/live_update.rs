//! `[live_update]` section configuration.
//!
//! Controls the notification channel that tells running development
//! clients to refetch page props after a transform.

use super::{ExecMode, defaults};
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[live_update]` section in pagebridge.toml - change notification settings.
///
/// # Example
/// ```toml
/// [live_update]
/// enable = true
/// port = 8088
/// client_port = 443      # when the socket is proxied through the app server
/// event_name = "props_changed"
/// namespace = "/nextjs-live-updates"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LiveUpdateConfig {
    /// Enable the live update socket. Unset means "on in development
    /// mode, off otherwise".
    #[serde(default)]
    pub enable: Option<bool>,

    /// Port the notification socket binds (default: 8088).
    #[serde(default = "defaults::live_update::port")]
    #[educe(Default = defaults::live_update::port())]
    pub port: u16,

    /// Port advertised to clients. Defaults to `port`; set separately
    /// when a reverse proxy sits between the browser and the socket.
    #[serde(default)]
    pub client_port: Option<u16>,

    /// Name of the change event broadcast to clients.
    #[serde(default = "defaults::live_update::event_name")]
    #[educe(Default = defaults::live_update::event_name())]
    pub event_name: String,

    /// URL path clients connect to. Kept wire-compatible with existing
    /// hot-content-reload clients by default.
    #[serde(default = "defaults::live_update::namespace")]
    #[educe(Default = defaults::live_update::namespace())]
    pub namespace: String,
}

impl LiveUpdateConfig {
    /// Whether live update is on for the given execution mode.
    pub fn enabled(&self, mode: ExecMode) -> bool {
        self.enable.unwrap_or(mode.is_dev())
    }

    /// The port clients should dial.
    pub fn client_port(&self) -> u16 {
        self.client_port.unwrap_or(self.port)
    }
}
