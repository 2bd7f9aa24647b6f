//! WebSocket server broadcasting change events to connected clients.
//!
//! Per-connection protocol:
//!
//! - a fresh client sends `"hello"`; the server echoes `"hello"` back
//!   (liveness confirmation only, no delivery guarantees)
//! - on every bus-level change event the server sends the configured
//!   event name to all currently connected clients (at-most-once; a
//!   client disconnected during broadcast discovers the change on its
//!   next connect or the next change)
//! - transport close discards the subscription
//!
//! Connections are rejected during the upgrade when the request path
//! does not match the configured namespace.

use super::ChangeBus;
use crate::config::LiveUpdateConfig;
use crate::log;
use anyhow::{Context, Result};
use std::{
    io::ErrorKind,
    net::{TcpListener, TcpStream},
    sync::{Arc, mpsc::TryRecvError},
    thread,
    time::Duration,
};
use tungstenite::{
    Error as WsError, Message,
    handshake::server::{ErrorResponse, Request, Response},
    http::StatusCode,
};

/// How often a connection thread checks the bus between socket reads.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handshake greeting exchanged by freshly connected clients.
const HELLO: &str = "hello";

/// Handle to a running notifier socket server.
///
/// The accept loop and connection threads run detached for the lifetime
/// of the process; the handle only reports where the server listens.
#[derive(Debug)]
pub struct ServerHandle {
    port: u16,
}

impl ServerHandle {
    /// Port the listener actually bound (resolves port 0 requests).
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Connection-thread view of the server configuration.
struct Shared {
    namespace: String,
    event_name: String,
    bus: Arc<ChangeBus>,
}

/// Bind the notifier socket and spawn its accept loop.
///
/// A failed bind is returned as an error so live update never silently
/// appears available when it is not.
pub fn start_server(config: &LiveUpdateConfig, bus: Arc<ChangeBus>) -> Result<ServerHandle> {
    let listener = TcpListener::bind(("0.0.0.0", config.port)).with_context(|| {
        format!(
            "failed to bind live update socket on port {}",
            config.port
        )
    })?;
    let port = listener
        .local_addr()
        .context("failed to read live update socket address")?
        .port();

    log!(
        "listener";
        "live update socket on port {port} with namespace '{}'",
        config.namespace
    );

    let shared = Arc::new(Shared {
        namespace: config.namespace.clone(),
        event_name: config.event_name.clone(),
        bus,
    });

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let shared = Arc::clone(&shared);
                    thread::spawn(move || {
                        if let Err(err) = handle_connection(stream, &shared) {
                            log!("listener"; "connection error: {err}");
                        }
                    });
                }
                Err(err) => log!("listener"; "accept error: {err}"),
            }
        }
    });

    Ok(ServerHandle { port })
}

/// Serve one client connection until it closes.
fn handle_connection(stream: TcpStream, shared: &Shared) -> Result<()> {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".into());

    let namespace = shared.namespace.clone();
    let mut socket = tungstenite::accept_hdr(stream, |request: &Request, response: Response| {
        if request.uri().path() == namespace {
            Ok(response)
        } else {
            let mut reject = ErrorResponse::new(Some(format!(
                "unknown live update namespace '{}'",
                request.uri().path()
            )));
            *reject.status_mut() = StatusCode::NOT_FOUND;
            Err(reject)
        }
    })
    .map_err(|err| anyhow::anyhow!("websocket handshake failed: {err}"))?;

    // Timeout applies after the handshake: the read loop doubles as the
    // bus poll loop.
    socket
        .get_ref()
        .set_read_timeout(Some(POLL_INTERVAL))
        .context("failed to set socket read timeout")?;

    let updates = shared.bus.subscribe();
    log!("listener"; "socket connected, peer: '{peer}'");

    loop {
        // Forward pending change events before the next read.
        loop {
            match updates.try_recv() {
                Ok(()) => {
                    log!("listener"; "got live update, sending '{}'", shared.event_name);
                    socket.send(Message::text(shared.event_name.clone()))?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    socket.close(None).ok();
                    return Ok(());
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) if text.as_str() == HELLO => {
                log!("listener"; "received 'hello', sending 'hello' back, peer: '{peer}'");
                socket.send(Message::text(HELLO))?;
            }
            Ok(Message::Close(_)) => {
                log!("listener"; "socket disconnected, peer: '{peer}'");
                return Ok(());
            }
            Ok(_) => {}
            Err(WsError::Io(err)) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                log!("listener"; "socket disconnected, peer: '{peer}'");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    }
}
