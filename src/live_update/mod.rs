//! Live update notification.
//!
//! Bridges the cache writer to long-lived socket clients:
//!
//! ```text
//! transform ──publish──▶ ChangeBus ──channel──▶ connection threads
//!                                                    │
//!                                                    ▼
//!                                          WebSocket send(event_name)
//! ```
//!
//! The bus is an explicitly constructed service with a documented
//! single-instance-per-process lifecycle: the transformer owns one and
//! hands it to the socket server at bootstrap. Tests construct their own
//! instances freely.

mod bus;
mod server;

pub use bus::ChangeBus;
pub use server::{ServerHandle, start_server};
