//! # gop-ecdysis
//!
//! Zero-downtime restarts for a single listening socket.
//!
//! ## Overview
//!
//! 1. A cold start binds the configured address.
//! 2. On `SIGUSR2` the running process spawns a copy of itself that inherits
//!    the listener, and starts draining.
//! 3. The copy adopts the inherited socket without binding and sends
//!    `SIGQUIT` to its parent.
//! 4. The parent polls its in-flight counter until it reaches zero or the
//!    drain deadline passes, then exits.
//!
//! ## Signal Conventions
//!
//! - `SIGUSR2`: graceful restart
//! - `SIGUSR1`: log status
//! - `SIGTERM`, `SIGINT`, `SIGQUIT`: drain and exit without a successor
//!
//! ## Environment Variables
//!
//! - `GOP_LISTEN_FD`: inherited descriptor of the listening socket
//! - `GOP_LISTEN_PID`: pid of the previous generation
//! - `GOP_LISTEN_ADDR`: `<network>:<address>` of the listener
//!
//! ## Configuration (`[gop]` section)
//!
//! - `graceful_wait_secs` (default 60)
//! - `graceful_poll_msecs` (default 500)
//! - `graceful_stop_accepting` (default false)
//! - `listen_net` (default `tcp`), `listen_addr` (default `0.0.0.0:8080`)
//!
//! ## Platform
//!
//! This crate requires Unix (Linux / macOS). It will not compile on other platforms.

#[cfg(not(unix))]
compile_error!("gop-ecdysis requires a Unix platform (Linux or macOS)");

pub mod coordinator;
pub mod drain;
pub mod handoff;
pub mod platform;
pub mod signals;

pub use coordinator::{
    CoordinatorError, CoordinatorSettings, Phase, RestartCoordinator, ServeContext,
};
pub use drain::{drain, DrainOutcome, DrainSettings, InFlight, RequestGuard};
pub use handoff::{EnvSource, HandoffToken, ListenAddr, Network, ProcessEnv};
pub use platform::{Platform, UnixPlatform};
pub use signals::{spawn_forwarder, Control};
