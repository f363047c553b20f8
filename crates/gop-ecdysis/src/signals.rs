//! OS signals → control messages.
//!
//! The coordinator never touches signals directly. A forwarder task turns
//! them into [`Control`] messages on an mpsc channel, which is also how tests
//! drive the state machine.
//!
//! - `SIGUSR2` → [`Control::Restart`]
//! - `SIGUSR1` → [`Control::Info`]
//! - `SIGTERM`, `SIGINT`, `SIGQUIT` → [`Control::Terminate`]

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A request delivered to the coordinator's control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Hand the listener to a new process, then drain and exit.
    Restart,
    /// Drain and exit without a successor.
    Terminate,
    /// Log a line, nothing else.
    Info,
}

/// Register signal handlers and forward them into `tx`.
///
/// Handlers are installed before this returns, so from then on none of the
/// signals above use their default disposition. The task ends when the
/// receiving side of `tx` is dropped.
pub fn spawn_forwarder(tx: mpsc::Sender<Control>) -> std::io::Result<JoinHandle<()>> {
    let mut restart = signal(SignalKind::user_defined2())?;
    let mut info_sig = signal(SignalKind::user_defined1())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        loop {
            let control = tokio::select! {
                _ = restart.recv() => {
                    info!("SIGUSR2 received");
                    Control::Restart
                }
                _ = info_sig.recv() => {
                    info!("SIGUSR1 received");
                    Control::Info
                }
                _ = terminate.recv() => {
                    info!("SIGTERM received");
                    Control::Terminate
                }
                _ = interrupt.recv() => {
                    info!("SIGINT received");
                    Control::Terminate
                }
                _ = quit.recv() => {
                    info!("SIGQUIT received");
                    Control::Terminate
                }
            };

            if tx.send(control).await.is_err() {
                debug!("Control channel closed, signal forwarder exiting");
                return;
            }
        }
    }))
}
