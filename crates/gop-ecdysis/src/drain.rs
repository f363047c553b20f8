//! In-flight request tracking and the drain loop.
//!
//! The serving side holds a [`RequestGuard`] for every unit of work; the
//! drain loop only reads the count. Draining is plain fixed-interval polling:
//! no wakeups from the request path, so the loop works with any dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::signals::Control;

/// Default drain deadline.
pub const DEFAULT_WAIT_SECS: u64 = 60;

/// Default drain poll interval.
pub const DEFAULT_POLL_MSECS: u64 = 500;

/// Shared count of requests currently being served.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    count: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request as started. It finishes when the guard drops.
    pub fn guard(&self) -> RequestGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            count: Arc::clone(&self.count),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count on drop, whether the request succeeded,
/// failed or panicked.
#[derive(Debug)]
pub struct RequestGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Drain timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSettings {
    /// Give up after this long, pending requests or not.
    pub wait: Duration,
    /// How often to look at the in-flight count.
    pub poll: Duration,
}

impl Default for DrainSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(DEFAULT_WAIT_SECS),
            poll: Duration::from_millis(DEFAULT_POLL_MSECS),
        }
    }
}

/// How a drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The count hit zero on poll number `ticks` (0 if the deadline and an
    /// empty count coincided).
    Drained { ticks: u32 },
    /// The deadline passed with `pending` requests still running.
    TimedOut { pending: usize },
}

/// Poll `in_flight` every `settings.poll` until it is zero or `settings.wait`
/// has passed since the call.
///
/// The first poll happens one interval in. Control messages arriving while
/// draining are logged and dropped; the loop stops reading them once the
/// channel closes.
pub async fn drain(
    in_flight: &InFlight,
    settings: DrainSettings,
    controls: &mut mpsc::Receiver<Control>,
) -> DrainOutcome {
    let poll = settings.poll.max(Duration::from_millis(1));
    let start = Instant::now();
    let deadline = sleep(settings.wait);
    tokio::pin!(deadline);

    let mut ticker = interval_at(start + poll, poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut ticks = 0u32;
    let mut controls_open = true;

    info!(
        pending = in_flight.count(),
        wait_secs = settings.wait.as_secs(),
        poll_msecs = poll.as_millis() as u64,
        "Draining in-flight requests"
    );

    loop {
        tokio::select! {
            biased;

            _ = &mut deadline => {
                let pending = in_flight.count();
                if pending == 0 {
                    info!("Drain complete at deadline, no pending requests");
                    return DrainOutcome::Drained { ticks };
                }
                warn!(
                    pending,
                    wait_secs = settings.wait.as_secs(),
                    "Drain timed out, exiting with requests still pending"
                );
                return DrainOutcome::TimedOut { pending };
            }

            _ = ticker.tick() => {
                ticks += 1;
                let pending = in_flight.count();
                if pending == 0 {
                    info!(ticks, "Drain complete, no pending requests");
                    return DrainOutcome::Drained { ticks };
                }
                info!(pending, ticks, "Draining, requests still pending");
            }

            control = controls.recv(), if controls_open => {
                match control {
                    Some(control) => warn!(?control, "Already draining, ignoring control message"),
                    None => controls_open = false,
                }
            }
        }
    }
}
