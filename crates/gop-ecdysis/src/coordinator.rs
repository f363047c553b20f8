//! The restart coordinator state machine.
//!
//! ```text
//! StandaloneStart ─┐
//!                  ├─▶ Serving ──Restart──▶ RestartTriggered ─┐
//! AdoptedStart ────┘      │                                    ├─▶ Draining ─▶ Terminated
//!                         └──────────Terminate────────────────┘
//! ```
//!
//! The accept/serve loop keeps running while draining unless
//! `graceful_stop_accepting` is set, so during the drain window both process
//! generations may accept connections on the shared socket.

use std::future::Future;
use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use gop_config::ConfigStore;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::drain::{
    drain, DrainOutcome, DrainSettings, InFlight, DEFAULT_POLL_MSECS, DEFAULT_WAIT_SECS,
};
use crate::handoff::{EnvSource, HandoffToken, ListenAddr, Network};
use crate::platform::Platform;
use crate::signals::Control;

/// Config section holding the coordinator's keys.
pub const CONFIG_SECTION: &str = "gop";

/// Default listen address for a cold start.
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Errors that stop the coordinator. All of them are fatal to the process.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("invalid listen address: {0}")]
    InvalidListenAddr(String),

    #[error("can't bind {addr}: {source}")]
    Bind {
        addr: ListenAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("can't adopt inherited fd {fd}: {source}")]
    Adopt {
        fd: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("can't terminate parent process {pid}: {source}")]
    TerminateParent {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("listener setup failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("control channel closed while waiting for a restart signal")]
    ControlChannelClosed,
}

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    StandaloneStart,
    AdoptedStart,
    Serving,
    RestartTriggered,
    Draining,
    Terminated,
}

/// Coordinator tunables, normally read from the `gop` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub listen: ListenAddr,
    pub drain: DrainSettings,
    /// Stop the accept loop when draining starts. Off by default, so the old
    /// generation keeps accepting until it exits.
    pub stop_accepting_on_drain: bool,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            listen: ListenAddr::new(Network::Tcp, DEFAULT_LISTEN_ADDR),
            drain: DrainSettings::default(),
            stop_accepting_on_drain: false,
        }
    }
}

impl DrainSettings {
    /// Read `graceful_wait_secs` and `graceful_poll_msecs` from `cfg`.
    /// Negative values clamp to zero.
    ///
    /// # Panics
    ///
    /// Panics if either key is present but not an integer.
    pub fn from_config(cfg: &ConfigStore) -> Self {
        let (wait_secs, _) =
            cfg.get_int(CONFIG_SECTION, "graceful_wait_secs", DEFAULT_WAIT_SECS as i32);
        let (poll_msecs, _) =
            cfg.get_int(CONFIG_SECTION, "graceful_poll_msecs", DEFAULT_POLL_MSECS as i32);
        Self {
            wait: Duration::from_secs(u64::try_from(wait_secs).unwrap_or(0)),
            poll: Duration::from_millis(u64::try_from(poll_msecs).unwrap_or(0)),
        }
    }
}

impl CoordinatorSettings {
    /// Read settings from `cfg`.
    ///
    /// # Panics
    ///
    /// Panics if `graceful_wait_secs`, `graceful_poll_msecs` or
    /// `graceful_stop_accepting` is present but unparsable.
    pub fn from_config(cfg: &ConfigStore) -> Result<Self, CoordinatorError> {
        let drain = DrainSettings::from_config(cfg);
        let (stop_accepting_on_drain, _) =
            cfg.get_bool(CONFIG_SECTION, "graceful_stop_accepting", false);

        let (network, _) = cfg.get(CONFIG_SECTION, "listen_net", "tcp");
        let (address, _) = cfg.get(CONFIG_SECTION, "listen_addr", DEFAULT_LISTEN_ADDR);
        let network: Network = network.parse().map_err(CoordinatorError::InvalidListenAddr)?;
        if address.is_empty() {
            return Err(CoordinatorError::InvalidListenAddr("empty listen_addr".to_string()));
        }

        Ok(Self {
            listen: ListenAddr::new(network, address),
            drain,
            stop_accepting_on_drain,
        })
    }
}

/// Handles given to the accept/serve loop.
#[derive(Debug, Clone)]
pub struct ServeContext {
    /// Hold a guard from this for every request.
    pub in_flight: InFlight,
    /// Cancelled when draining starts, if stop-accepting-on-drain is enabled.
    pub stop_accepting: CancellationToken,
}

/// Owns the listening socket across one process generation.
pub struct RestartCoordinator<P> {
    platform: P,
    settings: CoordinatorSettings,
    in_flight: InFlight,
    stop_accepting: CancellationToken,
    phase: watch::Sender<Phase>,
    live_drain: Option<watch::Receiver<DrainSettings>>,
}

impl<P: Platform> RestartCoordinator<P> {
    /// Perform the startup transition and return the listener to serve on.
    ///
    /// With a complete handoff token in `env` the inherited socket is adopted
    /// and the parent is told to stop. Otherwise a fresh listener is bound.
    pub fn start<E: EnvSource + ?Sized>(
        platform: P,
        settings: CoordinatorSettings,
        env: &E,
    ) -> Result<(Self, StdTcpListener), CoordinatorError> {
        let (phase, listener) = match HandoffToken::from_env(env) {
            None => {
                info!(addr = %settings.listen, "No parent, starting listener");
                let listener = platform
                    .bind(&settings.listen)
                    .map_err(|source| CoordinatorError::Bind {
                        addr: settings.listen.clone(),
                        source,
                    })?;
                (Phase::StandaloneStart, listener)
            }
            Some(token) => {
                info!(
                    parent_pid = token.parent_pid,
                    fd = token.fd,
                    addr = %token.addr,
                    "Taking over listener from parent"
                );
                if token.addr != settings.listen {
                    warn!(
                        inherited = %token.addr,
                        configured = %settings.listen,
                        "Inherited listener differs from configured address, keeping inherited"
                    );
                }
                let listener = platform
                    .adopt(&token)
                    .map_err(|source| CoordinatorError::Adopt { fd: token.fd, source })?;
                platform
                    .terminate_parent(token.parent_pid)
                    .map_err(|source| CoordinatorError::TerminateParent {
                        pid: token.parent_pid,
                        source,
                    })?;
                info!(parent_pid = token.parent_pid, "Asked parent to terminate");
                (Phase::AdoptedStart, listener)
            }
        };

        let (phase, _) = watch::channel(phase);
        let coordinator = Self {
            platform,
            settings,
            in_flight: InFlight::new(),
            stop_accepting: CancellationToken::new(),
            phase,
            live_drain: None,
        };
        Ok((coordinator, listener))
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// The in-flight counter the drain loop will poll.
    pub fn in_flight(&self) -> InFlight {
        self.in_flight.clone()
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Take drain timings from `settings` instead of the startup values.
    ///
    /// The latest value is read when draining starts, so config reloads
    /// between startup and the restart signal apply to this generation.
    pub fn follow_drain_settings(&mut self, settings: watch::Receiver<DrainSettings>) {
        self.live_drain = Some(settings);
    }

    /// Drain timings in effect right now.
    pub fn drain_settings(&self) -> DrainSettings {
        match &self.live_drain {
            Some(live) => *live.borrow(),
            None => self.settings.drain,
        }
    }

    /// Serve until a restart or termination request, then drain.
    ///
    /// `serve` is spawned as its own task with the listener and is never
    /// awaited; it lives until the process exits. Returning from here means
    /// this generation is done and the caller should exit.
    pub async fn run<S, Fut>(
        self,
        listener: StdTcpListener,
        mut controls: mpsc::Receiver<Control>,
        serve: S,
    ) -> Result<DrainOutcome, CoordinatorError>
    where
        S: FnOnce(TcpListener, ServeContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // Kept for the successor; the serve loop gets the other handle.
        let handoff = listener.try_clone().map_err(CoordinatorError::Listener)?;
        listener
            .set_nonblocking(true)
            .map_err(CoordinatorError::Listener)?;
        let listener = TcpListener::from_std(listener).map_err(CoordinatorError::Listener)?;

        let context = ServeContext {
            in_flight: self.in_flight.clone(),
            stop_accepting: self.stop_accepting.clone(),
        };
        tokio::spawn(serve(listener, context));
        self.set_phase(Phase::Serving);

        let trigger = loop {
            match controls.recv().await {
                Some(Control::Info) => {
                    info!(pending = self.in_flight.count(), "Status requested, still serving");
                }
                Some(control) => break control,
                None => return Err(CoordinatorError::ControlChannelClosed),
            }
        };

        if trigger == Control::Restart {
            self.set_phase(Phase::RestartTriggered);
            error!("Signal received - starting graceful restart");
            match self.platform.spawn_successor(&handoff, &self.settings.listen) {
                Ok(pid) => info!(successor_pid = pid, "Successor started"),
                Err(e) => error!(error = %e, "Failed to start successor, draining without one"),
            }
        } else {
            info!("Termination requested, draining without a successor");
        }
        drop(handoff);

        if self.settings.stop_accepting_on_drain {
            info!("Stopping accept loop");
            self.stop_accepting.cancel();
        }

        let drain_settings = self.drain_settings();
        self.set_phase(Phase::Draining);
        let outcome = drain(&self.in_flight, drain_settings, &mut controls).await;

        self.set_phase(Phase::Terminated);
        info!(?outcome, "Process generation finished");
        Ok(outcome)
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::handoff::{ENV_ADDR, ENV_FD, ENV_PID};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Bind(String),
        Adopt(i32),
        Terminate(u32),
        Spawn(String),
    }

    #[derive(Default, Clone)]
    struct MockPlatform {
        calls: Arc<Mutex<Vec<Call>>>,
        fail_bind: bool,
        fail_terminate: bool,
        fail_spawn: bool,
    }

    impl MockPlatform {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    fn loopback() -> io::Result<StdTcpListener> {
        StdTcpListener::bind("127.0.0.1:0")
    }

    impl Platform for MockPlatform {
        fn bind(&self, addr: &ListenAddr) -> io::Result<StdTcpListener> {
            self.record(Call::Bind(addr.to_string()));
            if self.fail_bind {
                return Err(io::Error::from(io::ErrorKind::AddrInUse));
            }
            loopback()
        }

        fn adopt(&self, token: &HandoffToken) -> io::Result<StdTcpListener> {
            self.record(Call::Adopt(token.fd));
            loopback()
        }

        fn terminate_parent(&self, pid: u32) -> io::Result<()> {
            self.record(Call::Terminate(pid));
            if self.fail_terminate {
                return Err(io::Error::from(io::ErrorKind::PermissionDenied));
            }
            Ok(())
        }

        fn spawn_successor(
            &self,
            _listener: &StdTcpListener,
            addr: &ListenAddr,
        ) -> io::Result<u32> {
            self.record(Call::Spawn(addr.to_string()));
            if self.fail_spawn {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            Ok(4243)
        }
    }

    fn settings() -> CoordinatorSettings {
        CoordinatorSettings {
            listen: ListenAddr::new(Network::Tcp, "127.0.0.1:8080"),
            drain: DrainSettings {
                wait: Duration::from_secs(60),
                poll: Duration::from_millis(500),
            },
            stop_accepting_on_drain: false,
        }
    }

    fn no_env() -> HashMap<String, String> {
        HashMap::new()
    }

    fn token_env() -> HashMap<String, String> {
        [
            (ENV_FD, "5"),
            (ENV_PID, "4242"),
            (ENV_ADDR, "tcp:127.0.0.1:8080"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    async fn idle(_listener: TcpListener, _ctx: ServeContext) {}

    #[test]
    fn test_standalone_start_binds() {
        let platform = MockPlatform::default();
        let (coordinator, _listener) =
            RestartCoordinator::start(platform.clone(), settings(), &no_env()).unwrap();

        assert_eq!(coordinator.phase(), Phase::StandaloneStart);
        assert_eq!(platform.calls(), vec![Call::Bind("tcp:127.0.0.1:8080".into())]);
    }

    #[test]
    fn test_adopted_start_adopts_and_terminates_parent_without_binding() {
        let platform = MockPlatform::default();
        let (coordinator, _listener) =
            RestartCoordinator::start(platform.clone(), settings(), &token_env()).unwrap();

        assert_eq!(coordinator.phase(), Phase::AdoptedStart);
        assert_eq!(platform.calls(), vec![Call::Adopt(5), Call::Terminate(4242)]);
    }

    #[test]
    fn test_incomplete_token_falls_back_to_bind() {
        for missing in [ENV_FD, ENV_PID, ENV_ADDR] {
            let platform = MockPlatform::default();
            let mut env = token_env();
            env.remove(missing);

            let (coordinator, _listener) =
                RestartCoordinator::start(platform.clone(), settings(), &env).unwrap();

            assert_eq!(coordinator.phase(), Phase::StandaloneStart);
            assert_eq!(
                platform.calls(),
                vec![Call::Bind("tcp:127.0.0.1:8080".into())],
                "without {missing}"
            );
        }
    }

    #[test]
    fn test_bind_failure_is_fatal() {
        let platform = MockPlatform {
            fail_bind: true,
            ..Default::default()
        };
        let result = RestartCoordinator::start(platform, settings(), &no_env());
        assert!(matches!(result, Err(CoordinatorError::Bind { .. })));
    }

    #[test]
    fn test_parent_termination_failure_is_fatal() {
        let platform = MockPlatform {
            fail_terminate: true,
            ..Default::default()
        };
        let result = RestartCoordinator::start(platform, settings(), &token_env());
        assert!(matches!(
            result,
            Err(CoordinatorError::TerminateParent { pid: 4242, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_spawns_successor_then_drains() {
        let platform = MockPlatform::default();
        let (coordinator, listener) =
            RestartCoordinator::start(platform.clone(), settings(), &no_env()).unwrap();
        let phases = coordinator.subscribe();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();

        let outcome = coordinator.run(listener, rx, idle).await.unwrap();

        assert_eq!(outcome, DrainOutcome::Drained { ticks: 1 });
        assert_eq!(*phases.borrow(), Phase::Terminated);
        assert_eq!(
            platform.calls(),
            vec![
                Call::Bind("tcp:127.0.0.1:8080".into()),
                Call::Spawn("tcp:127.0.0.1:8080".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_failure_still_drains() {
        let platform = MockPlatform {
            fail_spawn: true,
            ..Default::default()
        };
        let (coordinator, listener) =
            RestartCoordinator::start(platform.clone(), settings(), &no_env()).unwrap();
        let guard = coordinator.in_flight().guard();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2800)).await;
            drop(guard);
        });

        let outcome = coordinator.run(listener, rx, idle).await.unwrap();
        assert_eq!(outcome, DrainOutcome::Drained { ticks: 6 });
        assert!(platform.calls().contains(&Call::Spawn("tcp:127.0.0.1:8080".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_restart_is_consumed_once() {
        let platform = MockPlatform::default();
        let (coordinator, listener) =
            RestartCoordinator::start(platform.clone(), settings(), &no_env()).unwrap();
        let guard = coordinator.in_flight().guard();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();
        tx.send(Control::Restart).await.unwrap();
        tx.send(Control::Restart).await.unwrap();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(800)).await;
            drop(guard);
        });

        let outcome = coordinator.run(listener, rx, idle).await.unwrap();
        assert_eq!(outcome, DrainOutcome::Drained { ticks: 2 });

        let spawns = platform
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Spawn(_)))
            .count();
        assert_eq!(spawns, 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminate_drains_without_successor() {
        let platform = MockPlatform::default();
        let (coordinator, listener) =
            RestartCoordinator::start(platform.clone(), settings(), &no_env()).unwrap();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Info).await.unwrap();
        tx.send(Control::Terminate).await.unwrap();

        let outcome = coordinator.run(listener, rx, idle).await.unwrap();
        assert_eq!(outcome, DrainOutcome::Drained { ticks: 1 });
        assert!(!platform.calls().iter().any(|c| matches!(c, Call::Spawn(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_request_times_out() {
        let platform = MockPlatform::default();
        let mut cfg = settings();
        cfg.drain.wait = Duration::from_secs(5);
        let (coordinator, listener) =
            RestartCoordinator::start(platform, cfg, &no_env()).unwrap();
        let _stuck = coordinator.in_flight().guard();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();

        let start = tokio::time::Instant::now();
        let outcome = coordinator.run(listener, rx, idle).await.unwrap();
        assert_eq!(outcome, DrainOutcome::TimedOut { pending: 1 });
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_uses_settings_changed_after_start() {
        let (mut coordinator, listener) =
            RestartCoordinator::start(MockPlatform::default(), settings(), &no_env()).unwrap();
        let (drain_tx, drain_rx) = watch::channel(coordinator.settings().drain);
        coordinator.follow_drain_settings(drain_rx);
        let _stuck = coordinator.in_flight().guard();

        let mut cfg = ConfigStore::default();
        cfg.add("gop", "graceful_wait_secs", "60");
        cfg.override_value("gop", "graceful_wait_secs", "3");
        drain_tx.send_replace(DrainSettings::from_config(&cfg));
        assert_eq!(coordinator.drain_settings().wait, Duration::from_secs(3));

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();

        let start = tokio::time::Instant::now();
        let outcome = coordinator.run(listener, rx, idle).await.unwrap();
        assert_eq!(outcome, DrainOutcome::TimedOut { pending: 1 });
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_drain_settings_default_to_startup_values() {
        let (coordinator, _listener) =
            RestartCoordinator::start(MockPlatform::default(), settings(), &no_env()).unwrap();
        assert_eq!(coordinator.drain_settings(), settings().drain);
    }

    #[test]
    fn test_drain_settings_from_config_clamps_negatives() {
        let mut cfg = ConfigStore::default();
        cfg.add("gop", "graceful_wait_secs", "-5");
        cfg.add("gop", "graceful_poll_msecs", "-1");
        let drain = DrainSettings::from_config(&cfg);
        assert_eq!(drain.wait, Duration::ZERO);
        assert_eq!(drain.poll, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_closed_control_channel_is_fatal() {
        let (coordinator, listener) =
            RestartCoordinator::start(MockPlatform::default(), settings(), &no_env()).unwrap();

        let (tx, rx) = mpsc::channel(1);
        drop(tx);

        let result = coordinator.run(listener, rx, idle).await;
        assert!(matches!(result, Err(CoordinatorError::ControlChannelClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accept_loop_keeps_running_while_draining_by_default() {
        let (coordinator, listener) =
            RestartCoordinator::start(MockPlatform::default(), settings(), &no_env()).unwrap();
        let (ctx_tx, ctx_rx) = tokio::sync::oneshot::channel();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();

        coordinator
            .run(listener, rx, move |_listener, ctx| async move {
                let _ = ctx_tx.send(ctx);
            })
            .await
            .unwrap();

        let ctx = ctx_rx.await.unwrap();
        assert!(!ctx.stop_accepting.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_accepting_on_drain() {
        let mut cfg = settings();
        cfg.stop_accepting_on_drain = true;
        let (coordinator, listener) =
            RestartCoordinator::start(MockPlatform::default(), cfg, &no_env()).unwrap();
        let (ctx_tx, ctx_rx) = tokio::sync::oneshot::channel();

        let (tx, rx) = mpsc::channel(4);
        tx.send(Control::Restart).await.unwrap();

        coordinator
            .run(listener, rx, move |_listener, ctx| async move {
                let _ = ctx_tx.send(ctx);
            })
            .await
            .unwrap();

        let ctx = ctx_rx.await.unwrap();
        assert!(ctx.stop_accepting.is_cancelled());
    }

    #[tokio::test]
    async fn test_serve_loop_receives_working_listener() {
        let (coordinator, listener) =
            RestartCoordinator::start(MockPlatform::default(), settings(), &no_env()).unwrap();
        let addr = listener.local_addr().unwrap();
        let in_flight = coordinator.in_flight();
        let (accepted_tx, accepted_rx) = tokio::sync::oneshot::channel();

        let (tx, rx) = mpsc::channel(4);
        let run = tokio::spawn(coordinator.run(listener, rx, move |listener, ctx| async move {
            let (_stream, _) = listener.accept().await.unwrap();
            let _guard = ctx.in_flight.guard();
            let _ = accepted_tx.send(ctx.in_flight.count());
            std::future::pending::<()>().await;
        }));

        let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
        assert_eq!(accepted_rx.await.unwrap(), 1);
        assert_eq!(in_flight.count(), 1);

        drop(tx);
        assert!(matches!(
            run.await.unwrap(),
            Err(CoordinatorError::ControlChannelClosed)
        ));
    }

    #[test]
    fn test_settings_from_config() {
        let mut cfg = ConfigStore::default();
        cfg.add("gop", "graceful_wait_secs", "10");
        cfg.add("gop", "graceful_poll_msecs", "250");
        cfg.add("gop", "graceful_stop_accepting", "true");
        cfg.add("gop", "listen_net", "tcp4");
        cfg.add("gop", "listen_addr", "127.0.0.1:9000");

        let settings = CoordinatorSettings::from_config(&cfg).unwrap();
        assert_eq!(settings.drain.wait, Duration::from_secs(10));
        assert_eq!(settings.drain.poll, Duration::from_millis(250));
        assert!(settings.stop_accepting_on_drain);
        assert_eq!(settings.listen, ListenAddr::new(Network::Tcp4, "127.0.0.1:9000"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CoordinatorSettings::from_config(&ConfigStore::default()).unwrap();
        assert_eq!(settings, CoordinatorSettings::default());
    }

    #[test]
    fn test_settings_reject_unknown_network() {
        let mut cfg = ConfigStore::default();
        cfg.add("gop", "listen_net", "udp");
        assert!(matches!(
            CoordinatorSettings::from_config(&cfg),
            Err(CoordinatorError::InvalidListenAddr(_))
        ));
    }

    #[test]
    #[should_panic(expected = "Non-numeric config key graceful_wait_secs")]
    fn test_settings_panic_on_bad_wait() {
        let mut cfg = ConfigStore::default();
        cfg.add("gop", "graceful_wait_secs", "a minute");
        let _ = CoordinatorSettings::from_config(&cfg);
    }
}
