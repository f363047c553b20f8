use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gop_config::{loader, ConfigPaths};
use gop_ecdysis::{
    spawn_forwarder, CoordinatorSettings, DrainSettings, ProcessEnv, RestartCoordinator,
    UnixPlatform,
};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

mod app;
mod http;
mod logging;

use app::App;

/// Demo HTTP service with zero-downtime restarts.
///
/// `SIGUSR2` restarts, `SIGHUP` reloads the override config, `SIGTERM` drains
/// and exits.
#[derive(Debug, Parser)]
#[command(name = "gop-server", version, about)]
struct Cli {
    /// Project name, used to locate the config root.
    #[arg(long, default_value = "gop")]
    project: String,

    /// Application name, used to locate the base config file.
    #[arg(long, default_value = "demo")]
    app: String,

    /// Explicit base config file. Overrides the environment lookup.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = match &cli.config {
        Some(base) => ConfigPaths::from_base(base),
        None => ConfigPaths::resolve(&cli.project, &cli.app),
    };

    let config = tracing::subscriber::with_default(logging::bootstrap(), || loader::load(&paths))
        .with_context(|| format!("Failed to load config from {}", paths.base.display()))?;

    let logging = logging::init(&config).context("Failed to init logging")?;

    info!("gop-server starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(project = %cli.project, app = %cli.app, base = %paths.base.display(), "Config loaded");

    let app = Arc::new(App::new(cli.project, cli.app, paths, config));
    app.on_change(move |cfg| {
        logging.apply(cfg);
    })
    .await;

    let settings = CoordinatorSettings::from_config(&*app.config().await)?;

    let (drain_tx, drain_rx) = watch::channel(settings.drain);
    app.on_change(move |cfg| {
        drain_tx.send_replace(DrainSettings::from_config(cfg));
    })
    .await;

    // Handlers go in before the listener exists so an early signal never
    // hits the default disposition.
    let (controls_tx, controls_rx) = mpsc::channel(16);
    spawn_forwarder(controls_tx).context("Failed to install signal handlers")?;
    spawn_reload_on_hangup(Arc::clone(&app)).context("Failed to install SIGHUP handler")?;

    let (mut coordinator, listener) =
        RestartCoordinator::start(UnixPlatform, settings, &ProcessEnv)?;
    coordinator.follow_drain_settings(drain_rx);
    info!(
        phase = ?coordinator.phase(),
        local = ?listener.local_addr().ok(),
        pid = std::process::id(),
        "Listener ready"
    );

    let serve_app = Arc::clone(&app);
    let outcome = coordinator
        .run(listener, controls_rx, move |listener, ctx| {
            http::serve(listener, serve_app, ctx)
        })
        .await?;

    info!(?outcome, "gop-server exiting");
    Ok(())
}

/// Reload the override file on every `SIGHUP`.
fn spawn_reload_on_hangup(app: Arc<App>) -> std::io::Result<JoinHandle<()>> {
    let mut hangup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!(
                path = %app.paths().overrides.display(),
                "SIGHUP received, reloading override config"
            );
            app.reload_overrides().await;
        }
    }))
}
