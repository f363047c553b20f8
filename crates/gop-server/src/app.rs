//! The application handle shared by every component of the server.

use std::sync::atomic::{AtomicU64, Ordering};

use gop_config::loader::load_overrides;
use gop_config::{ChangeNotifier, ConfigPaths, ConfigStore, EffectiveConfig};
use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tracing::{info, warn};

/// Project/app identity, config and change callbacks.
///
/// Built once in `main` and passed around as `Arc<App>`.
#[derive(Debug)]
pub struct App {
    pub project: String,
    pub name: String,
    paths: ConfigPaths,
    config: RwLock<ConfigStore>,
    notifier: Mutex<ChangeNotifier>,
    reloads: AtomicU64,
}

impl App {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        paths: ConfigPaths,
        config: ConfigStore,
    ) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
            paths,
            config: RwLock::new(config),
            notifier: Mutex::new(ChangeNotifier::new()),
            reloads: AtomicU64::new(0),
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub async fn config(&self) -> RwLockReadGuard<'_, ConfigStore> {
        self.config.read().await
    }

    /// Effective configuration, overrides applied.
    pub async fn snapshot(&self) -> EffectiveConfig {
        self.config.read().await.as_map()
    }

    /// Number of successful override reloads since startup.
    pub fn reloads(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    pub async fn on_change<F>(&self, callback: F)
    where
        F: Fn(&ConfigStore) + Send + Sync + 'static,
    {
        self.notifier.lock().await.add_on_change_callback(callback);
    }

    /// Run every change callback against the current configuration.
    pub async fn notify_changed(&self) {
        let mut notifier = self.notifier.lock().await;
        let config = self.config.read().await;
        notifier.notify_changed(&config);
    }

    /// Re-read the override file and, if it parsed, swap it in and notify.
    ///
    /// On failure the current overrides stay in place.
    pub async fn reload_overrides(&self) -> bool {
        let Some(overrides) = load_overrides(&self.paths.overrides) else {
            warn!(
                path = %self.paths.overrides.display(),
                "Override reload failed, keeping current overrides"
            );
            return false;
        };

        self.config.write().await.replace_overrides(overrides);
        let count = self.reloads.fetch_add(1, Ordering::Relaxed) + 1;
        info!(reloads = count, "Override config reloaded");

        self.notify_changed().await;
        true
    }
}
