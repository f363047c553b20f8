//! Logging setup driven by the `[gop]` config section.
//!
//! The filter sits behind a reload layer so a config change can retarget it
//! without reinstalling the subscriber. The output format is fixed at startup.
//!
//! # Configuration
//!
//! - `log_level`: base level (`FINEST`, `FINE`, `TRACE`, `DEBUG`, `INFO`,
//!   `WARNING`, `ERROR`, `CRITICAL`). Default: `INFO`
//! - `log_granulars`: comma-separated `target:LEVEL` pairs
//! - `log_granulars_prefix`: joined in front of every granular target with `::`
//! - `log_json`: JSON output. Default: false
//!
//! `RUST_LOG`, when set, wins over all of the above.

use gop_config::ConfigStore;
use tracing::{debug, info, warn, Subscriber};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

const SECTION: &str = "gop";

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Subscriber used while the config file is being read, before `init`.
pub fn bootstrap() -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish()
}

/// Install the global subscriber.
pub fn init(cfg: &ConfigStore) -> anyhow::Result<Logging> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| {
        let directives = filter_directives(cfg);
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"))
    });
    let (filter, handle) = reload::Layer::new(filter);

    let (json, _) = cfg.get_bool(SECTION, "log_json", false);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()?;
    }

    info!(json, from_env, "Logging initialized");
    Ok(Logging { handle, from_env })
}

/// Handle for retargeting the live filter.
#[derive(Clone)]
pub struct Logging {
    handle: FilterHandle,
    from_env: bool,
}

impl Logging {
    pub fn new(handle: FilterHandle, from_env: bool) -> Self {
        Self { handle, from_env }
    }

    /// Rebuild the filter from `cfg`. Returns whether the filter changed.
    pub fn apply(&self, cfg: &ConfigStore) -> bool {
        if self.from_env {
            debug!("RUST_LOG is set, ignoring configured log levels");
            return false;
        }

        let directives = filter_directives(cfg);
        let filter = match EnvFilter::try_new(&directives) {
            Ok(filter) => filter,
            Err(e) => {
                warn!(%directives, error = %e, "Invalid log filter, keeping current one");
                return false;
            }
        };

        if let Err(e) = self.handle.reload(filter) {
            warn!(error = %e, "Failed to swap log filter");
            return false;
        }
        info!(%directives, "Log filter updated");
        true
    }
}

/// `EnvFilter` directives for the logging keys in `cfg`.
///
/// Unknown levels and malformed granulars are skipped.
pub fn filter_directives(cfg: &ConfigStore) -> String {
    let (level, _) = cfg.get(SECTION, "log_level", "INFO");
    let mut directives = vec![parse_level(&level).unwrap_or("info").to_string()];

    let (prefix, _) = cfg.get(SECTION, "log_granulars_prefix", "");
    let (granulars, _) = cfg.get_list(SECTION, "log_granulars", Vec::new());
    for granular in granulars {
        let Some((target, level)) = granular.split_once(':') else {
            continue;
        };
        if target.is_empty() || level.is_empty() || level.contains(':') {
            continue;
        }
        let Some(level) = parse_level(level) else {
            continue;
        };
        if prefix.is_empty() {
            directives.push(format!("{target}={level}"));
        } else {
            directives.push(format!("{prefix}::{target}={level}"));
        }
    }

    directives.join(",")
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_uppercase().as_str() {
        "FINEST" | "FINE" | "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARNING" | "WARN" => Some("warn"),
        "ERROR" | "CRITICAL" => Some("error"),
        _ => None,
    }
}
