//! # gop-config
//!
//! Layered configuration for long-lived services.
//!
//! ## Overview
//!
//! A [`ConfigStore`] holds two layers of `section -> key -> string`:
//! 1. the *source* layer, loaded once from an INI base file
//! 2. the *override* layer, loaded from an optional JSON file next to it and
//!    writable at runtime through [`ConfigStore::override_value`]
//!
//! Overrides always win. A [`ChangeNotifier`] keeps an ordered list of
//! callbacks that re-derive state when the configuration changes.
//!
//! ## Example
//!
//! ```no_run
//! use gop_config::{loader, ConfigPaths};
//!
//! let cfg = loader::load(&ConfigPaths::resolve("gop", "demo")).unwrap();
//! let (wait_secs, _) = cfg.get_int("gop", "graceful_wait_secs", 60);
//! ```

pub mod duration;
pub mod error;
pub mod layer;
pub mod loader;
pub mod notifier;
pub mod store;

pub use error::{ConfigError, Result};
pub use layer::Layer;
pub use loader::ConfigPaths;
pub use notifier::ChangeNotifier;
pub use store::{ConfigStore, EffectiveConfig};
