//! The layered configuration store.
//!
//! Lookups consult the override layer first and fall through to the source
//! layer. Typed accessors come in two flavours:
//!
//! - `get_int`, `get_int64`, `get_bool`, `get_float32` treat an unparsable
//!   value as a programming error and panic.
//! - `get_list` and `get_duration` never panic; a bad duration yields the
//!   caller's default.
//!
//! The store does no locking. Callers that mutate and read from several
//! threads must wrap it themselves (the server keeps it behind a `RwLock`).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use tracing::debug;

use crate::duration::parse_duration;
use crate::layer::Layer;

/// Effective configuration, sorted for stable dumps.
pub type EffectiveConfig = BTreeMap<String, BTreeMap<String, String>>;

/// Source layer plus override layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    source: Layer,
    overrides: Layer,
}

impl ConfigStore {
    /// Build a store from already-parsed layers.
    pub fn new(source: Layer, overrides: Layer) -> Self {
        Self { source, overrides }
    }

    /// Resolve `key` in `section`.
    ///
    /// Returns the override value if present, else the source value, else
    /// `default` with `found == false`.
    pub fn get(&self, section: &str, key: &str, default: &str) -> (String, bool) {
        if let Some(value) = self.overrides.lookup(section, key) {
            return (value.to_string(), true);
        }
        self.source.get(section, key, default)
    }

    /// Write into the source layer.
    pub fn add(&mut self, section: &str, key: &str, value: &str) {
        self.source.add(section, key, value);
    }

    /// Write into the override layer. Wins over the source layer from the
    /// next `get` on.
    pub fn override_value(&mut self, section: &str, key: &str, value: &str) {
        debug!(section, key, value, "Config override set");
        self.overrides.add(section, key, value);
    }

    /// Swap in a freshly loaded override layer, returning the old one.
    pub fn replace_overrides(&mut self, overrides: Layer) -> Layer {
        std::mem::replace(&mut self.overrides, overrides)
    }

    /// Union of section names across both layers.
    pub fn sections(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .source
            .sections()
            .chain(self.overrides.sections())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Union of key names in `section` across both layers.
    pub fn section_keys(&self, section: &str) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .source
            .section_keys(section)
            .chain(self.overrides.section_keys(section))
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Every section and key with its effective value.
    pub fn as_map(&self) -> EffectiveConfig {
        self.sections()
            .into_iter()
            .map(|section| {
                let values = self
                    .section_keys(&section)
                    .into_iter()
                    .map(|key| {
                        let (value, _) = self.get(&section, &key, "");
                        (key, value)
                    })
                    .collect();
                (section, values)
            })
            .collect()
    }

    /// # Panics
    ///
    /// Panics if the value is present but not a valid `i32`.
    pub fn get_int(&self, section: &str, key: &str, default: i32) -> (i32, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        match raw.parse() {
            Ok(v) => (v, true),
            Err(e) => panic!("Non-numeric config key {key}: {raw} [{e}]"),
        }
    }

    /// # Panics
    ///
    /// Panics if the value is present but not a valid `i64`.
    pub fn get_int64(&self, section: &str, key: &str, default: i64) -> (i64, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        match raw.parse() {
            Ok(v) => (v, true),
            Err(e) => panic!("Non-numeric config key {key}: {raw} [{e}]"),
        }
    }

    /// Accepts `1 t T TRUE true True` and `0 f F FALSE false False`.
    ///
    /// # Panics
    ///
    /// Panics on any other spelling.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> (bool, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        match raw.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => (true, true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => (false, true),
            _ => panic!("Bad boolean config key {key}: {raw}"),
        }
    }

    /// # Panics
    ///
    /// Panics if the value is present but not a valid float.
    pub fn get_float32(&self, section: &str, key: &str, default: f32) -> (f32, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        match raw.parse() {
            Ok(v) => (v, true),
            Err(e) => panic!("Non-numeric float32 config key {key}: {raw} [{e}]"),
        }
    }

    /// Comma separated list with every element trimmed. A present but empty
    /// value is `[""]`, not the default.
    pub fn get_list(&self, section: &str, key: &str, default: Vec<String>) -> (Vec<String>, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        let items = raw.split(',').map(|item| item.trim().to_string()).collect();
        (items, true)
    }

    /// Duration expression such as `90s` or `1h30m`. An unparsable value
    /// gives back `default` with `found == false`.
    pub fn get_duration(&self, section: &str, key: &str, default: Duration) -> (Duration, bool) {
        let (raw, found) = self.get(section, key, "");
        if !found {
            return (default, false);
        }
        match parse_duration(&raw) {
            Some(v) => (v, true),
            None => {
                debug!(section, key, value = %raw, "Unparsable duration, using default");
                (default, false)
            }
        }
    }
}
