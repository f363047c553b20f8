//! A single configuration layer: `section -> key -> value`, all strings.
//!
//! The base file is INI and is parsed with `rust-ini`; section and key names
//! are kept exactly as written, dots and case included. The override
//! file is a JSON object of objects whose leaf values are strings:
//!
//! ```json
//! { "gop": { "graceful_wait_secs": "10", "log_level": "DEBUG" } }
//! ```

use std::collections::HashMap;
use std::path::Path;

use ini::{Ini, ParseOption};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Section name used for INI keys that appear before any `[section]` header.
pub const GLOBAL_SECTION: &str = "";

/// One layer of configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer {
    sections: HashMap<String, HashMap<String, String>>,
}

impl Layer {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `key` in `section`, returning `default` and `false` if either
    /// is missing.
    pub fn get(&self, section: &str, key: &str, default: &str) -> (String, bool) {
        match self.lookup(section, key) {
            Some(value) => (value.to_string(), true),
            None => (default.to_string(), false),
        }
    }

    /// Borrowing lookup used by the store to avoid cloning on the miss path.
    pub(crate) fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Set `key` in `section`, creating the section if absent.
    pub fn add(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Names of all sections in this layer.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Names of all keys in `section`. Empty if the section does not exist.
    pub fn section_keys<'a>(&'a self, section: &str) -> impl Iterator<Item = &'a str> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|s| s.keys().map(String::as_str))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Parse INI text into a layer.
    ///
    /// Keys outside any section land in [`GLOBAL_SECTION`]. Quotes around a
    /// value are stripped; backslashes are left alone.
    pub fn from_ini_str(text: &str) -> std::result::Result<Self, ini::ParseError> {
        let options = ParseOption {
            enabled_quote: true,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let parsed = Ini::load_from_str_opt(text, options)?;

        let mut layer = Layer::new();
        for (section, properties) in parsed.iter() {
            let name = section.unwrap_or(GLOBAL_SECTION);
            if section.is_none() && properties.iter().next().is_none() {
                continue;
            }
            // An empty `[section]` header still declares the section.
            layer.sections.entry(name.to_string()).or_default();
            for (key, value) in properties.iter() {
                layer.add(name, key, value);
            }
        }
        Ok(layer)
    }

    /// Read and parse an INI file.
    pub fn from_ini_file(path: &Path) -> Result<Self> {
        let text = read(path)?;
        Self::from_ini_str(&text).map_err(|source| ConfigError::Ini {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read and parse a JSON override file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = read(path)?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
