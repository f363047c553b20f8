//! Errors raised while loading configuration files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading a configuration layer from disk.
///
/// Typed accessor failures are deliberately absent: numeric and boolean
/// settings panic, list and duration settings fall back to their default.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("can't read config file [{}]: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The base file is not valid INI.
    #[error("can't parse config file [{}]: {source}", path.display())]
    Ini {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    /// The override file is not a JSON object of string maps.
    #[error("can't parse override file [{}]: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
