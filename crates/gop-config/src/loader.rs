//! Locating and loading the configuration files for an application.
//!
//! # Environment Variables
//!
//! - `<PROJECT>_CFG_ROOT`: directory holding config files. Default: `/etc/<project>`
//! - `<PROJECT>_<APP>_CFG_FILE`: full path of the base file. Default: `<root>/<app>.conf`
//!
//! The override file always sits next to the base file as `<base>.override`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::layer::Layer;
use crate::store::ConfigStore;

/// Suffix appended to the base file name to find the override file.
pub const OVERRIDE_SUFFIX: &str = ".override";

/// Where the base and override files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub base: PathBuf,
    pub overrides: PathBuf,
}

impl ConfigPaths {
    /// Resolve paths for `project`/`app` from the process environment.
    pub fn resolve(project: &str, app: &str) -> Self {
        Self::resolve_with(project, app, |name| std::env::var(name).ok())
    }

    /// Resolve paths using `env` for variable lookups. Empty values count as
    /// unset.
    pub fn resolve_with<F>(project: &str, app: &str, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|v| !v.is_empty());

        let project_upper = project.to_uppercase();
        let root = lookup(&format!("{project_upper}_CFG_ROOT"))
            .unwrap_or_else(|| format!("/etc/{project}"));

        let file_var = format!("{project_upper}_{}_CFG_FILE", app.to_uppercase());
        let base = lookup(&file_var)
            .map(PathBuf::from)
            .unwrap_or_else(|| Path::new(&root).join(format!("{app}.conf")));

        Self::from_base(base)
    }

    /// Use an explicit base file; the override path is derived from it.
    pub fn from_base(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let mut overrides = OsString::from(base.as_os_str());
        overrides.push(OVERRIDE_SUFFIX);
        Self {
            base,
            overrides: PathBuf::from(overrides),
        }
    }
}

/// Load the base file and, if possible, the override file.
///
/// A missing or malformed base file is an error. A missing or malformed
/// override file is logged and the store starts with no overrides.
pub fn load(paths: &ConfigPaths) -> Result<ConfigStore> {
    let source = Layer::from_ini_file(&paths.base)?;
    info!(path = %paths.base.display(), "Loaded base config");

    let overrides = load_overrides(&paths.overrides).unwrap_or_default();
    Ok(ConfigStore::new(source, overrides))
}

/// Load the override file, logging a warning and returning `None` on failure.
pub fn load_overrides(path: &Path) -> Option<Layer> {
    match Layer::from_json_file(path) {
        Ok(layer) => {
            info!(path = %path.display(), "Loaded override config");
            Some(layer)
        }
        Err(e) => {
            warn!(
                error = %e,
                "Failed to load or parse override config file, continuing without overrides"
            );
            None
        }
    }
}
