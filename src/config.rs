//! Router configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::ConfigError;

fn default_routes_path() -> PathBuf {
    PathBuf::from("routes.toml")
}

/// Where the routes file of an application lives.
///
/// Read from the `[app]` table of a TOML file:
///
/// ```toml
/// [app]
/// base_path = "/srv/app"
/// routes_path = "config/routes.toml"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouterConfig {
    /// Base directory of the application.
    pub base_path: PathBuf,
    /// Routes file, relative to `base_path`. Defaults to `routes.toml`.
    #[serde(default = "default_routes_path")]
    pub routes_path: PathBuf,
}

#[derive(Deserialize)]
struct ConfigFile {
    app: RouterConfig,
}

impl RouterConfig {
    /// Create a configuration with the default routes path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            routes_path: default_routes_path(),
        }
    }

    /// Parses a configuration from TOML source.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str::<ConfigFile>(src)?.app)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let src = fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }

    /// Returns the full path of the routes file.
    pub fn routes_file(&self) -> PathBuf {
        self.base_path.join(&self.routes_path)
    }
}
