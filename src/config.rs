//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. built-in defaults,
//! 2. a TOML file (`--config`, or `config.toml` in the platform config dir),
//! 3. `DBINVENTORY_*` environment variables,
//! 4. command-line overrides.
//!
//! # Example
//!
//! ```toml
//! database = "/srv/inventory/inventory.db"
//! cache_path = "/var/cache/dbinventory"
//! cache_max_age = 300
//! inventory_groups = "all"
//! inventory_hostname = "hostname"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inventory::BuildOptions;
use crate::source::{ChildrenMode, IdentityColumn};

/// Prefix of environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "DBINVENTORY_";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer holds an invalid value.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The configuration could not be rendered as TOML.
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding the inventory tables.
    pub database: PathBuf,
    /// Directory holding the cache artifacts.
    pub cache_path: PathBuf,
    /// Seconds a cache stays valid after it was written.
    pub cache_max_age: u64,
    /// Which edge set child groups are taken from.
    pub inventory_groups: ChildrenMode,
    /// Which column names hosts.
    pub inventory_hostname: IdentityColumn,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("inventory.db"),
            cache_path: default_cache_dir(),
            cache_max_age: 300,
            inventory_groups: ChildrenMode::Immediate,
            inventory_hostname: IdentityColumn::Host,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_max_age: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_groups: Option<ChildrenMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_hostname: Option<IdentityColumn>,
}

impl Config {
    /// Build the layered figment.
    ///
    /// When `config_file` is `None` the platform default file is used if it exists.
    #[must_use]
    pub fn figment(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = config_file.map(Path::to_path_buf).or_else(default_config_path) {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    /// Load the configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotFound`] if `config_file` is given but missing, and
    /// [`ConfigError::Invalid`] if any layer holds a value of the wrong type.
    pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }

        let config: Config = Self::figment(config_file, overrides)
            .extract()
            .map_err(Box::new)?;

        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Cache lifetime.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age)
    }

    /// Build options derived from this configuration.
    #[must_use]
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions::default()
            .with_identity(self.inventory_hostname)
            .with_children(self.inventory_groups)
    }

    /// The configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Platform-specific default config file.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "dbinventory", "dbinventory")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.is_file())
}

fn default_cache_dir() -> PathBuf {
    ProjectDirs::from("org", "dbinventory", "dbinventory")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}
