//! Command-line interface definitions for dbinventory.
//!
//! The surface follows Ansible's dynamic inventory protocol: `--list` prints
//! every group plus `_meta.hostvars`, and `--host <name>` prints one host's
//! variables. Remaining flags override configuration values.
//!
//! # Example
//!
//! ```bash
//! # Full inventory (default)
//! dbinventory --list
//!
//! # One host
//! dbinventory --host web1
//!
//! # Ignore the cache and query the database
//! dbinventory --list --refresh-cache
//!
//! # Use transitive children and a custom cache directory
//! dbinventory --inventory-groups all --cache-path /tmp/inv
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::source::{ChildrenMode, IdentityColumn};

/// Produce an Ansible inventory from a relational database.
///
/// Results are cached on disk and reused until the cache is older than
/// `cache_max_age` seconds.
#[derive(Debug, Parser)]
#[command(name = "dbinventory")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// List all groups and hosts (default)
    #[arg(long)]
    pub list: bool,

    /// Get all the variables about a specific host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Force refresh of the cache by querying the database
    #[arg(long)]
    pub refresh_cache: bool,

    /// Delete the cache artifacts before running
    #[arg(long)]
    pub clear_cache: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "PATH", env = "DBINVENTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the SQLite inventory database
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Directory holding the cache artifacts
    #[arg(long, value_name = "DIR")]
    pub cache_path: Option<PathBuf>,

    /// Seconds the cache stays valid
    #[arg(long, value_name = "SECS")]
    pub cache_max_age: Option<u64>,

    /// Attach immediate children only, or every descendant
    #[arg(long, value_enum, value_name = "MODE")]
    pub inventory_groups: Option<ChildrenMode>,

    /// Column used as the host name
    #[arg(long, value_enum, value_name = "COLUMN")]
    pub inventory_hostname: Option<IdentityColumn>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub dump_config: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// What to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// The full inventory.
    List,
    /// One host's variables.
    Host(String),
}

impl Cli {
    /// Requested output. `--host` takes precedence over `--list`.
    #[must_use]
    pub fn mode(&self) -> Mode {
        match &self.host {
            Some(host) => Mode::Host(host.clone()),
            None => Mode::List,
        }
    }

    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            database: self.database.clone(),
            cache_path: self.cache_path.clone(),
            cache_max_age: self.cache_max_age,
            inventory_groups: self.inventory_groups,
            inventory_hostname: self.inventory_hostname,
        }
    }
}
