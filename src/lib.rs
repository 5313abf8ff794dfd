//! dbinventory - Database-backed dynamic inventory
//!
//! Builds an Ansible inventory (groups, child groups, host variables) from a
//! SQLite database and caches the result on disk for `cache_max_age` seconds.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod output;
pub mod service;
pub mod source;

use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::cache::CacheStore;
use crate::cli::{Cli, Mode};
use crate::config::Config;
use crate::error::ExitCode;
use crate::service::InventoryService;
use crate::source::SqliteSource;

/// Run the application, printing to stdout.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_writer(cli, &mut out)
}

/// Run the application, printing to `out`.
pub fn run_with_writer<W: Write>(cli: Cli, out: &mut W) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides())
        .context("Failed to load configuration")?;

    if cli.dump_config {
        write!(out, "{}", config.to_toml()?)?;
        return Ok(ExitCode::Success);
    }

    let store = CacheStore::new(&config.cache_path);
    if cli.clear_cache {
        store.clear().context("Failed to clear cache")?;
    }

    let mut service = InventoryService::new(
        SqliteSource::new(&config.database),
        store,
        config.max_age(),
        config.build_options(),
    );

    let rendered = match cli.mode() {
        Mode::Host(host) => service
            .host_info(&host, cli.refresh_cache)
            .with_context(|| format!("Failed to get variables for host '{}'", host))?,
        Mode::List => service
            .list_all(cli.refresh_cache)
            .context("Failed to list inventory")?,
    };

    writeln!(out, "{}", rendered)?;
    Ok(ExitCode::Success)
}
