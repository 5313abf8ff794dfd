//! Logging infrastructure for dbinventory.
//!
//! This module provides structured logging using the `log` facade and `env_logger` backend.
//! Logs go to stderr; stdout is reserved for the inventory JSON.
//!
//! Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: warn level
//!
//! Records are printed as `dbinventory: <level> <message>`. `-vv` adds the
//! module path.
//!
//! # Example
//!
//! ```rust,no_run
//! use dbinventory::logging::init_logging;
//!
//! // Initialize with verbose mode (-v)
//! init_logging(1, false);
//! ```

use env_logger::{Builder, Target};
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// This function should be called once at the start of the application,
/// before any logging calls are made.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=warn, 1=debug, 2+=trace)
/// * `quiet` - If true, only show errors (overridden by RUST_LOG)
///
/// # Panics
///
/// This function will panic if called more than once, as `env_logger`
/// can only be initialized once per process.
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();

    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(verbose, quiet));
    }

    configure_format(&mut builder, verbose);
    builder.init();

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG environment variable: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        );
    }
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Compact stderr format: `dbinventory: <level> <message>`, plus the module
/// path at trace level.
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);

        if verbose >= 2 {
            writeln!(
                buf,
                "dbinventory: {style}{}{style:#} [{}] {}",
                level.as_str().to_lowercase(),
                record.module_path().unwrap_or("dbinventory"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "dbinventory: {style}{}{style:#} {}",
                level.as_str().to_lowercase(),
                record.args()
            )
        }
    });
}
