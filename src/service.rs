//! Cache-or-rebuild orchestration.
//!
//! # Flow
//!
//! Each invocation walks one path through:
//!
//! ```text
//! Start ─┬─ cache valid ──────────────► Loaded ─┬─► Serving
//!        └─ cache stale / forced ─► Rebuilding ─► Saved ─┘
//! ```
//!
//! The resolved [`Inventory`] is passed along as a value; the service itself
//! only holds its collaborators and a rebuild counter.
//!
//! # Example
//!
//! ```no_run
//! use dbinventory::cache::CacheStore;
//! use dbinventory::inventory::BuildOptions;
//! use dbinventory::service::InventoryService;
//! use dbinventory::source::SqliteSource;
//! use std::time::Duration;
//!
//! let mut service = InventoryService::new(
//!     SqliteSource::new("inventory.db"),
//!     CacheStore::new("/tmp/dbinventory"),
//!     Duration::from_secs(300),
//!     BuildOptions::default(),
//! );
//!
//! println!("{}", service.list_all(false).unwrap());
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheError, CacheStore};
use crate::inventory::{BuildError, BuildOptions, HierarchyAssembler, Inventory, Variables};
use crate::output::{HostOutput, ListOutput};
use crate::source::DataSource;

/// Errors surfaced by [`InventoryService`].
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Building from the data source failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Reading or writing the cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The output could not be rendered.
    #[error("failed to render inventory output: {0}")]
    Render(#[from] serde_json::Error),
}

/// Where the current inventory came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from a valid cache.
    Cache,
    /// Built from the data source during this run.
    Rebuild,
}

/// Serves the inventory from the cache or the data source.
pub struct InventoryService<S> {
    source: S,
    store: CacheStore,
    max_age: Duration,
    options: BuildOptions,
    rebuilds: usize,
}

impl<S: DataSource> InventoryService<S> {
    /// Create a service. Neither the source nor the cache is touched yet.
    #[must_use]
    pub fn new(source: S, store: CacheStore, max_age: Duration, options: BuildOptions) -> Self {
        Self {
            source,
            store,
            max_age,
            options,
            rebuilds: 0,
        }
    }

    /// The data source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The cache store.
    #[must_use]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Number of rebuilds started by this service.
    #[must_use]
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }

    /// Load the cached inventory if it is fresh and `force` is false,
    /// otherwise rebuild it.
    pub fn resolve(&mut self, force: bool) -> Result<(Inventory, Origin), InventoryError> {
        if force {
            log::debug!("Cache refresh forced");
        } else if self.store.is_valid(self.max_age) {
            let (hostvars, groups) = self.store.load()?;
            return Ok((Inventory::new(groups, hostvars), Origin::Cache));
        }

        Ok((self.rebuild()?, Origin::Rebuild))
    }

    /// Build the inventory from the data source and save it to the cache.
    ///
    /// Nothing is written if the build fails.
    pub fn rebuild(&mut self) -> Result<Inventory, InventoryError> {
        self.rebuilds += 1;
        log::debug!("Rebuilding inventory from data source");

        let inventory = HierarchyAssembler::new(&mut self.source, self.options)
            .assemble()
            .map_err(|e| {
                log::error!("Inventory rebuild failed: {}", e);
                e
            })?;

        self.store.save(&inventory.hostvars, &inventory.groups)?;
        log::info!(
            "Rebuilt inventory: {} groups, {} hosts",
            inventory.group_count(),
            inventory.host_count()
        );
        Ok(inventory)
    }

    /// The full listing as pretty-printed JSON.
    pub fn list_all(&mut self, force: bool) -> Result<String, InventoryError> {
        let (inventory, _) = self.resolve(force)?;
        Ok(ListOutput::new(&inventory).to_json_pretty()?)
    }

    /// Variables of `host`.
    ///
    /// A host missing from a cached inventory triggers one rebuild. A host
    /// that is still missing yields an empty object rather than an error.
    pub fn host_vars(&mut self, host: &str, force: bool) -> Result<Variables, InventoryError> {
        let (mut inventory, origin) = self.resolve(force)?;

        if inventory.hostvars.is_empty() && self.store.exists() {
            inventory.hostvars = self.store.load_hostvars()?;
        }

        if !inventory.hostvars.contains_key(host) && origin == Origin::Cache {
            log::debug!("Host '{}' not in cached inventory, rebuilding", host);
            inventory = self.rebuild()?;
        }

        match inventory.hostvars.remove(host) {
            Some(vars) => Ok(vars),
            None => {
                log::debug!("Host '{}' not found", host);
                Ok(Variables::new())
            }
        }
    }

    /// Variables of `host` as pretty-printed JSON.
    pub fn host_info(&mut self, host: &str, force: bool) -> Result<String, InventoryError> {
        let vars = self.host_vars(host, force)?;
        Ok(HostOutput::new(&vars).to_json_pretty()?)
    }
}
