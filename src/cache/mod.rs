//! Inventory cache for dbinventory.
//!
//! This module persists the last built inventory so that subsequent runs can
//! answer without querying the database.
//!
//! # Architecture
//!
//! The cache is two JSON files in one directory, handled by [`store`]:
//!
//! * `dbinventory.cache`: host name → host variables.
//! * `dbinventory.index`: the group hierarchy.
//!
//! # Cache Invalidation
//!
//! The cache is valid when both files exist and the hierarchy file was
//! modified less than `cache_max_age` seconds ago. There is no partial
//! validity and no incremental update: a stale cache is rebuilt in full.

pub mod store;

pub use store::{CacheError, CacheResult, CacheStore, HIERARCHY_FILE, HOSTVARS_FILE};
