//! Inventory model and hierarchy construction.
//!
//! # Overview
//!
//! An [`Inventory`] is the pair of structures the rest of the crate passes
//! around and caches:
//!
//! * a [`Hierarchy`]: group name → [`GroupNode`],
//! * a [`HostVars`] table: host name → variable object.
//!
//! Both are sorted maps, so serializing them always yields sorted keys.
//!
//! # Architecture
//!
//! * [`node`]: the two group shapes and the transitions between them.
//! * [`builder`]: creates groups on first reference from their metadata.
//! * [`assembler`]: folds host rows and child edges into an [`Inventory`].
//!
//! # Example
//!
//! ```
//! use dbinventory::inventory::{BuildOptions, HierarchyAssembler};
//! use dbinventory::source::{HostRow, MemorySource};
//!
//! let mut source = MemorySource::new()
//!     .with_host(HostRow::new("web1", "webservers", ""))
//!     .with_group("webservers", r#"{"env": "prod"}"#);
//!
//! let inventory = HierarchyAssembler::new(&mut source, BuildOptions::default())
//!     .assemble()
//!     .unwrap();
//!
//! assert_eq!(inventory.groups["webservers"].hosts(), ["web1"]);
//! assert_eq!(inventory.hostvars["web1"]["ansible_host"], "web1");
//! ```

pub mod assembler;
pub mod builder;
pub mod node;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::SourceError;

pub use assembler::{BuildOptions, HierarchyAssembler};
pub use builder::GroupBuilder;
pub use node::{GroupBody, GroupNode};

/// Variable injected into every host's variables, holding its connection address.
pub const HOST_ADDRESS_VAR: &str = "ansible_host";

/// A JSON object of variables.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Host name → host variables.
pub type HostVars = BTreeMap<String, Variables>;

/// Group name → group node.
pub type Hierarchy = BTreeMap<String, GroupNode>;

/// Errors raised while building the inventory.
///
/// Malformed variables are fatal: nothing is built or cached.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A group's `variables` column is not a JSON object.
    #[error("group '{group}' does not have valid JSON variables: {raw}")]
    InvalidGroupVariables { group: String, raw: String },

    /// A host's `host_vars` column is not a JSON object.
    #[error("host '{host}' does not have valid JSON variables: {raw}")]
    InvalidHostVariables { host: String, raw: String },

    /// The data source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A fully built inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Group hierarchy.
    pub groups: Hierarchy,
    /// Variables of every host.
    pub hostvars: HostVars,
}

impl Inventory {
    /// Create an inventory from its parts.
    #[must_use]
    pub fn new(groups: Hierarchy, hostvars: HostVars) -> Self {
        Self { groups, hostvars }
    }

    /// Number of distinct hosts.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hostvars.len()
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Parse a variables column.
///
/// Blank text yields `Ok(None)`. Anything else must be a JSON object.
pub(crate) fn parse_variables(raw: &str) -> Result<Option<Variables>, serde_json::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}
