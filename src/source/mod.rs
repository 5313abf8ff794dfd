//! Read-only inventory data sources.
//!
//! The inventory is folded from three query shapes:
//!
//! * host rows (`host`, `hostname`, `group`, `host_vars`),
//! * a group metadata lookup by name (`variables`),
//! * parent/child edges between groups, either the immediate edges or
//!   their transitive closure.
//!
//! # Architecture
//!
//! * [`DataSource`]: the trait the inventory builder consumes.
//! * [`sqlite`]: the production source, backed by a SQLite database via `rusqlite`.
//! * [`memory`]: rows held in memory, for embedding and tests.
//!
//! Sources never write. Connection failures and malformed schemas surface as
//! [`SourceError`] and abort the rebuild that triggered them.

pub mod memory;
pub mod sqlite;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemorySource;
pub use sqlite::{SqliteSource, SCHEMA};

/// Error type for data source queries.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The database could not be opened.
    #[error("failed to open inventory database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A query failed.
    #[error("inventory query failed ({query}): {source}")]
    Query {
        query: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// A single row of the `inventory` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRow {
    /// Connection address (DNS name or IP).
    pub host: String,
    /// Optional display name, usable as the inventory identity.
    pub hostname: Option<String>,
    /// Name of the group this host belongs to.
    pub group: String,
    /// Raw JSON text of the host variables. May be empty.
    pub host_vars: String,
}

impl HostRow {
    /// Create a host row whose identity and address are both `host`.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        group: impl Into<String>,
        host_vars: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            hostname: None,
            group: group.into(),
            host_vars: host_vars.into(),
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// The key this host is listed under, per the configured identity column.
    ///
    /// A missing `hostname` falls back to `host`.
    #[must_use]
    pub fn identity(&self, column: IdentityColumn) -> &str {
        match column {
            IdentityColumn::Host => &self.host,
            IdentityColumn::Hostname => self.hostname.as_deref().unwrap_or(&self.host),
        }
    }
}

/// A parent/child relation between two groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildEdge {
    pub parent: String,
    pub child: String,
}

impl ChildEdge {
    #[must_use]
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Which edge set to attach children from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChildrenMode {
    /// Only direct parent/child edges (`children`).
    #[default]
    Immediate,
    /// Every descendant of a group (`children_all`).
    All,
}

impl std::fmt::Display for ChildrenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildrenMode::Immediate => write!(f, "immediate"),
            ChildrenMode::All => write!(f, "all"),
        }
    }
}

/// Which `inventory` column names a host in the output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum IdentityColumn {
    /// The connection address.
    #[default]
    Host,
    /// The display name, falling back to the address when unset.
    Hostname,
}

impl std::fmt::Display for IdentityColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityColumn::Host => write!(f, "host"),
            IdentityColumn::Hostname => write!(f, "hostname"),
        }
    }
}

/// The read-only collaborator the inventory is built from.
///
/// Methods take `&mut self` so implementations can connect lazily.
pub trait DataSource {
    /// All host rows, in the order the source returns them.
    fn host_rows(&mut self) -> Result<Vec<HostRow>, SourceError>;

    /// The raw `variables` text of a group, or `None` if the group has no
    /// metadata row.
    fn group_variables(&mut self, name: &str) -> Result<Option<String>, SourceError>;

    /// Parent/child edges from the selected edge set.
    fn child_edges(&mut self, mode: ChildrenMode) -> Result<Vec<ChildEdge>, SourceError>;
}

impl<T: DataSource + ?Sized> DataSource for &mut T {
    fn host_rows(&mut self) -> Result<Vec<HostRow>, SourceError> {
        (**self).host_rows()
    }

    fn group_variables(&mut self, name: &str) -> Result<Option<String>, SourceError> {
        (**self).group_variables(name)
    }

    fn child_edges(&mut self, mode: ChildrenMode) -> Result<Vec<ChildEdge>, SourceError> {
        (**self).child_edges(mode)
    }
}
