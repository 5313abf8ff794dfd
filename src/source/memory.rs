//! In-memory inventory source.

use std::collections::HashMap;

use super::{ChildEdge, ChildrenMode, DataSource, HostRow, SourceError};

/// Inventory rows held in memory.
///
/// Transitive edges are stored separately from immediate ones; the source
/// does not compute a closure itself.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    hosts: Vec<HostRow>,
    groups: HashMap<String, String>,
    children: Vec<ChildEdge>,
    children_all: Vec<ChildEdge>,
    host_queries: usize,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host row.
    #[must_use]
    pub fn with_host(mut self, row: HostRow) -> Self {
        self.hosts.push(row);
        self
    }

    /// Add group metadata.
    #[must_use]
    pub fn with_group(mut self, name: impl Into<String>, variables: impl Into<String>) -> Self {
        self.groups.insert(name.into(), variables.into());
        self
    }

    /// Add an immediate parent/child edge.
    #[must_use]
    pub fn with_child(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.children.push(ChildEdge::new(parent, child));
        self
    }

    /// Add an edge to the transitive edge set.
    #[must_use]
    pub fn with_descendant(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.children_all.push(ChildEdge::new(parent, child));
        self
    }

    /// Replace the host rows.
    pub fn set_hosts(&mut self, hosts: Vec<HostRow>) {
        self.hosts = hosts;
    }

    /// Number of times host rows have been fetched, i.e. rebuilds started.
    #[must_use]
    pub fn host_queries(&self) -> usize {
        self.host_queries
    }
}

impl DataSource for MemorySource {
    fn host_rows(&mut self) -> Result<Vec<HostRow>, SourceError> {
        self.host_queries += 1;
        Ok(self.hosts.clone())
    }

    fn group_variables(&mut self, name: &str) -> Result<Option<String>, SourceError> {
        Ok(self.groups.get(name).cloned())
    }

    fn child_edges(&mut self, mode: ChildrenMode) -> Result<Vec<ChildEdge>, SourceError> {
        Ok(match mode {
            ChildrenMode::Immediate => self.children.clone(),
            ChildrenMode::All => self.children_all.clone(),
        })
    }
}
