//! Two-pass hierarchy assembly.
//!
//! # Passes
//!
//! 1. **Hosts**: every host row, in source order, is appended to its group
//!    (created on first reference) and its variables are recorded with the
//!    connection address injected as [`HOST_ADDRESS_VAR`].
//! 2. **Children**: every parent/child edge, in source order, promotes the
//!    parent to `{hosts, children}` and appends the child by name.
//! 3. **Cleanup**: detailed groups left with an empty `hosts` list lose the
//!    field.
//!
//! Repeated host rows are appended again; nothing is deduplicated.

use std::time::Instant;

use serde_json::Value;

use super::{
    parse_variables, BuildError, GroupBuilder, Hierarchy, Inventory, Variables, HOST_ADDRESS_VAR,
};
use crate::source::{ChildEdge, ChildrenMode, DataSource, HostRow, IdentityColumn};

/// Options controlling how rows are folded into the inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Column used as the host name.
    pub identity: IdentityColumn,
    /// Edge set children are attached from.
    pub children: ChildrenMode,
}

impl BuildOptions {
    /// Set the host name column.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityColumn) -> Self {
        self.identity = identity;
        self
    }

    /// Set the edge set.
    #[must_use]
    pub fn with_children(mut self, children: ChildrenMode) -> Self {
        self.children = children;
        self
    }
}

/// Builds an [`Inventory`] from a [`DataSource`].
pub struct HierarchyAssembler<S> {
    builder: GroupBuilder<S>,
    options: BuildOptions,
}

impl<S: DataSource> HierarchyAssembler<S> {
    /// Create an assembler reading from `source`.
    #[must_use]
    pub fn new(source: S, options: BuildOptions) -> Self {
        Self {
            builder: GroupBuilder::new(source),
            options,
        }
    }

    /// Fetch all rows and run every pass.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed variables column or source error. No
    /// partial inventory is returned.
    pub fn assemble(mut self) -> Result<Inventory, BuildError> {
        let start = Instant::now();
        let mut inventory = Inventory::default();

        let rows = self.builder.source_mut().host_rows()?;
        self.attach_hosts(&mut inventory, &rows)?;

        let edges = self.builder.source_mut().child_edges(self.options.children)?;
        self.attach_children(&mut inventory.groups, &edges)?;

        let pruned = prune_empty_hosts(&mut inventory.groups);

        log::debug!(
            "Assembled {} groups and {} hosts from {} rows and {} edges ({} empty host lists pruned) in {:?}",
            inventory.group_count(),
            inventory.host_count(),
            rows.len(),
            edges.len(),
            pruned,
            start.elapsed()
        );

        Ok(inventory)
    }

    /// Pass 1: add each host to its group and record its variables.
    pub fn attach_hosts(
        &mut self,
        inventory: &mut Inventory,
        rows: &[HostRow],
    ) -> Result<(), BuildError> {
        for row in rows {
            let name = row.identity(self.options.identity);

            self.builder
                .ensure_group(&mut inventory.groups, &row.group)?
                .push_host(name);

            let vars = host_variables(row, name)?;
            log::trace!("Host '{}' in group '{}'", name, row.group);
            inventory.hostvars.insert(name.to_string(), vars);
        }
        Ok(())
    }

    /// Pass 2: attach each child group to its parent.
    pub fn attach_children(
        &mut self,
        groups: &mut Hierarchy,
        edges: &[ChildEdge],
    ) -> Result<(), BuildError> {
        for edge in edges {
            self.builder
                .ensure_group(groups, &edge.parent)?
                .push_child(edge.child.as_str());
        }
        Ok(())
    }
}

/// Pass 3: remove empty `hosts` fields. Returns the number of groups changed.
pub fn prune_empty_hosts(groups: &mut Hierarchy) -> usize {
    groups
        .values_mut()
        .map(|node| node.prune_empty_hosts())
        .filter(|&pruned| pruned)
        .count()
}

fn host_variables(row: &HostRow, name: &str) -> Result<Variables, BuildError> {
    let mut vars = match parse_variables(&row.host_vars) {
        Ok(vars) => vars.unwrap_or_default(),
        Err(e) => {
            log::debug!("Host '{}' variables failed to parse: {}", name, e);
            return Err(BuildError::InvalidHostVariables {
                host: name.to_string(),
                raw: row.host_vars.clone(),
            });
        }
    };
    vars.insert(HOST_ADDRESS_VAR.to_string(), Value::String(row.host.clone()));
    Ok(vars)
}
