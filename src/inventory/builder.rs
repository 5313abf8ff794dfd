//! Group creation on first reference.

use std::collections::btree_map::Entry;

use super::{parse_variables, BuildError, GroupNode, Hierarchy};
use crate::source::DataSource;

/// Creates groups from their metadata the first time they are referenced.
pub struct GroupBuilder<S> {
    source: S,
}

impl<S: DataSource> GroupBuilder<S> {
    /// Create a builder over `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Mutable access to the underlying source.
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Return the group named `name`, creating it if it does not exist yet.
    ///
    /// Existing groups are returned untouched and the source is not queried.
    /// A new group carries variables when its metadata has a non-blank
    /// `variables` column, and is a plain empty host list otherwise
    /// (including when there is no metadata row at all).
    ///
    /// # Errors
    ///
    /// [`BuildError::InvalidGroupVariables`] if the column is not a JSON object,
    /// or [`BuildError::Source`] if the lookup fails.
    pub fn ensure_group<'h>(
        &mut self,
        hierarchy: &'h mut Hierarchy,
        name: &str,
    ) -> Result<&'h mut GroupNode, BuildError> {
        match hierarchy.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let node = self.create(name)?;
                Ok(entry.insert(node))
            }
        }
    }

    fn create(&mut self, name: &str) -> Result<GroupNode, BuildError> {
        let raw = self.source.group_variables(name)?.unwrap_or_default();

        match parse_variables(&raw) {
            Ok(Some(vars)) => {
                log::trace!("Group '{}' created with {} variables", name, vars.len());
                Ok(GroupNode::with_vars(vars))
            }
            Ok(None) => {
                log::trace!("Group '{}' created without variables", name);
                Ok(GroupNode::default())
            }
            Err(e) => {
                log::debug!("Group '{}' variables failed to parse: {}", name, e);
                Err(BuildError::InvalidGroupVariables {
                    group: name.to_string(),
                    raw,
                })
            }
        }
    }
}
