//! Group node shapes.
//!
//! A group is serialized in one of two ways, matching what Ansible accepts:
//!
//! ```json
//! {
//!   "plain": ["web1", "web2"],
//!   "detailed": {
//!     "vars": {"env": "prod"},
//!     "hosts": ["db1"],
//!     "children": ["plain"]
//!   }
//! }
//! ```
//!
//! Every group starts out [`GroupNode::Plain`]. It becomes
//! [`GroupNode::Detailed`] when its metadata carries variables, or the first
//! time it is named as a parent. A detailed group never goes back to plain.

use serde::{Deserialize, Serialize};

use super::Variables;

/// Fields of a group that carries variables or children.
///
/// Absent fields are omitted from the serialized form. Unknown fields are
/// rejected so a foreign object is never read back as an empty group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupBody {
    /// Group variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<Variables>,
    /// Hosts directly in this group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    /// Names of child groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
}

/// A group in the inventory hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupNode {
    /// A bare list of host names.
    Plain(Vec<String>),
    /// A group with variables and/or children.
    Detailed(GroupBody),
}

impl Default for GroupNode {
    fn default() -> Self {
        GroupNode::Plain(Vec::new())
    }
}

impl GroupNode {
    /// A group carrying `vars` and an empty host list.
    #[must_use]
    pub fn with_vars(vars: Variables) -> Self {
        GroupNode::Detailed(GroupBody {
            vars: Some(vars),
            hosts: Some(Vec::new()),
            children: None,
        })
    }

    /// Whether this group is still a bare host list.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self, GroupNode::Plain(_))
    }

    /// Group variables, if any.
    #[must_use]
    pub fn vars(&self) -> Option<&Variables> {
        match self {
            GroupNode::Plain(_) => None,
            GroupNode::Detailed(body) => body.vars.as_ref(),
        }
    }

    /// Hosts directly in this group. Empty when the `hosts` field is absent.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        match self {
            GroupNode::Plain(hosts) => hosts,
            GroupNode::Detailed(body) => body.hosts.as_deref().unwrap_or_default(),
        }
    }

    /// Whether a `hosts` field is present. Always true for plain groups.
    #[must_use]
    pub fn has_hosts_field(&self) -> bool {
        match self {
            GroupNode::Plain(_) => true,
            GroupNode::Detailed(body) => body.hosts.is_some(),
        }
    }

    /// Child group names, if this group has been named as a parent.
    #[must_use]
    pub fn children(&self) -> Option<&[String]> {
        match self {
            GroupNode::Plain(_) => None,
            GroupNode::Detailed(body) => body.children.as_deref(),
        }
    }

    /// Append a host to whichever host list this group has.
    ///
    /// Duplicates are kept.
    pub fn push_host(&mut self, host: impl Into<String>) {
        match self {
            GroupNode::Plain(hosts) => hosts.push(host.into()),
            GroupNode::Detailed(body) => body.hosts.get_or_insert_with(Vec::new).push(host.into()),
        }
    }

    /// Turn this group into a parent: a plain list becomes
    /// `{hosts: <list>, children: []}`, and a detailed group gains empty
    /// `hosts`/`children` fields where they are missing.
    pub fn promote_to_parent(&mut self) {
        let body = match std::mem::take(self) {
            GroupNode::Plain(hosts) => GroupBody {
                vars: None,
                hosts: Some(hosts),
                children: Some(Vec::new()),
            },
            GroupNode::Detailed(mut body) => {
                body.hosts.get_or_insert_with(Vec::new);
                body.children.get_or_insert_with(Vec::new);
                body
            }
        };
        *self = GroupNode::Detailed(body);
    }

    /// Record `child` as a child group, promoting this group to a parent first.
    ///
    /// The child is stored by name only.
    pub fn push_child(&mut self, child: impl Into<String>) {
        self.promote_to_parent();
        if let GroupNode::Detailed(body) = self {
            body.children.get_or_insert_with(Vec::new).push(child.into());
        }
    }

    /// Drop an empty `hosts` field from a detailed group.
    ///
    /// Returns true if the field was removed. Plain groups are left alone.
    pub fn prune_empty_hosts(&mut self) -> bool {
        match self {
            GroupNode::Detailed(body) if body.hosts.as_ref().is_some_and(Vec::is_empty) => {
                body.hosts = None;
                true
            }
            _ => false,
        }
    }
}
