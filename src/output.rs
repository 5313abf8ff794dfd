//! JSON output in Ansible's dynamic inventory format.
//!
//! # Output Schema
//!
//! `--list`:
//!
//! ```json
//! {
//!   "_meta": {
//!     "hostvars": {
//!       "web1": {"ansible_host": "10.0.0.1"}
//!     }
//!   },
//!   "webservers": ["web1"]
//! }
//! ```
//!
//! `--host web1`:
//!
//! ```json
//! {
//!   "ansible_host": "10.0.0.1"
//! }
//! ```
//!
//! Output is pretty-printed with two-space indentation and sorted keys.

use serde_json::{Map, Value};

use crate::inventory::{Inventory, Variables};

/// Reserved top-level key carrying host variables.
pub const META_KEY: &str = "_meta";

/// Key under [`META_KEY`] holding the host-variables table.
pub const HOSTVARS_KEY: &str = "hostvars";

/// Formatter for the full inventory listing.
#[derive(Debug, Clone, Copy)]
pub struct ListOutput<'a> {
    inventory: &'a Inventory,
}

impl<'a> ListOutput<'a> {
    #[must_use]
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    /// The listing as a JSON value.
    ///
    /// A group named `_meta` is replaced by the host-variables entry.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut root = match serde_json::to_value(&self.inventory.groups)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut meta = Map::new();
        meta.insert(
            HOSTVARS_KEY.to_string(),
            serde_json::to_value(&self.inventory.hostvars)?,
        );
        root.insert(META_KEY.to_string(), Value::Object(meta));

        Ok(Value::Object(root))
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value()?)
    }
}

/// Formatter for a single host's variables.
#[derive(Debug, Clone, Copy)]
pub struct HostOutput<'a> {
    vars: &'a Variables,
}

impl<'a> HostOutput<'a> {
    #[must_use]
    pub fn new(vars: &'a Variables) -> Self {
        Self { vars }
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self.vars)
    }
}
