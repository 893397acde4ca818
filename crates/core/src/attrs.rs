// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque attribute store with the engine's two reserved flags
//!
//! The attribute schema belongs to the embedding system; this core treats
//! values as plain strings and only interprets `critical` and
//! `hard_release`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved flag: failures of this resource are fatal to dependents (default true)
pub const CRITICAL: &str = "critical";
/// Reserved flag: drop the resource from the registry after release (default false)
pub const HARD_RELEASE: &str = "hard_release";

/// String key/value attributes attached to a resource
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AttributeStore {
    values: HashMap<String, String>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Whether a failure of this resource is fatal to resources waiting on it
    ///
    /// Unset or unparseable values count as critical.
    pub fn critical(&self) -> bool {
        self.get(CRITICAL).map_or(true, |v| v.parse().unwrap_or(true))
    }

    /// Whether the resource should be dropped from the registry on release
    pub fn hard_release(&self) -> bool {
        self.get(HARD_RELEASE)
            .map_or(false, |v| v.parse().unwrap_or(false))
    }
}

#[cfg(test)]
#[path = "attrs_tests.rs"]
mod tests;
