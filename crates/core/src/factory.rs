// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource type registry
//!
//! Concrete resource types are discovered by the embedding application and
//! registered here at startup. The controller owns one factory per
//! experiment; there is no process-wide type table.

use crate::error::FactoryError;
use crate::resource::ResourceBehavior;
use std::collections::HashMap;
use std::fmt;

type Constructor = Box<dyn Fn() -> Box<dyn ResourceBehavior> + Send + Sync>;

/// Creates behavior instances by type name
#[derive(Default)]
pub struct ResourceFactory {
    types: HashMap<String, Constructor>,
}

impl ResourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under a type name
    pub fn register<F, B>(
        &mut self,
        type_name: impl Into<String>,
        constructor: F,
    ) -> Result<(), FactoryError>
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: ResourceBehavior + 'static,
    {
        let type_name = type_name.into();
        if self.types.contains_key(&type_name) {
            return Err(FactoryError::DuplicateType(type_name));
        }
        self.types
            .insert(type_name, Box::new(move || Box::new(constructor())));
        Ok(())
    }

    /// Build a behavior instance for the given type
    pub fn create(&self, type_name: &str) -> Result<Box<dyn ResourceBehavior>, FactoryError> {
        self.types
            .get(type_name)
            .map(|constructor| constructor())
            .ok_or_else(|| FactoryError::UnknownType(type_name.to_string()))
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ResourceFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceFactory")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
#[path = "factory_tests.rs"]
mod tests;
