//! Explicit multibind contributions.
//!
//! Contributions are registered only through explicit wiring and are kept
//! apart from the main registry. When a type has contributions they replace
//! implicit aggregation of its bindings for collection-shaped dependencies.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{DiError, DiResult};
use crate::key::TypeKey;
use crate::registration::Recipe;

#[derive(Clone, Default)]
pub(crate) struct MultibindTable {
    sets: HashMap<TypeKey, Vec<Recipe>>,
    maps: HashMap<TypeKey, IndexMap<String, Recipe>>,
}

impl MultibindTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_to_set(&mut self, element: TypeKey, contribution: Recipe) {
        self.sets.entry(element).or_default().push(contribution);
    }

    pub(crate) fn add_to_map(
        &mut self,
        value: TypeKey,
        key: &str,
        contribution: Recipe,
    ) -> DiResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DiError::InvalidBinding(format!(
                "into_map key must be non-blank (value type {value})"
            )));
        }
        let entries = self.maps.entry(value).or_default();
        if entries.contains_key(key) {
            return Err(DiError::InvalidBinding(format!(
                "Duplicate into_map key '{key}' for value type {value}"
            )));
        }
        entries.insert(key.to_string(), contribution);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn has_set(&self, element: TypeKey) -> bool {
        self.sets.get(&element).is_some_and(|v| !v.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn has_map(&self, value: TypeKey) -> bool {
        self.maps.get(&value).is_some_and(|m| !m.is_empty())
    }

    /// Set/list contributions in registration order.
    pub(crate) fn set_contributions(&self, element: TypeKey) -> Vec<Recipe> {
        self.sets.get(&element).cloned().unwrap_or_default()
    }

    /// Map contributions in registration order.
    pub(crate) fn map_contributions(&self, value: TypeKey) -> IndexMap<String, Recipe> {
        self.maps.get(&value).cloned().unwrap_or_default()
    }

    pub(crate) fn set_count(&self, element: TypeKey) -> usize {
        self.sets.get(&element).map_or(0, Vec::len)
    }

    pub(crate) fn map_count(&self, value: TypeKey) -> usize {
        self.maps.get(&value).map_or(0, IndexMap::len)
    }

    pub(crate) fn total(&self) -> usize {
        self.sets.values().map(Vec::len).sum::<usize>()
            + self.maps.values().map(IndexMap::len).sum::<usize>()
    }

    pub(crate) fn clear(&mut self) {
        self.sets.clear();
        self.maps.clear();
    }
}
