//! Definition registry contract and in-memory store.
//!
//! # Responsibility
//! - Store named definitions and expose name snapshots for round diffs.
//!
//! # Invariants
//! - `names()` enumerates in insertion order; replacing a definition keeps its slot.
//! - Callers re-snapshot `names()` every round instead of caching a view.
//! - Every store carries a stable container identity used by processed sets.

use crate::model::definition::Definition;
use indexmap::IndexMap;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque identity of one registry/factory pair.
pub type ContainerId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NotFound(String),
    InvalidName(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "no definition registered under `{name}`"),
            Self::InvalidName(name) => write!(f, "definition name is invalid: `{name}`"),
        }
    }
}

impl Error for RegistryError {}

/// Mutable store of named definitions.
pub trait DefinitionRegistry {
    fn container_id(&self) -> ContainerId;
    /// Snapshot of currently registered names, in insertion order.
    fn names(&self) -> Vec<String>;
    fn get(&self, name: &str) -> Result<&Definition, RegistryError>;
    fn get_mut(&mut self, name: &str) -> Result<&mut Definition, RegistryError>;
    /// Inserts or replaces.
    fn put(&mut self, name: &str, definition: Definition) -> Result<(), RegistryError>;
    fn remove(&mut self, name: &str) -> Result<Definition, RegistryError>;
    fn contains(&self, name: &str) -> bool;
    fn count(&self) -> usize;
}

/// Insertion-ordered in-memory registry.
#[derive(Debug)]
pub struct DefinitionStore {
    id: ContainerId,
    definitions: IndexMap<String, Definition>,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            definitions: IndexMap::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions
            .iter()
            .map(|(name, definition)| (name.as_str(), definition))
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry for DefinitionStore {
    fn container_id(&self) -> ContainerId {
        self.id
    }

    fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Result<&Definition, RegistryError> {
        self.definitions
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut Definition, RegistryError> {
        self.definitions
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn put(&mut self, name: &str, definition: Definition) -> Result<(), RegistryError> {
        if !is_valid_definition_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if let Some(previous) = self.definitions.insert(name.to_string(), definition) {
            debug!(
                "event=definition_replaced module=registry name={} previous_class={}",
                name, previous.class
            );
        }
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<Definition, RegistryError> {
        self.definitions
            .shift_remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    fn count(&self) -> usize {
        self.definitions.len()
    }
}

fn is_valid_definition_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::{DefinitionRegistry, DefinitionStore, RegistryError};
    use crate::model::definition::Definition;

    #[test]
    fn names_follow_insertion_order_and_replace_keeps_slot() {
        let mut store = DefinitionStore::new();
        store.put("b", Definition::new("demo.B")).unwrap();
        store.put("a", Definition::new("demo.A")).unwrap();
        store.put("c", Definition::new("demo.C")).unwrap();
        store.put("a", Definition::new("demo.A2")).unwrap();

        assert_eq!(store.names(), vec!["b", "a", "c"]);
        assert_eq!(store.get("a").unwrap().class.target_name(), "demo.A2");
        assert_eq!(store.count(), 3);
    }

    #[test]
    fn get_missing_returns_not_found() {
        let store = DefinitionStore::new();
        let err = store.get("missing").expect_err("missing name must fail");
        assert_eq!(err, RegistryError::NotFound("missing".to_string()));
    }

    #[test]
    fn rejects_blank_or_spaced_names() {
        let mut store = DefinitionStore::new();
        assert!(matches!(
            store.put("  ", Definition::new("demo.A")),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            store.put("two words", Definition::new("demo.A")),
            Err(RegistryError::InvalidName(_))
        ));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn remove_preserves_order_of_remaining_names() {
        let mut store = DefinitionStore::new();
        for name in ["x", "y", "z"] {
            store.put(name, Definition::new("demo.X")).unwrap();
        }
        store.remove("y").unwrap();
        assert_eq!(store.names(), vec!["x", "z"]);
        assert!(!store.contains("y"));
    }

    #[test]
    fn stores_get_distinct_container_ids() {
        assert_ne!(
            DefinitionStore::new().container_id(),
            DefinitionStore::new().container_id()
        );
    }
}
