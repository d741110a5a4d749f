//! Side-table answering "which configuration unit imported this class".
//!
//! Owned by the factory of one container; filled once per resolution run and
//! read by the import-aware interceptor.

use crate::model::metadata::ClassMetadata;
use indexmap::IndexMap;
use std::rc::Rc;

#[derive(Debug, Default, Clone)]
pub struct ImportRegistry {
    imports: IndexMap<String, Vec<Rc<ClassMetadata>>>,
    published: bool,
}

impl ImportRegistry {
    pub fn register_import(&mut self, importing: Rc<ClassMetadata>, imported_class: &str) {
        self.imports
            .entry(imported_class.to_string())
            .or_default()
            .push(importing);
    }

    /// Most recent importer of `imported_class`.
    pub fn importing_class_for(&self, imported_class: &str) -> Option<&ClassMetadata> {
        self.imports
            .get(imported_class)
            .and_then(|importers| importers.last())
            .map(Rc::as_ref)
    }

    pub fn imported_classes(&self) -> Vec<String> {
        self.imports.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Publishes `collected` into this table. Only the first publication sticks.
    pub fn publish(&mut self, collected: ImportRegistry) -> bool {
        if self.published {
            return false;
        }
        self.imports = collected.imports;
        self.published = true;
        true
    }
}
