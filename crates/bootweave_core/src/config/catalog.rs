//! Metadata reader contract and the in-memory class catalog.
//!
//! # Responsibility
//! - Answer "what does class X declare" for the resolution engine.
//! - Resolve scan declarations to component classes.
//!
//! # Invariants
//! - Scans only return classes carrying the component stereotype.
//! - Scan results follow catalog insertion order.

use crate::error::{EngineError, EngineResult};
use crate::model::metadata::{ClassMetadata, ScanDecl};
use indexmap::IndexMap;
use log::debug;
use regex::Regex;
use std::rc::Rc;

pub trait MetadataReader {
    fn read_metadata(&self, class_name: &str) -> Option<Rc<ClassMetadata>>;
    fn scan(&self, scan: &ScanDecl) -> EngineResult<Vec<Rc<ClassMetadata>>>;
}

/// Catalog of known classes keyed by fully-qualified name.
#[derive(Debug, Default, Clone)]
pub struct ClassCatalog {
    classes: IndexMap<String, Rc<ClassMetadata>>,
}

impl ClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one class.
    pub fn insert(&mut self, metadata: ClassMetadata) {
        self.classes
            .insert(metadata.class_name.clone(), Rc::new(metadata));
    }

    pub fn with(mut self, metadata: ClassMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl MetadataReader for ClassCatalog {
    fn read_metadata(&self, class_name: &str) -> Option<Rc<ClassMetadata>> {
        self.classes.get(class_name).cloned()
    }

    fn scan(&self, scan: &ScanDecl) -> EngineResult<Vec<Rc<ClassMetadata>>> {
        let include = compile_filters(&scan.include)?;
        let exclude = compile_filters(&scan.exclude)?;
        let found: Vec<Rc<ClassMetadata>> = self
            .classes
            .values()
            .filter(|metadata| in_package(metadata.package(), &scan.base_package))
            .filter(|metadata| metadata.stereotypes.component)
            .filter(|metadata| {
                include.is_empty() || include.iter().any(|re| re.is_match(&metadata.class_name))
            })
            .filter(|metadata| !exclude.iter().any(|re| re.is_match(&metadata.class_name)))
            .cloned()
            .collect();
        debug!(
            "event=scan_completed module=config base_package={} found={}",
            scan.base_package,
            found.len()
        );
        Ok(found)
    }
}

fn compile_filters(patterns: &[String]) -> EngineResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|err| EngineError::InvalidScanFilter {
                pattern: pattern.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

fn in_package(package: &str, base_package: &str) -> bool {
    let base = base_package.trim_end_matches('.');
    if base.is_empty() {
        return true;
    }
    package == base
        || package
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('.'))
}
