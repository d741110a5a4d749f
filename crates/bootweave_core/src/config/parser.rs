//! Configuration-unit parsing.
//!
//! # Responsibility
//! - Decide whether a definition qualifies as a configuration unit.
//! - Expand candidates into `ConfigurationClass` records: scans, imports,
//!   factory-method declarations.
//! - Validate full units against the enhancement rules.
//!
//! # Invariants
//! - A unit excluded by its conditions yields no record and is not retried.
//! - Conditions are evaluated once per unit; scanned units at scan time.
//! - Imported records are emitted before the unit that imported them.
//! - An explicit candidate replaces an imported record of the same class;
//!   two imports of one class merge their importers.

use crate::config::catalog::MetadataReader;
use crate::config::condition::ConditionEvaluator;
use crate::config::imports::ImportRegistry;
use crate::config::naming::component_name;
use crate::config::problems::{Problem, ProblemKind, ProblemReporter};
use crate::error::{EngineError, EngineResult};
use crate::model::definition::{ConfigClassKind, Definition, DefinitionSource};
use crate::model::metadata::{ClassMetadata, FactoryMethodDecl, ImportRegistrar};
use crate::registry::DefinitionRegistry;
use indexmap::IndexMap;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Structural qualification of one definition.
///
/// Returns the kind the definition should be tagged with, plus the metadata
/// it was judged on, or `None` when it is not a configuration unit.
pub fn check_candidate(
    definition: &Definition,
    reader: &dyn MetadataReader,
) -> Option<(ConfigClassKind, Rc<ClassMetadata>)> {
    let class_name = definition.class.target_name();
    let Some(metadata) = reader.read_metadata(class_name) else {
        trace!(
            "event=candidate_check module=config class={} status=no_metadata",
            class_name
        );
        return None;
    };
    let kind = if metadata.stereotypes.configuration {
        ConfigClassKind::Full
    } else if metadata.stereotypes.component || metadata.declares_expansions() {
        ConfigClassKind::Lite
    } else {
        return None;
    };
    Some((kind, metadata))
}

/// Applies the outcome of `check_candidate` to a definition in place.
pub fn tag_candidate(definition: &mut Definition, kind: ConfigClassKind, metadata: &ClassMetadata) {
    definition.config_kind = kind;
    if definition.order.is_none() {
        definition.order = metadata.order;
    }
}

/// Resolved model of one configuration unit; discarded after projection.
#[derive(Debug, Clone)]
pub struct ConfigurationClass {
    pub metadata: Rc<ClassMetadata>,
    /// Registry name when the unit came from an existing definition.
    pub definition_name: Option<String>,
    /// Classes that imported this unit.
    pub imported_by: Vec<String>,
    pub factory_methods: Vec<FactoryMethodDecl>,
    pub registrars: Vec<(ImportRegistrar, Rc<ClassMetadata>)>,
}

impl ConfigurationClass {
    pub fn from_definition(name: impl Into<String>, metadata: Rc<ClassMetadata>) -> Self {
        Self {
            metadata,
            definition_name: Some(name.into()),
            imported_by: Vec::new(),
            factory_methods: Vec::new(),
            registrars: Vec::new(),
        }
    }

    pub fn imported(metadata: Rc<ClassMetadata>, importer: impl Into<String>) -> Self {
        Self {
            metadata,
            definition_name: None,
            imported_by: vec![importer.into()],
            factory_methods: Vec::new(),
            registrars: Vec::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        self.metadata.class_name.as_str()
    }

    pub fn is_imported(&self) -> bool {
        !self.imported_by.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.metadata.stereotypes.configuration
    }
}

/// Parser state shared across all rounds of one resolution run.
pub struct ConfigurationParser<'a> {
    reader: &'a dyn MetadataReader,
    conditions: &'a dyn ConditionEvaluator,
    reporter: &'a mut dyn ProblemReporter,
    classes: IndexMap<String, ConfigurationClass>,
    import_stack: Vec<String>,
    imports: ImportRegistry,
    excluded: BTreeSet<String>,
    validated: BTreeSet<String>,
}

impl<'a> ConfigurationParser<'a> {
    pub fn new(
        reader: &'a dyn MetadataReader,
        conditions: &'a dyn ConditionEvaluator,
        reporter: &'a mut dyn ProblemReporter,
    ) -> Self {
        Self {
            reader,
            conditions,
            reporter,
            classes: IndexMap::new(),
            import_stack: Vec::new(),
            imports: ImportRegistry::default(),
            excluded: BTreeSet::new(),
            validated: BTreeSet::new(),
        }
    }

    /// Parses one batch of `(definition name, metadata)` candidates.
    pub fn parse(
        &mut self,
        candidates: &[(String, Rc<ClassMetadata>)],
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        for (name, metadata) in candidates {
            self.process(
                ConfigurationClass::from_definition(name.clone(), Rc::clone(metadata)),
                registry,
            )?;
        }
        Ok(())
    }

    fn process(
        &mut self,
        config: ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        let class_name = config.class_name().to_string();
        if self
            .conditions
            .should_skip(&class_name, &config.metadata.conditions)
        {
            self.excluded.insert(class_name);
            return Ok(());
        }
        self.process_included(config, registry)
    }

    /// Expands a unit whose conditions already passed.
    fn process_included(
        &mut self,
        mut config: ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        let class_name = config.class_name().to_string();
        if let Some(existing) = self.classes.get_mut(&class_name) {
            if config.is_imported() {
                if existing.is_imported() {
                    for importer in config.imported_by {
                        if !existing.imported_by.contains(&importer) {
                            existing.imported_by.push(importer);
                        }
                    }
                }
                return Ok(());
            }
            debug!(
                "event=unit_replaced module=config class={} reason=explicit_over_imported",
                class_name
            );
            self.classes.shift_remove(&class_name);
        }

        self.process_scans(&config, registry)?;
        self.process_imports(&mut config, registry)?;
        config.factory_methods = config.metadata.factory_methods.clone();

        trace!(
            "event=unit_parsed module=config class={} factory_methods={} imported={}",
            class_name,
            config.factory_methods.len(),
            config.is_imported()
        );
        self.classes.insert(class_name, config);
        Ok(())
    }

    fn process_scans(
        &mut self,
        config: &ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        for scan in &config.metadata.scans {
            for found in self.reader.scan(scan)? {
                if self
                    .conditions
                    .should_skip(&found.class_name, &found.conditions)
                {
                    self.excluded.insert(found.class_name.clone());
                    continue;
                }
                let name = component_name(&found);
                if registry.contains(&name) {
                    let existing = registry.get(&name)?;
                    if existing.class.target_name() == found.class_name {
                        continue;
                    }
                    return Err(EngineError::DefinitionConflict {
                        name,
                        existing: existing.class.to_string(),
                        incoming: found.class_name.clone(),
                    });
                }

                let mut definition = Definition::from_metadata(
                    &found,
                    DefinitionSource::Scanned {
                        base_package: scan.base_package.clone(),
                    },
                );
                let candidate = check_candidate(&definition, self.reader);
                if let Some((kind, metadata)) = &candidate {
                    tag_candidate(&mut definition, *kind, metadata);
                }
                registry.put(&name, definition)?;

                if let Some((_, metadata)) = candidate {
                    if !self.classes.contains_key(&metadata.class_name) {
                        self.process_included(
                            ConfigurationClass::from_definition(name, metadata),
                            registry,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    fn process_imports(
        &mut self,
        config: &mut ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        if config.metadata.imports.is_empty() {
            return Ok(());
        }
        let importing = config.class_name().to_string();
        self.import_stack.push(importing.clone());
        let outcome = self.process_import_list(config, &importing, registry);
        self.import_stack.pop();
        outcome
    }

    fn process_import_list(
        &mut self,
        config: &mut ConfigurationClass,
        importing: &str,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        for imported in config.metadata.imports.clone() {
            if self.import_stack.iter().any(|on_stack| on_stack == &imported) {
                self.reporter.report(Problem::new(
                    ProblemKind::CircularImport,
                    importing,
                    format!(
                        "circular import of `{imported}` via {}",
                        self.import_stack.join(" -> ")
                    ),
                ))?;
                continue;
            }
            let metadata = self
                .reader
                .read_metadata(&imported)
                .ok_or_else(|| EngineError::MissingMetadata(imported.clone()))?;
            self.imports
                .register_import(Rc::clone(&config.metadata), &imported);

            if let Some(registrar) = &metadata.registrar {
                config
                    .registrars
                    .push((registrar.clone(), Rc::clone(&config.metadata)));
                continue;
            }
            self.process(ConfigurationClass::imported(metadata, importing), registry)?;
        }
        Ok(())
    }

    /// Validates full units parsed since the previous call.
    pub fn validate(&mut self) -> EngineResult<()> {
        let mut problems = Vec::new();
        for config in self.classes.values() {
            if !config.is_full() || self.validated.contains(config.class_name()) {
                continue;
            }
            if config.metadata.is_final {
                problems.push(Problem::new(
                    ProblemKind::FinalConfiguration,
                    config.class_name(),
                    "configuration units must not be final",
                ));
            }
            for method in &config.factory_methods {
                if !method.is_static && !method.overridable {
                    problems.push(Problem::new(
                        ProblemKind::NonOverridableFactoryMethod,
                        config.class_name(),
                        format!(
                            "factory method `{}` must be overridable to keep single-instance semantics",
                            method.method
                        ),
                    ));
                }
            }
        }
        let checked: Vec<String> = self
            .classes
            .values()
            .filter(|config| config.is_full())
            .map(|config| config.class_name().to_string())
            .collect();
        self.validated.extend(checked);
        for problem in problems {
            self.reporter.report(problem)?;
        }
        Ok(())
    }

    pub fn classes(&self) -> impl Iterator<Item = &ConfigurationClass> {
        self.classes.values()
    }

    /// Classes skipped by their conditions, in name order.
    pub fn excluded_classes(&self) -> Vec<String> {
        self.excluded.iter().cloned().collect()
    }

    pub fn into_imports(self) -> ImportRegistry {
        self.imports
    }
}
