//! Projects parsed configuration units into registry definitions.
//!
//! # Responsibility
//! - Register imported units under their qualified class name.
//! - Turn factory-method declarations into definitions bound to their unit.
//! - Run import registrars against the registry.
//!
//! # Invariants
//! - A second factory method for an already-registered name in the same unit is
//!   an overload and is skipped.
//! - A factory method colliding with a definition from elsewhere replaces it
//!   only when overriding is allowed.

use crate::config::catalog::MetadataReader;
use crate::config::condition::ConditionEvaluator;
use crate::config::naming::import_name;
use crate::config::parser::{check_candidate, tag_candidate, ConfigurationClass};
use crate::error::{EngineError, EngineResult};
use crate::model::definition::{Definition, DefinitionSource, STATIC_FACTORY_METHOD_ATTRIBUTE};
use crate::model::metadata::FactoryMethodDecl;
use crate::registry::DefinitionRegistry;
use log::{debug, info};

pub struct DefinitionLoader<'a> {
    reader: &'a dyn MetadataReader,
    conditions: &'a dyn ConditionEvaluator,
    allow_overriding: bool,
}

impl<'a> DefinitionLoader<'a> {
    pub fn new(
        reader: &'a dyn MetadataReader,
        conditions: &'a dyn ConditionEvaluator,
        allow_overriding: bool,
    ) -> Self {
        Self {
            reader,
            conditions,
            allow_overriding,
        }
    }

    pub fn load(
        &self,
        classes: &[ConfigurationClass],
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        for config in classes {
            self.load_class(config, registry)?;
        }
        Ok(())
    }

    fn load_class(
        &self,
        config: &ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        let unit_name = match &config.definition_name {
            Some(name) => name.clone(),
            None => self.register_imported(config, registry)?,
        };

        for method in &config.factory_methods {
            let owner = format!("{}::{}", config.class_name(), method.method);
            if self.conditions.should_skip(&owner, &method.conditions) {
                continue;
            }
            self.load_factory_method(&unit_name, method, registry)?;
        }

        for (registrar, importing) in &config.registrars {
            registrar.register(importing, registry)?;
        }
        Ok(())
    }

    fn register_imported(
        &self,
        config: &ConfigurationClass,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<String> {
        let name = import_name(&config.metadata);
        if registry.contains(&name) {
            return Ok(name);
        }
        let importer = config.imported_by.first().cloned().unwrap_or_default();
        let mut definition =
            Definition::from_metadata(&config.metadata, DefinitionSource::Imported { importer });
        if let Some((kind, metadata)) = check_candidate(&definition, self.reader) {
            tag_candidate(&mut definition, kind, &metadata);
        }
        registry.put(&name, definition)?;
        debug!(
            "event=imported_unit_registered module=config name={} importers={}",
            name,
            config.imported_by.len()
        );
        Ok(name)
    }

    fn load_factory_method(
        &self,
        unit_name: &str,
        method: &FactoryMethodDecl,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        let name = method.registered_name().to_string();
        if registry.contains(&name) {
            let existing = registry.get(&name)?;
            if existing.factory_bean.as_deref() == Some(unit_name) {
                debug!(
                    "event=factory_method_overload_skipped module=config name={} unit={}",
                    name, unit_name
                );
                return Ok(());
            }
            if !self.allow_overriding {
                return Err(EngineError::DefinitionConflict {
                    name,
                    existing: existing.class.to_string(),
                    incoming: format!("{unit_name}::{}", method.method),
                });
            }
            info!(
                "event=definition_overridden module=config name={} by={}::{}",
                name, unit_name, method.method
            );
        }

        let source = DefinitionSource::FactoryMethod {
            unit: unit_name.to_string(),
            method: method.method.clone(),
        };
        let mut definition = match self.reader.read_metadata(&method.returns) {
            Some(returned) => Definition::from_metadata(&returned, source),
            None => Definition::new(method.returns.clone()).with_source(source),
        };
        if let Some(supplier) = &method.supplier {
            definition.supplier = Some(supplier.clone());
        }
        definition.factory_bean = Some(unit_name.to_string());
        definition.factory_method = Some(method.method.clone());
        if method.is_static {
            definition
                .attributes
                .insert(STATIC_FACTORY_METHOD_ATTRIBUTE.to_string(), "true".to_string());
        }
        registry.put(&name, definition)?;
        Ok(())
    }
}
