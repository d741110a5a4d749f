//! Programmatic registration of classes and the built-in processors.

use crate::config::catalog::MetadataReader;
use crate::config::condition::ConditionEvaluator;
use crate::config::naming::component_name;
use crate::config::processor::CONFIGURATION_PROCESSOR_NAME;
use crate::error::{EngineError, EngineResult};
use crate::extension::order::LOWEST_PRECEDENCE;
use crate::model::definition::{Capability, Definition, DefinitionSource, InstanceSupplier, Role, Tier};
use crate::registry::DefinitionRegistry;
use log::{debug, info};

/// Registers classes by name, honoring their conditions and naming rules.
pub struct DefinitionReader<'a> {
    reader: &'a dyn MetadataReader,
    conditions: &'a dyn ConditionEvaluator,
}

impl<'a> DefinitionReader<'a> {
    pub fn new(reader: &'a dyn MetadataReader, conditions: &'a dyn ConditionEvaluator) -> Self {
        Self { reader, conditions }
    }

    /// Registers `class_name`; returns the definition name, or `None` when its
    /// conditions exclude it.
    pub fn register(
        &self,
        registry: &mut dyn DefinitionRegistry,
        class_name: &str,
    ) -> EngineResult<Option<String>> {
        self.register_as(registry, class_name, None)
    }

    pub fn register_as(
        &self,
        registry: &mut dyn DefinitionRegistry,
        class_name: &str,
        name: Option<&str>,
    ) -> EngineResult<Option<String>> {
        let metadata = self
            .reader
            .read_metadata(class_name)
            .ok_or_else(|| EngineError::MissingMetadata(class_name.to_string()))?;
        if self.conditions.should_skip(class_name, &metadata.conditions) {
            return Ok(None);
        }
        let name = match name {
            Some(name) => name.to_string(),
            None => component_name(&metadata),
        };
        registry.put(
            &name,
            Definition::from_metadata(&metadata, DefinitionSource::Explicit),
        )?;
        debug!(
            "event=class_registered module=config name={} class={}",
            name, class_name
        );
        Ok(Some(name))
    }
}

/// Registers the configuration processor definition unless already present.
///
/// The processor is an infrastructure, priority-tier extension ordered last
/// within its tier. Returns whether a definition was added.
pub fn register_config_processors(
    registry: &mut dyn DefinitionRegistry,
    supplier: InstanceSupplier,
) -> EngineResult<bool> {
    if registry.contains(CONFIGURATION_PROCESSOR_NAME) {
        return Ok(false);
    }
    let definition = Definition::new("bootweave.config.ConfigurationProcessor")
        .with_role(Role::Infrastructure)
        .with_tier(Tier::Priority)
        .with_order(LOWEST_PRECEDENCE)
        .with_capabilities(Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING)
        .with_supplier(supplier);
    registry.put(CONFIGURATION_PROCESSOR_NAME, definition)?;
    info!(
        "event=processor_registered module=config name={}",
        CONFIGURATION_PROCESSOR_NAME
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{register_config_processors, DefinitionReader};
    use crate::config::catalog::ClassCatalog;
    use crate::config::condition::ActiveConditions;
    use crate::config::processor::CONFIGURATION_PROCESSOR_NAME;
    use crate::error::EngineError;
    use crate::factory::instance::Extension;
    use crate::model::definition::{Capability, InstanceSupplier, Role, Tier};
    use crate::model::metadata::ClassMetadata;
    use crate::registry::{DefinitionRegistry, DefinitionStore};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Noop;

    impl Extension for Noop {}

    fn supplier() -> InstanceSupplier {
        InstanceSupplier::extension(|| Rc::new(RefCell::new(Noop)))
    }

    #[test]
    fn registers_under_component_name_and_skips_excluded_classes() {
        let catalog = ClassCatalog::new()
            .with(ClassMetadata::new("demo.AppConfig").configuration())
            .with(ClassMetadata::new("demo.DevConfig").configuration().conditional_on("dev"));
        let conditions = ActiveConditions::default();
        let reader = DefinitionReader::new(&catalog, &conditions);
        let mut registry = DefinitionStore::new();

        assert_eq!(
            reader.register(&mut registry, "demo.AppConfig").unwrap(),
            Some("appConfig".to_string())
        );
        assert_eq!(reader.register(&mut registry, "demo.DevConfig").unwrap(), None);
        assert_eq!(registry.names(), vec!["appConfig"]);
    }

    #[test]
    fn unknown_classes_are_reported() {
        let catalog = ClassCatalog::new();
        let conditions = ActiveConditions::default();
        let err = DefinitionReader::new(&catalog, &conditions)
            .register(&mut DefinitionStore::new(), "demo.Missing")
            .expect_err("no metadata");
        assert!(matches!(err, EngineError::MissingMetadata(_)));
    }

    #[test]
    fn processor_definition_is_registered_once() {
        let mut registry = DefinitionStore::new();
        assert!(register_config_processors(&mut registry, supplier()).unwrap());
        assert!(!register_config_processors(&mut registry, supplier()).unwrap());

        let definition = registry.get(CONFIGURATION_PROCESSOR_NAME).unwrap();
        assert_eq!(definition.role, Role::Infrastructure);
        assert_eq!(definition.tier, Tier::Priority);
        assert!(definition.provides(Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING));
    }
}
