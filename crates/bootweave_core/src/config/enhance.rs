//! Enhancement of full configuration units.
//!
//! # Responsibility
//! - Swap the class of every full unit definition to its enhanced form.
//! - Give each enhanced unit a wrapper that keeps single-instance semantics
//!   for calls between its non-static factory methods.
//!
//! # Invariants
//! - A unit already materialized as a singleton is left alone and reported as
//!   a diagnostic, never an error.
//! - A sealed full unit cannot be enhanced.
//! - Enhancing twice is a no-op for units already carrying the enhanced class.

use crate::error::{EngineError, EngineResult};
use crate::factory::diagnostics::Diagnostic;
use crate::factory::ComponentFactory;
use crate::model::definition::{
    ClassRef, ConfigClassKind, InstanceSupplier, RawInstance, PRESERVE_TARGET_CLASS_ATTRIBUTE,
};
use crate::registry::DefinitionRegistry;
use log::{debug, info, trace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Runtime wrapper standing in for an enhanced configuration class.
#[derive(Debug)]
pub struct EnhancedConfiguration {
    target: ClassRef,
    produced: RefCell<HashMap<String, RawInstance>>,
}

impl EnhancedConfiguration {
    pub fn new(target: ClassRef) -> Self {
        Self {
            target,
            produced: RefCell::new(HashMap::new()),
        }
    }

    /// Class the wrapper was generated for.
    pub fn target(&self) -> &ClassRef {
        &self.target
    }

    /// Routes one factory-method call through the wrapper.
    ///
    /// Non-static methods run once; later calls return the first result.
    /// Static methods are not interceptable and always run.
    pub fn intercept(&self, method: &str, is_static: bool, supplier: &InstanceSupplier) -> RawInstance {
        if is_static {
            return supplier.produce();
        }
        if let Some(existing) = self.produced.borrow().get(method) {
            trace!(
                "event=factory_method_cached module=config class={} method={}",
                self.target,
                method
            );
            return existing.clone();
        }
        let produced = supplier.produce();
        self.produced
            .borrow_mut()
            .insert(method.to_string(), produced.clone());
        produced
    }

    pub fn intercepted_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.produced.borrow().keys().cloned().collect();
        methods.sort();
        methods
    }
}

/// Enhances every full unit in the factory's registry.
///
/// Returns the names of the definitions that were enhanced by this call.
pub fn enhance_configuration_classes(factory: &mut ComponentFactory) -> EngineResult<Vec<String>> {
    let mut candidates = Vec::new();
    for (name, definition) in factory.registry().iter() {
        if definition.config_kind != ConfigClassKind::Full || definition.class.is_enhanced() {
            continue;
        }
        if definition.is_sealed() {
            return Err(EngineError::DefinitionShape {
                name: name.to_string(),
                reason: "full configuration unit is sealed and cannot be enhanced".to_string(),
            });
        }
        if factory.contains_singleton(name) {
            info!(
                "event=enhancement_skipped module=config name={} class={} reason=already_instantiated",
                name, definition.class
            );
            factory.record_diagnostic(Diagnostic::EnhancementSkipped {
                name: name.to_string(),
                class: definition.class.to_string(),
            });
            continue;
        }
        candidates.push(name.to_string());
    }

    for name in &candidates {
        let definition = factory.registry_mut().get_mut(name)?;
        let original = definition.class.clone();
        definition.class = original.enhanced();
        definition
            .attributes
            .insert(PRESERVE_TARGET_CLASS_ATTRIBUTE.to_string(), "true".to_string());
        debug!(
            "event=unit_enhanced module=config name={} class={}",
            name, definition.class
        );
        factory.register_enhanced(name, Rc::new(EnhancedConfiguration::new(original)));
    }
    Ok(candidates)
}
