//! Bootstrap context: one container from registration to a ready factory.
//!
//! # Responsibility
//! - Register the configuration processor and caller-supplied classes.
//! - Run the extension phases, then build the interceptor chain.
//!
//! # Invariants
//! - A context refreshes once; a second refresh fails with `DoubleInvocation`
//!   and leaves the factory as the first refresh left it.
//! - Fatal errors are not rolled back; discard the context after one.

use crate::config::catalog::MetadataReader;
use crate::config::condition::{ActiveConditions, ConditionEvaluator};
use crate::config::problems::{
    CollectingProblemReporter, FailFastProblemReporter, Problem, ProblemReporter,
};
use crate::config::processor::ConfigurationProcessor;
use crate::config::reader::{register_config_processors, DefinitionReader};
use crate::error::EngineResult;
use crate::extension::interceptors::register_interceptors;
use crate::extension::invoker::{invoke_extensions, InvocationReport};
use crate::factory::diagnostics::Diagnostic;
use crate::factory::instance::{ExtensionHandle, ExtensionRef, Instance};
use crate::factory::ComponentFactory;
use crate::model::definition::{Capability, Definition, InstanceSupplier, Tier};
use crate::registry::DefinitionRegistry;
use crate::settings::BootstrapSettings;
use log::info;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// What one refresh did.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub invocation: InvocationReport,
    /// Interceptor chain labels, in chain order.
    pub interceptors: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Problems collected when fail-fast is off.
    pub problems: Vec<Problem>,
    pub imported_classes: Vec<String>,
}

pub struct BootstrapContext {
    factory: ComponentFactory,
    settings: BootstrapSettings,
    reader: Rc<dyn MetadataReader>,
    conditions: Rc<dyn ConditionEvaluator>,
    problems: CollectingProblemReporter,
    explicit: Vec<ExtensionHandle>,
}

impl BootstrapContext {
    /// Context whose conditions are the settings' active condition keys.
    pub fn new(settings: BootstrapSettings, reader: Rc<dyn MetadataReader>) -> EngineResult<Self> {
        let conditions: Rc<dyn ConditionEvaluator> =
            Rc::new(ActiveConditions::new(settings.active_conditions.clone()));
        Self::with_conditions(settings, reader, conditions)
    }

    pub fn with_conditions(
        settings: BootstrapSettings,
        reader: Rc<dyn MetadataReader>,
        conditions: Rc<dyn ConditionEvaluator>,
    ) -> EngineResult<Self> {
        let mut factory = ComponentFactory::new();
        let problems = CollectingProblemReporter::new();
        let supplier = processor_supplier(&settings, &reader, &conditions, &problems);
        register_config_processors(factory.registry_mut(), supplier)?;
        Ok(Self {
            factory,
            settings,
            reader,
            conditions,
            problems,
            explicit: Vec::new(),
        })
    }

    /// Registers a class known to the metadata reader under its component name.
    pub fn register_class(&mut self, class_name: &str) -> EngineResult<Option<String>> {
        DefinitionReader::new(&*self.reader, &*self.conditions)
            .register(self.factory.registry_mut(), class_name)
    }

    pub fn register_definition(&mut self, name: &str, definition: Definition) -> EngineResult<()> {
        self.factory.registry_mut().put(name, definition)?;
        Ok(())
    }

    /// Adds an explicit extension; explicit handles run before discovered ones.
    pub fn add_extension(
        &mut self,
        label: &str,
        tier: Tier,
        order: Option<i32>,
        capabilities: Capability,
        instance: ExtensionRef,
    ) -> ExtensionHandle {
        let handle = self
            .factory
            .adopt_extension(label, tier, order, capabilities, instance);
        self.explicit.push(handle.clone());
        handle
    }

    pub fn refresh(&mut self) -> EngineResult<RefreshReport> {
        info!(
            "event=refresh_started module=bootstrap container={} definitions={} explicit={}",
            self.factory.container_id(),
            self.factory.registry().count(),
            self.explicit.len()
        );
        let invocation = invoke_extensions(&mut self.factory, &self.explicit)?;
        let interceptors = register_interceptors(&mut self.factory)?;
        let report = RefreshReport {
            invocation,
            interceptors,
            diagnostics: self.factory.diagnostics(),
            problems: self.problems.problems(),
            imported_classes: self.factory.imports().imported_classes(),
        };
        info!(
            "event=refresh_completed module=bootstrap definitions={} interceptors={} diagnostics={} problems={}",
            self.factory.registry().count(),
            report.interceptors.len(),
            report.diagnostics.len(),
            report.problems.len()
        );
        Ok(report)
    }

    pub fn get_instance(&mut self, name: &str) -> EngineResult<Instance> {
        self.factory.get_instance(name)
    }

    pub fn factory(&self) -> &ComponentFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ComponentFactory {
        &mut self.factory
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }
}

fn processor_supplier(
    settings: &BootstrapSettings,
    reader: &Rc<dyn MetadataReader>,
    conditions: &Rc<dyn ConditionEvaluator>,
    problems: &CollectingProblemReporter,
) -> InstanceSupplier {
    let reader = Rc::clone(reader);
    let conditions = Rc::clone(conditions);
    let problems = problems.clone();
    let fail_fast = settings.fail_fast;
    let allow_overriding = settings.allow_definition_overriding;
    InstanceSupplier::extension(move || {
        let reporter: Box<dyn ProblemReporter> = if fail_fast {
            Box::new(FailFastProblemReporter)
        } else {
            Box::new(problems.clone())
        };
        let processor: ExtensionRef = Rc::new(RefCell::new(
            ConfigurationProcessor::new(Rc::clone(&reader), Rc::clone(&conditions))
                .with_problem_reporter(reporter)
                .with_definition_overriding(allow_overriding),
        ));
        processor
    })
}
