//! Interceptor chain registration.
//!
//! # Responsibility
//! - Install every interceptor definition into the factory chain in tier order.
//! - Bracket the chain with the consistency checker (first) and the listener
//!   detector (last).
//!
//! # Invariants
//! - Merged-definition interceptors end up after all others, except the
//!   listener detector, sorted among themselves by tier.
//! - Interceptors only run for components initialized after installation.

use crate::error::EngineResult;
use crate::extension::order::{classify, partition, sort_tier, NamedEntry, Tiered};
use crate::factory::diagnostics::Diagnostic;
use crate::factory::instance::{Instance, Interceptor, InterceptorHandle};
use crate::factory::ComponentFactory;
use crate::model::definition::{Capability, Role, Tier};
use crate::registry::DefinitionRegistry;
use log::{debug, info};
use std::rc::Rc;

pub const CONSISTENCY_CHECKER_NAME: &str = "bootweave.internal.consistencyChecker";
pub const LISTENER_DETECTOR_NAME: &str = "bootweave.internal.listenerDetector";

/// Flags components initialized before the chain reached its target size.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyChecker {
    target: usize,
}

impl ConsistencyChecker {
    pub fn new(target: usize) -> Self {
        Self { target }
    }

    pub fn target(&self) -> usize {
        self.target
    }
}

impl Interceptor for ConsistencyChecker {
    fn after_init(
        &self,
        factory: &ComponentFactory,
        name: &str,
        instance: &Instance,
    ) -> EngineResult<()> {
        if instance.is_interceptor() {
            return Ok(());
        }
        let infrastructure = factory
            .registry()
            .get(name)
            .map(|definition| definition.role == Role::Infrastructure)
            .unwrap_or(false);
        if infrastructure {
            return Ok(());
        }
        let installed = factory.interceptor_count();
        if installed < self.target {
            info!(
                "event=not_eligible_for_all_interceptors module=extension name={} installed={} target={}",
                name, installed, self.target
            );
            factory.record_diagnostic(Diagnostic::NotEligibleForAllInterceptors {
                name: name.to_string(),
                installed,
                target: self.target,
            });
        }
        Ok(())
    }
}

/// Tracks listener-capable components once they are initialized.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListenerDetector;

impl Interceptor for ListenerDetector {
    fn after_init(
        &self,
        factory: &ComponentFactory,
        name: &str,
        _instance: &Instance,
    ) -> EngineResult<()> {
        if factory.is_assignable(name, Capability::LISTENER) {
            debug!("event=listener_detected module=extension name={}", name);
            factory.register_listener(name);
        }
        Ok(())
    }
}

/// Installs all interceptor definitions; returns the final chain labels.
pub fn register_interceptors(factory: &mut ComponentFactory) -> EngineResult<Vec<String>> {
    let names = factory.names_for_capability(Capability::INTERCEPTOR);
    let target = factory.interceptor_count() + 1 + names.len();
    let checker = factory.adopt_interceptor(
        CONSISTENCY_CHECKER_NAME,
        Tier::Priority,
        None,
        Capability::empty(),
        Rc::new(ConsistencyChecker::new(target)),
    );
    factory.install_interceptor(checker);

    let entries = names
        .iter()
        .map(|name| factory.entry(name))
        .collect::<EngineResult<Vec<_>>>()?;
    let Tiered {
        priority,
        ordered,
        unordered,
    } = partition(entries);
    let mut internal: Vec<InterceptorHandle> = Vec::new();

    let mut priority = instantiate_all(factory, &priority, &mut internal)?;
    sort_tier(&mut priority, factory.comparator());
    install_all(factory, priority);

    let mut ordered = instantiate_all(factory, &ordered, &mut internal)?;
    sort_tier(&mut ordered, factory.comparator());
    install_all(factory, ordered);

    let unordered = instantiate_all(factory, &unordered, &mut internal)?;
    install_all(factory, unordered);

    let internal = classify(internal, factory.comparator());
    install_all(factory, internal);

    let detector = factory.adopt_interceptor(
        LISTENER_DETECTOR_NAME,
        Tier::Unordered,
        None,
        Capability::empty(),
        Rc::new(ListenerDetector),
    );
    factory.install_interceptor(detector);

    let chain: Vec<String> = factory
        .interceptors()
        .iter()
        .map(|handle| handle.label.clone())
        .collect();
    info!(
        "event=interceptors_registered module=extension installed={} target={}",
        chain.len(),
        target
    );
    Ok(chain)
}

fn instantiate_all(
    factory: &mut ComponentFactory,
    entries: &[NamedEntry],
    internal: &mut Vec<InterceptorHandle>,
) -> EngineResult<Vec<InterceptorHandle>> {
    let mut handles = Vec::with_capacity(entries.len());
    for entry in entries {
        let handle = factory.instantiate_interceptor(&entry.name)?;
        if handle.merges_definitions() {
            internal.push(handle.clone());
        }
        handles.push(handle);
    }
    Ok(handles)
}

fn install_all(factory: &mut ComponentFactory, handles: Vec<InterceptorHandle>) {
    for handle in handles {
        factory.install_interceptor(handle);
    }
}
