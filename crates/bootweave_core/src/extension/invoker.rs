//! Extension invocation engine.
//!
//! # Responsibility
//! - Invoke registry-mutating extensions in tier order until no new one appears.
//! - Then invoke factory-configuring extensions, explicit handles first.
//!
//! # Invariants
//! - Every handle's registry capability runs at most once per container, and
//!   before any factory capability.
//! - A handle registered during round N runs in a later round.
//! - Registry-discovered names are re-snapshotted every round.
//! - Explicit handles never appear in a discovered batch.

use crate::error::{EngineError, EngineResult, Phase};
use crate::extension::order::{classify, partition, sort_tier, Tiered};
use crate::factory::instance::ExtensionHandle;
use crate::factory::ComponentFactory;
use crate::model::definition::{Capability, Tier};
use log::{debug, info};
use serde::Serialize;
use std::collections::HashSet;

/// Invocation order observed during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    /// Registry-capability batches, explicit batch first when non-empty.
    pub registry_batches: Vec<Vec<String>>,
    pub factory_phase: Vec<String>,
}

impl InvocationReport {
    /// Flattened registry-capability invocation order.
    pub fn registry_phase(&self) -> Vec<String> {
        self.registry_batches.iter().flatten().cloned().collect()
    }

    /// Index of the batch in which `label` ran its registry capability.
    pub fn batch_of(&self, label: &str) -> Option<usize> {
        self.registry_batches
            .iter()
            .position(|batch| batch.iter().any(|entry| entry == label))
    }

    fn push_batch(&mut self, batch: Vec<String>) {
        if !batch.is_empty() {
            self.registry_batches.push(batch);
        }
    }
}

/// Runs both extension phases against `factory`.
///
/// `explicit` handles were supplied by the caller rather than discovered; their
/// registry capability runs first, in the given order.
pub fn invoke_extensions(
    factory: &mut ComponentFactory,
    explicit: &[ExtensionHandle],
) -> EngineResult<InvocationReport> {
    let mut report = InvocationReport::default();
    let mut processed: HashSet<String> = HashSet::new();
    let mut registry_processors: Vec<ExtensionHandle> = Vec::new();
    let mut regular: Vec<ExtensionHandle> = Vec::new();

    let mut batch = Vec::new();
    for handle in explicit {
        if handle.provides(Capability::REGISTRY_MUTATING) {
            invoke_registry(factory, handle)?;
            batch.push(handle.label.clone());
            registry_processors.push(handle.clone());
        } else {
            regular.push(handle.clone());
        }
    }
    report.push_batch(batch);

    // Priority handles registered by the first batch join the ordered batch.
    for tiers in [&[Tier::Priority][..], &[Tier::Priority, Tier::Ordered][..]] {
        let current = discover_registry_batch(factory, &mut processed, tiers)?;
        run_registry_batch(factory, current, &mut registry_processors, &mut report)?;
    }
    loop {
        let current = discover_registry_batch(factory, &mut processed, &ALL_TIERS)?;
        if current.is_empty() {
            break;
        }
        run_registry_batch(factory, current, &mut registry_processors, &mut report)?;
    }

    for handle in &registry_processors {
        if handle.provides(Capability::FACTORY_CONFIGURING) {
            invoke_factory(factory, handle)?;
            report.factory_phase.push(handle.label.clone());
        }
    }
    for handle in &regular {
        invoke_factory(factory, handle)?;
        report.factory_phase.push(handle.label.clone());
    }

    let remaining: Vec<_> = factory
        .names_for_capability(Capability::FACTORY_CONFIGURING)
        .into_iter()
        .filter(|name| !processed.contains(name))
        .map(|name| factory.entry(&name))
        .collect::<EngineResult<_>>()?;
    let Tiered {
        priority,
        ordered,
        unordered,
    } = partition(remaining);

    let mut priority = priority
        .iter()
        .map(|entry| factory.instantiate_extension(&entry.name))
        .collect::<EngineResult<Vec<_>>>()?;
    sort_tier(&mut priority, factory.comparator());
    run_factory_batch(factory, &priority, &mut report)?;

    let mut ordered = ordered
        .iter()
        .map(|entry| factory.instantiate_extension(&entry.name))
        .collect::<EngineResult<Vec<_>>>()?;
    sort_tier(&mut ordered, factory.comparator());
    run_factory_batch(factory, &ordered, &mut report)?;

    let unordered = unordered
        .iter()
        .map(|entry| factory.instantiate_extension(&entry.name))
        .collect::<EngineResult<Vec<_>>>()?;
    run_factory_batch(factory, &unordered, &mut report)?;

    // Extensions may have changed definitions after merged views were taken.
    factory.clear_metadata_cache();
    info!(
        "event=extensions_invoked module=extension registry={} factory={} rounds={}",
        report.registry_phase().len(),
        report.factory_phase.len(),
        report.registry_batches.len()
    );
    Ok(report)
}

const ALL_TIERS: [Tier; 3] = [Tier::Priority, Tier::Ordered, Tier::Unordered];

/// Instantiates not-yet-processed registry-mutating handles whose tier is in
/// `tiers`, and returns them in invocation order.
fn discover_registry_batch(
    factory: &mut ComponentFactory,
    processed: &mut HashSet<String>,
    tiers: &[Tier],
) -> EngineResult<Vec<ExtensionHandle>> {
    let names = factory.names_for_capability(Capability::REGISTRY_MUTATING);
    let mut handles = Vec::new();
    for name in names {
        if processed.contains(&name) {
            continue;
        }
        let entry = factory.entry(&name)?;
        if !tiers.contains(&entry.tier) {
            continue;
        }
        processed.insert(name.clone());
        handles.push(factory.instantiate_extension(&name)?);
    }
    Ok(classify(handles, factory.comparator()))
}

fn run_registry_batch(
    factory: &mut ComponentFactory,
    handles: Vec<ExtensionHandle>,
    registry_processors: &mut Vec<ExtensionHandle>,
    report: &mut InvocationReport,
) -> EngineResult<()> {
    let mut batch = Vec::with_capacity(handles.len());
    for handle in handles {
        invoke_registry(factory, &handle)?;
        batch.push(handle.label.clone());
        registry_processors.push(handle);
    }
    report.push_batch(batch);
    Ok(())
}

fn run_factory_batch(
    factory: &mut ComponentFactory,
    handles: &[ExtensionHandle],
    report: &mut InvocationReport,
) -> EngineResult<()> {
    for handle in handles {
        invoke_factory(factory, handle)?;
        report.factory_phase.push(handle.label.clone());
    }
    Ok(())
}

fn invoke_registry(factory: &mut ComponentFactory, handle: &ExtensionHandle) -> EngineResult<()> {
    factory.record_invocation(handle, Phase::Registry)?;
    debug!(
        "event=extension_invoked module=extension phase=registry label={} id={}",
        handle.label, handle.id
    );
    let mut extension = handle
        .instance
        .try_borrow_mut()
        .map_err(|_| EngineError::HandleBusy(handle.label.clone()))?;
    extension.post_process_registry(&mut factory.registry_context())
}

fn invoke_factory(factory: &mut ComponentFactory, handle: &ExtensionHandle) -> EngineResult<()> {
    factory.record_invocation(handle, Phase::Factory)?;
    debug!(
        "event=extension_invoked module=extension phase=factory label={} id={}",
        handle.label, handle.id
    );
    let mut extension = handle
        .instance
        .try_borrow_mut()
        .map_err(|_| EngineError::HandleBusy(handle.label.clone()))?;
    extension.post_process_factory(factory)
}
