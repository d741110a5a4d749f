//! Configuration resolution engine exposed as a priority extension.
//!
//! # Responsibility
//! - Registry phase: discover configuration units and expand them to a fixed point.
//! - Factory phase: enhance full units and install the import-aware interceptor.
//!
//! # Invariants
//! - Each phase runs at most once per container id.
//! - A definition tagged during discovery is never expanded again.
//! - The collected import side-table is published exactly once per run.
//!
//! # See also
//! - `config::parser` for expansion of one unit.
//! - `extension::invoker` for when each phase runs.

use crate::config::catalog::MetadataReader;
use crate::config::condition::ConditionEvaluator;
use crate::config::enhance::enhance_configuration_classes;
use crate::config::loader::DefinitionLoader;
use crate::config::parser::{check_candidate, tag_candidate, ConfigurationParser};
use crate::config::problems::{FailFastProblemReporter, ProblemReporter};
use crate::error::{EngineError, EngineResult, Phase};
use crate::extension::order::LOWEST_PRECEDENCE;
use crate::factory::instance::{Extension, Instance, Interceptor};
use crate::factory::{ComponentFactory, RegistryContext};
use crate::model::definition::{Capability, Tier};
use crate::model::metadata::ClassMetadata;
use crate::registry::{ContainerId, DefinitionRegistry};
use indexmap::IndexSet;
use log::{debug, info, trace};
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

/// Registry name of the configuration processor definition.
pub const CONFIGURATION_PROCESSOR_NAME: &str = "bootweave.internal.configurationProcessor";
/// Label of the interceptor installed during the factory phase.
pub const IMPORT_AWARE_INTERCEPTOR_NAME: &str = "bootweave.internal.importAwareInterceptor";

/// Outcome of one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    /// Candidate definition names per round.
    pub rounds: Vec<Vec<String>>,
    /// Classes parsed across all rounds, each exactly once.
    pub parsed_classes: Vec<String>,
    /// Classes skipped by their conditions.
    pub excluded_classes: Vec<String>,
}

pub struct ConfigurationProcessor {
    reader: Rc<dyn MetadataReader>,
    conditions: Rc<dyn ConditionEvaluator>,
    reporter: Box<dyn ProblemReporter>,
    allow_overriding: bool,
    registries_processed: HashSet<ContainerId>,
    factories_processed: HashSet<ContainerId>,
    last_summary: Option<ResolutionSummary>,
}

impl ConfigurationProcessor {
    pub fn new(reader: Rc<dyn MetadataReader>, conditions: Rc<dyn ConditionEvaluator>) -> Self {
        Self {
            reader,
            conditions,
            reporter: Box::new(FailFastProblemReporter),
            allow_overriding: true,
            registries_processed: HashSet::new(),
            factories_processed: HashSet::new(),
            last_summary: None,
        }
    }

    pub fn with_problem_reporter(mut self, reporter: Box<dyn ProblemReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_overriding = allow;
        self
    }

    pub fn last_summary(&self) -> Option<&ResolutionSummary> {
        self.last_summary.as_ref()
    }

    /// Discovers and expands configuration units until no new candidate appears.
    pub fn resolve(&mut self, ctx: &mut RegistryContext<'_>) -> EngineResult<ResolutionSummary> {
        let mut summary = ResolutionSummary::default();
        let mut known_names = ctx.registry.names();
        let mut candidates = collect_candidates(
            &*self.reader,
            &mut *ctx.registry,
            &known_names,
            &IndexSet::new(),
        )?;
        if candidates.is_empty() {
            debug!("event=resolution_skipped module=config reason=no_candidates");
            self.last_summary = Some(summary.clone());
            return Ok(summary);
        }
        candidates.sort_by_key(|(_, _, order)| order.unwrap_or(LOWEST_PRECEDENCE));

        let reader = &*self.reader;
        let conditions = &*self.conditions;
        let mut parser = ConfigurationParser::new(reader, conditions, &mut *self.reporter);
        let loader = DefinitionLoader::new(reader, conditions, self.allow_overriding);
        let mut parsed: IndexSet<String> = IndexSet::new();

        loop {
            summary
                .rounds
                .push(candidates.iter().map(|(name, _, _)| name.clone()).collect());
            let batch: Vec<(String, Rc<ClassMetadata>)> = candidates
                .drain(..)
                .map(|(name, metadata, _)| (name, metadata))
                .collect();
            parser.parse(&batch, &mut *ctx.registry)?;
            parser.validate()?;

            let fresh: Vec<_> = parser
                .classes()
                .filter(|config| !parsed.contains(config.class_name()))
                .cloned()
                .collect();
            loader.load(&fresh, &mut *ctx.registry)?;
            parsed.extend(fresh.iter().map(|config| config.class_name().to_string()));
            trace!(
                "event=resolution_round module=config round={} parsed={} definitions={}",
                summary.rounds.len(),
                fresh.len(),
                ctx.registry.count()
            );

            let current = ctx.registry.names();
            let previous: HashSet<&str> = known_names.iter().map(String::as_str).collect();
            let added: Vec<String> = current
                .iter()
                .filter(|name| !previous.contains(name.as_str()))
                .cloned()
                .collect();
            candidates = collect_candidates(reader, &mut *ctx.registry, &added, &parsed)?;
            known_names = current;
            if candidates.is_empty() {
                break;
            }
        }

        summary.excluded_classes = parser.excluded_classes();
        let published = ctx.imports.publish(parser.into_imports());
        summary.parsed_classes = parsed.into_iter().collect();
        info!(
            "event=resolution_completed module=config rounds={} units={} excluded={} imports_published={}",
            summary.rounds.len(),
            summary.parsed_classes.len(),
            summary.excluded_classes.len(),
            published
        );
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }
}

type Candidate = (String, Rc<ClassMetadata>, Option<i32>);

/// Checks and tags untagged definitions among `names`.
fn collect_candidates(
    reader: &dyn MetadataReader,
    registry: &mut dyn DefinitionRegistry,
    names: &[String],
    parsed: &IndexSet<String>,
) -> EngineResult<Vec<Candidate>> {
    let mut found = Vec::new();
    for name in names {
        let definition = registry.get_mut(name)?;
        if definition.config_kind.is_tagged() {
            trace!(
                "event=candidate_skipped module=config name={} reason=already_processed",
                name
            );
            continue;
        }
        let Some((kind, metadata)) = check_candidate(definition, reader) else {
            continue;
        };
        if parsed.contains(&metadata.class_name) {
            continue;
        }
        tag_candidate(definition, kind, &metadata);
        found.push((name.clone(), metadata, definition.order));
    }
    Ok(found)
}

impl Extension for ConfigurationProcessor {
    fn post_process_registry(&mut self, ctx: &mut RegistryContext<'_>) -> EngineResult<()> {
        let id = ctx.registry.container_id();
        if self.registries_processed.contains(&id) {
            return Err(double_invocation(Phase::Registry));
        }
        if self.factories_processed.contains(&id) {
            return Err(double_invocation(Phase::Factory));
        }
        self.registries_processed.insert(id);
        self.resolve(ctx)?;
        Ok(())
    }

    fn post_process_factory(&mut self, factory: &mut ComponentFactory) -> EngineResult<()> {
        let id = factory.container_id();
        if !self.factories_processed.insert(id) {
            return Err(double_invocation(Phase::Factory));
        }
        if !self.registries_processed.contains(&id) {
            debug!("event=lazy_resolution module=config container={}", id);
            self.resolve(&mut factory.registry_context())?;
        }
        enhance_configuration_classes(factory)?;
        let interceptor = factory.adopt_interceptor(
            IMPORT_AWARE_INTERCEPTOR_NAME,
            Tier::Priority,
            Some(LOWEST_PRECEDENCE),
            Capability::empty(),
            Rc::new(ImportAwareInterceptor),
        );
        factory.install_interceptor(interceptor);
        Ok(())
    }
}

fn double_invocation(phase: Phase) -> EngineError {
    EngineError::DoubleInvocation {
        handle: CONFIGURATION_PROCESSOR_NAME.to_string(),
        phase,
    }
}

/// Hands import-aware components the metadata of the unit that imported them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImportAwareInterceptor;

impl Interceptor for ImportAwareInterceptor {
    fn before_init(
        &self,
        factory: &ComponentFactory,
        name: &str,
        instance: &Instance,
    ) -> EngineResult<()> {
        let Instance::Component(component) = instance else {
            return Ok(());
        };
        let Some(sink) = component.import_aware() else {
            return Ok(());
        };
        let definition = factory.registry().get(name)?;
        if let Some(importing) = factory
            .imports()
            .importing_class_for(definition.class.target_name())
        {
            sink.set_import_metadata(importing);
        }
        Ok(())
    }
}
