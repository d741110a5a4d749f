//! Component factory: registry owner, handle arena and interceptor chain.
//!
//! # Responsibility
//! - Own the definition registry and the import side-table for one container.
//! - Instantiate handles and components on demand, running the interceptor chain.
//! - Keep the invocation ledger that turns double invocation into an error.
//!
//! # Invariants
//! - One factory is one container identity; its registry shares the same id.
//! - A singleton is created at most once; later lookups return the same instance.
//! - Installing an interceptor that is already in the chain moves it to the end.
//! - Capability lookups enumerate definitions in registry insertion order.

pub mod diagnostics;
pub mod instance;

use crate::config::enhance::EnhancedConfiguration;
use crate::config::imports::ImportRegistry;
use crate::error::{EngineError, EngineResult, Phase};
use crate::extension::order::{HandleComparator, NamedEntry};
use crate::model::definition::{
    Capability, Definition, InstanceSupplier, RawInstance, Tier, STATIC_FACTORY_METHOD_ATTRIBUTE,
};
use crate::registry::{ContainerId, DefinitionRegistry, DefinitionStore};
use diagnostics::Diagnostic;
use indexmap::IndexMap;
use instance::{
    ExtensionHandle, ExtensionRef, HandleId, Instance, InterceptorHandle, InterceptorRef,
};
use log::{debug, trace};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// View handed to registry-mutating extensions.
pub struct RegistryContext<'a> {
    pub registry: &'a mut dyn DefinitionRegistry,
    pub imports: &'a mut ImportRegistry,
}

/// Container-scoped factory.
pub struct ComponentFactory {
    registry: DefinitionStore,
    imports: ImportRegistry,
    next_handle: u32,
    singletons: IndexMap<String, Instance>,
    in_creation: HashSet<String>,
    interceptors: Vec<InterceptorHandle>,
    comparator: Option<Rc<dyn HandleComparator>>,
    merged: RefCell<HashMap<String, Definition>>,
    enhanced: HashMap<String, Rc<EnhancedConfiguration>>,
    invocations: HashSet<(HandleId, Phase)>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    listeners: RefCell<Vec<String>>,
}

impl ComponentFactory {
    pub fn new() -> Self {
        Self::with_store(DefinitionStore::new())
    }

    pub fn with_store(registry: DefinitionStore) -> Self {
        Self {
            registry,
            imports: ImportRegistry::default(),
            next_handle: 0,
            singletons: IndexMap::new(),
            in_creation: HashSet::new(),
            interceptors: Vec::new(),
            comparator: None,
            merged: RefCell::new(HashMap::new()),
            enhanced: HashMap::new(),
            invocations: HashSet::new(),
            diagnostics: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn container_id(&self) -> ContainerId {
        self.registry.container_id()
    }

    pub fn registry(&self) -> &DefinitionStore {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DefinitionStore {
        &mut self.registry
    }

    pub fn registry_context(&mut self) -> RegistryContext<'_> {
        RegistryContext {
            registry: &mut self.registry,
            imports: &mut self.imports,
        }
    }

    pub fn imports(&self) -> &ImportRegistry {
        &self.imports
    }

    pub fn set_comparator(&mut self, comparator: Rc<dyn HandleComparator>) {
        self.comparator = Some(comparator);
    }

    pub fn comparator(&self) -> Option<&dyn HandleComparator> {
        self.comparator.as_deref()
    }

    fn issue_id(&mut self) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        id
    }

    /// Gives an externally created extension an arena identity.
    pub fn adopt_extension(
        &mut self,
        label: impl Into<String>,
        tier: Tier,
        order: Option<i32>,
        capabilities: Capability,
        instance: ExtensionRef,
    ) -> ExtensionHandle {
        ExtensionHandle {
            id: self.issue_id(),
            label: label.into(),
            tier,
            order,
            capabilities,
            instance,
        }
    }

    /// Gives an externally created interceptor an arena identity.
    pub fn adopt_interceptor(
        &mut self,
        label: impl Into<String>,
        tier: Tier,
        order: Option<i32>,
        capabilities: Capability,
        instance: InterceptorRef,
    ) -> InterceptorHandle {
        InterceptorHandle {
            id: self.issue_id(),
            label: label.into(),
            tier,
            order,
            capabilities: capabilities | Capability::INTERCEPTOR,
            instance,
        }
    }

    /// Names of definitions declaring `capability`, in registry order.
    pub fn names_for_capability(&self, capability: Capability) -> Vec<String> {
        self.registry
            .iter()
            .filter(|(_, definition)| definition.provides(capability))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn is_assignable(&self, name: &str, capability: Capability) -> bool {
        self.registry
            .get(name)
            .map(|definition| definition.provides(capability))
            .unwrap_or(false)
    }

    /// Tier/order view of a definition, for classification before instantiation.
    pub fn entry(&self, name: &str) -> EngineResult<NamedEntry> {
        let definition = self.registry.get(name)?;
        Ok(NamedEntry {
            name: name.to_string(),
            tier: definition.tier,
            order: definition.order,
        })
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_key(name)
    }

    pub fn instantiate_extension(&mut self, name: &str) -> EngineResult<ExtensionHandle> {
        self.require_capability(
            name,
            Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING,
        )?;
        match self.get_instance(name)? {
            Instance::Extension(handle) => Ok(handle),
            _ => Err(EngineError::CapabilityMismatch {
                name: name.to_string(),
                expected: Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING,
            }),
        }
    }

    pub fn instantiate_interceptor(&mut self, name: &str) -> EngineResult<InterceptorHandle> {
        self.require_capability(name, Capability::INTERCEPTOR)?;
        match self.get_instance(name)? {
            Instance::Interceptor(handle) => Ok(handle),
            _ => Err(EngineError::CapabilityMismatch {
                name: name.to_string(),
                expected: Capability::INTERCEPTOR,
            }),
        }
    }

    fn require_capability(&self, name: &str, any_of: Capability) -> EngineResult<()> {
        let definition = self.registry.get(name)?;
        if definition.capabilities.intersects(any_of) {
            Ok(())
        } else {
            Err(EngineError::CapabilityMismatch {
                name: name.to_string(),
                expected: any_of,
            })
        }
    }

    /// Returns the singleton for `name`, creating and initializing it on first use.
    pub fn get_instance(&mut self, name: &str) -> EngineResult<Instance> {
        if let Some(instance) = self.singletons.get(name) {
            return Ok(instance.clone());
        }
        if !self.in_creation.insert(name.to_string()) {
            return Err(EngineError::HandleBusy(name.to_string()));
        }
        let created = self.create_instance(name);
        self.in_creation.remove(name);
        let instance = created?;
        self.singletons.insert(name.to_string(), instance.clone());
        Ok(instance)
    }

    fn create_instance(&mut self, name: &str) -> EngineResult<Instance> {
        let definition = self.registry.get(name)?.clone();
        let instance = match self.produce(&definition)? {
            RawInstance::Extension(extension) => Instance::Extension(ExtensionHandle {
                id: self.issue_id(),
                label: name.to_string(),
                tier: definition.tier,
                order: definition.order,
                capabilities: definition.capabilities,
                instance: extension,
            }),
            RawInstance::Interceptor(interceptor) => Instance::Interceptor(InterceptorHandle {
                id: self.issue_id(),
                label: name.to_string(),
                tier: definition.tier,
                order: definition.order,
                capabilities: definition.capabilities | Capability::INTERCEPTOR,
                instance: interceptor,
            }),
            RawInstance::Component(component) => Instance::Component(component),
        };
        trace!(
            "event=instance_created module=factory name={} kind={}",
            name,
            instance.kind()
        );
        self.initialize(name, &instance)?;
        Ok(instance)
    }

    fn produce(&mut self, definition: &Definition) -> EngineResult<RawInstance> {
        let supplier = definition
            .supplier
            .clone()
            .unwrap_or_else(|| InstanceSupplier::generic(&definition.class));
        let (Some(unit), Some(method)) = (&definition.factory_bean, &definition.factory_method)
        else {
            return Ok(supplier.produce());
        };

        let is_static = definition
            .attributes
            .get(STATIC_FACTORY_METHOD_ATTRIBUTE)
            .is_some_and(|value| value == "true");
        if !is_static {
            // Instance methods need their declaring unit to exist first.
            self.get_instance(unit)?;
        }
        match self.enhanced.get(unit) {
            Some(enhanced) => Ok(enhanced.intercept(method, is_static, &supplier)),
            None => Ok(supplier.produce()),
        }
    }

    /// Calls factory method `method` of unit `unit` the way another method of that unit would.
    ///
    /// Enhanced units return the cached instance for non-static methods.
    pub fn call_factory_method(&mut self, unit: &str, method: &str) -> EngineResult<RawInstance> {
        let definition = self
            .registry
            .iter()
            .find(|(_, definition)| {
                definition.factory_bean.as_deref() == Some(unit)
                    && definition.factory_method.as_deref() == Some(method)
            })
            .map(|(_, definition)| definition.clone())
            .ok_or_else(|| EngineError::MissingMetadata(format!("{unit}::{method}")))?;
        self.produce(&definition)
    }

    fn initialize(&self, name: &str, instance: &Instance) -> EngineResult<()> {
        let chain = self.interceptors.clone();
        if chain.iter().any(InterceptorHandle::merges_definitions) {
            let mut merged = self.merged_definition(name)?;
            for handle in chain.iter().filter(|handle| handle.merges_definitions()) {
                handle.instance.merge_definition(name, &mut merged);
            }
            self.merged.borrow_mut().insert(name.to_string(), merged);
        }
        for handle in &chain {
            handle.instance.before_init(self, name, instance)?;
        }
        for handle in &chain {
            handle.instance.after_init(self, name, instance)?;
        }
        Ok(())
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    pub fn interceptors(&self) -> &[InterceptorHandle] {
        &self.interceptors
    }

    /// Appends to the chain, moving an already installed handle to the end.
    pub fn install_interceptor(&mut self, handle: InterceptorHandle) {
        self.interceptors.retain(|installed| installed.id != handle.id);
        debug!(
            "event=interceptor_installed module=factory label={} id={} position={}",
            handle.label,
            handle.id,
            self.interceptors.len()
        );
        self.interceptors.push(handle);
    }

    /// Records one capability invocation; a repeat is fatal.
    pub fn record_invocation(&mut self, handle: &ExtensionHandle, phase: Phase) -> EngineResult<()> {
        if !self.invocations.insert((handle.id, phase)) {
            return Err(EngineError::DoubleInvocation {
                handle: handle.label.clone(),
                phase,
            });
        }
        Ok(())
    }

    /// Derived copy of a definition, cached until `clear_metadata_cache`.
    pub fn merged_definition(&self, name: &str) -> EngineResult<Definition> {
        if let Some(cached) = self.merged.borrow().get(name) {
            return Ok(cached.clone());
        }
        let merged = self.registry.get(name)?.clone();
        self.merged
            .borrow_mut()
            .insert(name.to_string(), merged.clone());
        Ok(merged)
    }

    pub fn clear_metadata_cache(&self) {
        let cleared = {
            let mut merged = self.merged.borrow_mut();
            let count = merged.len();
            merged.clear();
            count
        };
        debug!(
            "event=metadata_cache_cleared module=factory entries={}",
            cleared
        );
    }

    pub fn register_enhanced(&mut self, name: &str, enhanced: Rc<EnhancedConfiguration>) {
        self.enhanced.insert(name.to_string(), enhanced);
    }

    pub fn enhanced(&self, name: &str) -> Option<Rc<EnhancedConfiguration>> {
        self.enhanced.get(name).cloned()
    }

    pub fn record_diagnostic(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn register_listener(&self, name: &str) {
        let mut listeners = self.listeners.borrow_mut();
        if !listeners.iter().any(|existing| existing == name) {
            listeners.push(name.to_string());
        }
    }

    pub fn listeners(&self) -> Vec<String> {
        self.listeners.borrow().clone()
    }
}

impl Default for ComponentFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::ComponentFactory;
    use crate::error::{EngineError, Phase};
    use crate::factory::instance::{Extension, Instance, Interceptor};
    use crate::model::definition::{Capability, Definition, InstanceSupplier, Tier};
    use crate::registry::DefinitionRegistry;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Noop;

    impl Extension for Noop {}

    struct Passive;

    impl Interceptor for Passive {}

    #[test]
    fn capability_lookup_follows_registry_order() {
        let mut factory = ComponentFactory::new();
        let registry = factory.registry_mut();
        registry
            .put(
                "second",
                Definition::new("demo.Second").with_capabilities(Capability::FACTORY_CONFIGURING),
            )
            .unwrap();
        registry.put("plain", Definition::new("demo.Plain")).unwrap();
        registry
            .put(
                "first",
                Definition::new("demo.First").with_capabilities(
                    Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING,
                ),
            )
            .unwrap();

        assert_eq!(
            factory.names_for_capability(Capability::FACTORY_CONFIGURING),
            vec!["second", "first"]
        );
        assert!(factory.is_assignable("first", Capability::REGISTRY_MUTATING));
        assert!(!factory.is_assignable("plain", Capability::REGISTRY_MUTATING));
        assert!(!factory.is_assignable("missing", Capability::REGISTRY_MUTATING));
    }

    #[test]
    fn instantiates_extension_once_with_stable_id() {
        let mut factory = ComponentFactory::new();
        factory
            .registry_mut()
            .put(
                "ext",
                Definition::new("demo.Ext")
                    .with_capabilities(Capability::FACTORY_CONFIGURING)
                    .with_tier(Tier::Ordered)
                    .with_order(3)
                    .with_supplier(InstanceSupplier::extension(|| Rc::new(RefCell::new(Noop)))),
            )
            .unwrap();

        let first = factory.instantiate_extension("ext").unwrap();
        let second = factory.instantiate_extension("ext").unwrap();
        assert_eq!(first.id, second.id);
        assert!(Rc::ptr_eq(&first.instance, &second.instance));
        assert_eq!(first.tier, Tier::Ordered);
        assert_eq!(first.order, Some(3));
    }

    #[test]
    fn instantiating_plain_definition_as_extension_is_rejected() {
        let mut factory = ComponentFactory::new();
        factory
            .registry_mut()
            .put("plain", Definition::new("demo.Plain"))
            .unwrap();
        let err = factory
            .instantiate_extension("plain")
            .expect_err("plain definitions are not extensions");
        assert!(matches!(err, EngineError::CapabilityMismatch { .. }));
    }

    #[test]
    fn ledger_rejects_second_invocation_of_same_phase() {
        let mut factory = ComponentFactory::new();
        let handle = factory.adopt_extension(
            "explicit",
            Tier::Unordered,
            None,
            Capability::REGISTRY_MUTATING,
            Rc::new(RefCell::new(Noop)),
        );
        factory.record_invocation(&handle, Phase::Registry).unwrap();
        factory.record_invocation(&handle, Phase::Factory).unwrap();
        let err = factory
            .record_invocation(&handle, Phase::Registry)
            .expect_err("second registry invocation must fail");
        assert!(matches!(
            err,
            EngineError::DoubleInvocation {
                phase: Phase::Registry,
                ..
            }
        ));
    }

    #[test]
    fn reinstalling_interceptor_moves_it_to_the_end() {
        let mut factory = ComponentFactory::new();
        let a = factory.adopt_interceptor("a", Tier::Unordered, None, Capability::empty(), Rc::new(Passive));
        let b = factory.adopt_interceptor("b", Tier::Unordered, None, Capability::empty(), Rc::new(Passive));
        factory.install_interceptor(a.clone());
        factory.install_interceptor(b);
        factory.install_interceptor(a);

        let labels: Vec<&str> = factory
            .interceptors()
            .iter()
            .map(|handle| handle.label.as_str())
            .collect();
        assert_eq!(labels, vec!["b", "a"]);
        assert_eq!(factory.interceptor_count(), 2);
    }

    #[test]
    fn merged_definition_is_cached_until_cleared() {
        let mut factory = ComponentFactory::new();
        factory
            .registry_mut()
            .put("svc", Definition::new("demo.Svc").with_attribute("url", "${db.url}"))
            .unwrap();
        assert_eq!(
            factory.merged_definition("svc").unwrap().attributes["url"],
            "${db.url}"
        );

        factory
            .registry_mut()
            .get_mut("svc")
            .unwrap()
            .attributes
            .insert("url".to_string(), "jdbc:mem".to_string());
        assert_eq!(
            factory.merged_definition("svc").unwrap().attributes["url"],
            "${db.url}"
        );

        factory.clear_metadata_cache();
        assert_eq!(
            factory.merged_definition("svc").unwrap().attributes["url"],
            "jdbc:mem"
        );
    }

    #[test]
    fn generic_component_is_created_when_no_supplier_is_declared() {
        let mut factory = ComponentFactory::new();
        factory
            .registry_mut()
            .put("svc", Definition::new("demo.Svc"))
            .unwrap();
        let first = factory.get_instance("svc").unwrap();
        let second = factory.get_instance("svc").unwrap();
        match (first, second) {
            (Instance::Component(a), Instance::Component(b)) => assert!(Rc::ptr_eq(&a, &b)),
            other => panic!("expected components, got {other:?}"),
        }
        assert!(factory.contains_singleton("svc"));
    }
}
