use bootweave_core::extension::interceptors::{CONSISTENCY_CHECKER_NAME, LISTENER_DETECTOR_NAME};
use bootweave_core::factory::instance::{ComponentRef, GenericComponent, InterceptorRef};
use bootweave_core::{
    register_interceptors, BootstrapContext, BootstrapSettings, Capability, ClassCatalog,
    ClassMetadata, ComponentFactory, Definition, DefinitionRegistry, Diagnostic, EngineResult,
    FactoryMethodDecl, Instance, InstanceSupplier, Interceptor, Role, Tier,
};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    label: String,
    log: Log,
}

impl Interceptor for Recorder {
    fn merge_definition(&self, _name: &str, definition: &mut Definition) {
        definition
            .attributes
            .insert("merged_by".to_string(), self.label.clone());
    }

    fn before_init(
        &self,
        _factory: &ComponentFactory,
        name: &str,
        _instance: &Instance,
    ) -> EngineResult<()> {
        self.log
            .borrow_mut()
            .push(format!("before:{}:{}", self.label, name));
        Ok(())
    }

    fn after_init(
        &self,
        _factory: &ComponentFactory,
        name: &str,
        _instance: &Instance,
    ) -> EngineResult<()> {
        self.log
            .borrow_mut()
            .push(format!("after:{}:{}", self.label, name));
        Ok(())
    }
}

fn recorder_supplier(label: &str, log: &Log) -> InstanceSupplier {
    let label = label.to_string();
    let log = Rc::clone(log);
    InstanceSupplier::interceptor(move || -> InterceptorRef {
        Rc::new(Recorder {
            label: label.clone(),
            log: Rc::clone(&log),
        })
    })
}

fn interceptor_definition(
    label: &str,
    tier: Tier,
    order: Option<i32>,
    capabilities: Capability,
    log: &Log,
) -> Definition {
    let definition = Definition::new(format!("demo.{label}"))
        .with_tier(tier)
        .with_capabilities(Capability::INTERCEPTOR | capabilities)
        .with_supplier(recorder_supplier(label, log));
    match order {
        Some(order) => definition.with_order(order),
        None => definition,
    }
}

#[test]
fn chain_is_tiered_with_merged_interceptors_last_and_detector_at_the_end() {
    let log: Log = Rc::default();
    let mut factory = ComponentFactory::new();
    let registry = factory.registry_mut();
    for (label, tier, order, capabilities) in [
        ("i1", Tier::Priority, Some(2), Capability::empty()),
        ("i2", Tier::Priority, Some(1), Capability::empty()),
        ("i3", Tier::Ordered, Some(0), Capability::empty()),
        ("i4", Tier::Unordered, None, Capability::empty()),
        ("m", Tier::Unordered, None, Capability::MERGED_DEFINITION),
        ("m2", Tier::Priority, None, Capability::MERGED_DEFINITION),
    ] {
        registry
            .put(label, interceptor_definition(label, tier, order, capabilities, &log))
            .unwrap();
    }

    let chain = register_interceptors(&mut factory).unwrap();

    assert_eq!(
        chain,
        vec![
            CONSISTENCY_CHECKER_NAME,
            "i2",
            "i1",
            "i3",
            "i4",
            "m2",
            "m",
            LISTENER_DETECTOR_NAME,
        ]
    );
    assert_eq!(factory.interceptor_count(), 8);
}

#[test]
fn interceptors_see_components_created_after_installation_only() {
    let log: Log = Rc::default();
    let mut factory = ComponentFactory::new();
    let registry = factory.registry_mut();
    registry.put("early", Definition::new("demo.Early")).unwrap();
    registry.put("late", Definition::new("demo.Late")).unwrap();
    registry
        .put(
            "audit",
            interceptor_definition("audit", Tier::Unordered, None, Capability::empty(), &log),
        )
        .unwrap();

    factory.get_instance("early").unwrap();
    register_interceptors(&mut factory).unwrap();
    factory.get_instance("late").unwrap();

    assert_eq!(
        *log.borrow(),
        vec!["before:audit:late", "after:audit:late"]
    );
}

#[test]
fn merged_definition_hooks_run_before_initialization() {
    let log: Log = Rc::default();
    let mut factory = ComponentFactory::new();
    let registry = factory.registry_mut();
    registry
        .put(
            "merger",
            interceptor_definition(
                "merger",
                Tier::Ordered,
                None,
                Capability::MERGED_DEFINITION,
                &log,
            ),
        )
        .unwrap();
    registry.put("svc", Definition::new("demo.Svc")).unwrap();

    register_interceptors(&mut factory).unwrap();
    factory.get_instance("svc").unwrap();

    let merged = factory.merged_definition("svc").unwrap();
    assert_eq!(merged.attributes["merged_by"], "merger");
    assert!(!factory
        .registry()
        .get("svc")
        .unwrap()
        .attributes
        .contains_key("merged_by"));
}

#[test]
fn components_created_while_the_chain_is_incomplete_are_diagnosed() {
    let log: Log = Rc::default();
    let catalog = ClassCatalog::new()
        .with(
            ClassMetadata::new("demo.AppConfig")
                .configuration()
                .with_factory_method(
                    FactoryMethodDecl::new("auditInterceptor", "demo.AuditInterceptor")
                        .with_supplier(recorder_supplier("auditInterceptor", &log)),
                ),
        )
        .with(
            ClassMetadata::new("demo.AuditInterceptor")
                .as_handle(Tier::Unordered, Capability::INTERCEPTOR),
        );
    let mut ctx = BootstrapContext::new(BootstrapSettings::default(), Rc::new(catalog)).unwrap();
    ctx.register_class("demo.AppConfig").unwrap();

    let report = ctx.refresh().unwrap();

    let flagged: Vec<&str> = report
        .diagnostics
        .iter()
        .filter_map(|diagnostic| match diagnostic {
            Diagnostic::NotEligibleForAllInterceptors { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(flagged, vec!["appConfig"]);
}

#[test]
fn infrastructure_components_are_not_diagnosed() {
    let log: Log = Rc::default();
    let mut factory = ComponentFactory::new();
    factory
        .registry_mut()
        .put(
            "support",
            Definition::new("demo.Support").with_role(Role::Infrastructure),
        )
        .unwrap();
    factory
        .registry_mut()
        .put(
            "user",
            Definition::new("demo.User").with_supplier(InstanceSupplier::component(
                || -> ComponentRef { Rc::new(GenericComponent::new("demo.User")) },
            )),
        )
        .unwrap();
    let support_supplier = InstanceSupplier::interceptor({
        let log = Rc::clone(&log);
        move || -> InterceptorRef {
            Rc::new(Recorder {
                label: "eager".to_string(),
                log: Rc::clone(&log),
            })
        }
    });
    factory
        .registry_mut()
        .put(
            "eager",
            Definition::new("demo.Eager")
                .with_capabilities(Capability::INTERCEPTOR)
                .with_tier(Tier::Priority)
                .with_supplier(support_supplier),
        )
        .unwrap();

    let checker = factory.adopt_interceptor(
        "checker",
        Tier::Priority,
        None,
        Capability::empty(),
        Rc::new(bootweave_core::extension::interceptors::ConsistencyChecker::new(5)),
    );
    factory.install_interceptor(checker);
    factory.get_instance("support").unwrap();
    factory.get_instance("user").unwrap();
    factory.get_instance("eager").unwrap();

    let flagged: Vec<String> = factory
        .diagnostics()
        .into_iter()
        .map(|diagnostic| match diagnostic {
            Diagnostic::NotEligibleForAllInterceptors { name, .. } => name,
            Diagnostic::EnhancementSkipped { name, .. } => name,
        })
        .collect();
    assert_eq!(flagged, vec!["user"]);
}

#[test]
fn listener_components_are_tracked_after_initialization() {
    let mut factory = ComponentFactory::new();
    factory
        .registry_mut()
        .put(
            "auditListener",
            Definition::new("demo.AuditListener").with_capabilities(Capability::LISTENER),
        )
        .unwrap();
    factory
        .registry_mut()
        .put("plain", Definition::new("demo.Plain"))
        .unwrap();

    register_interceptors(&mut factory).unwrap();
    factory.get_instance("auditListener").unwrap();
    factory.get_instance("plain").unwrap();

    assert_eq!(factory.listeners(), vec!["auditListener"]);
}
