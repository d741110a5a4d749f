use bootweave_core::config::processor::{CONFIGURATION_PROCESSOR_NAME, IMPORT_AWARE_INTERCEPTOR_NAME};
use bootweave_core::factory::instance::ExtensionRef;
use bootweave_core::{
    BootstrapContext, BootstrapSettings, Capability, ClassCatalog, ClassMetadata,
    ComponentFactory, ConditionEvaluator, DefinitionRegistry, EngineError, EngineResult,
    Extension, FactoryMethodDecl, Phase, Role, Tier,
};
use std::cell::RefCell;
use std::rc::Rc;

fn demo_catalog() -> ClassCatalog {
    ClassCatalog::new()
        .with(
            ClassMetadata::new("demo.AppConfig")
                .configuration()
                .importing("demo.DataConfig")
                .with_factory_method(FactoryMethodDecl::new("clock", "demo.Clock")),
        )
        .with(
            ClassMetadata::new("demo.DataConfig")
                .configuration()
                .with_factory_method(FactoryMethodDecl::new("dataSource", "demo.DataSource")),
        )
}

#[derive(Default)]
struct CountingExtension {
    factory_calls: usize,
}

impl Extension for CountingExtension {
    fn post_process_factory(&mut self, factory: &mut ComponentFactory) -> EngineResult<()> {
        self.factory_calls += 1;
        assert!(factory.registry().contains("dataSource"));
        Ok(())
    }
}

#[test]
fn refresh_resolves_configuration_and_builds_the_chain() {
    let mut ctx = BootstrapContext::new(BootstrapSettings::default(), Rc::new(demo_catalog())).unwrap();
    ctx.register_class("demo.AppConfig").unwrap();
    let counter = Rc::new(RefCell::new(CountingExtension::default()));
    let instance: ExtensionRef = counter.clone();
    ctx.add_extension(
        "counter",
        Tier::Unordered,
        None,
        Capability::FACTORY_CONFIGURING,
        instance,
    );

    let report = ctx.refresh().unwrap();

    assert_eq!(
        report.invocation.registry_phase(),
        vec![CONFIGURATION_PROCESSOR_NAME]
    );
    assert_eq!(
        report.invocation.factory_phase,
        vec![CONFIGURATION_PROCESSOR_NAME, "counter"]
    );
    assert_eq!(counter.borrow().factory_calls, 1);
    assert_eq!(report.interceptors[0], IMPORT_AWARE_INTERCEPTOR_NAME);
    assert_eq!(report.imported_classes, vec!["demo.DataConfig"]);
    assert!(report.problems.is_empty());

    let registry = ctx.factory().registry();
    for name in ["appConfig", "demo.DataConfig", "clock", "dataSource"] {
        assert!(registry.contains(name), "missing {name}");
    }
    assert_eq!(
        registry.get(CONFIGURATION_PROCESSOR_NAME).unwrap().role,
        Role::Infrastructure
    );
}

#[test]
fn second_refresh_is_a_double_invocation() {
    let mut ctx = BootstrapContext::new(BootstrapSettings::default(), Rc::new(demo_catalog())).unwrap();
    ctx.register_class("demo.AppConfig").unwrap();
    ctx.refresh().unwrap();
    let definitions = ctx.factory().registry().count();

    let err = ctx.refresh().expect_err("second refresh");

    assert!(matches!(
        err,
        EngineError::DoubleInvocation {
            phase: Phase::Registry,
            ..
        }
    ));
    assert_eq!(ctx.factory().registry().count(), definitions);
}

#[test]
fn report_serializes_to_json() {
    let mut ctx = BootstrapContext::new(BootstrapSettings::default(), Rc::new(demo_catalog())).unwrap();
    ctx.register_class("demo.AppConfig").unwrap();

    let report = ctx.refresh().unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(
        json["invocation"]["registry_batches"][0][0],
        CONFIGURATION_PROCESSOR_NAME
    );
    assert!(json["diagnostics"].as_array().unwrap().is_empty());
}

#[test]
fn settings_from_json_drive_conditions_and_reporting() {
    let settings = BootstrapSettings::from_json_str(
        r#"{"fail_fast": false, "active_conditions": ["cache"], "log_level": "warn"}"#,
    )
    .unwrap();
    let catalog = ClassCatalog::new()
        .with(ClassMetadata::new("demo.CacheConfig").configuration().conditional_on("cache"))
        .with(ClassMetadata::new("demo.Sealed").configuration().final_class());
    let mut ctx = BootstrapContext::new(settings, Rc::new(catalog)).unwrap();

    assert_eq!(
        ctx.register_class("demo.CacheConfig").unwrap().as_deref(),
        Some("cacheConfig")
    );
    ctx.register_class("demo.Sealed").unwrap();
    let report = ctx.refresh().unwrap();

    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].class_name, "demo.Sealed");
    assert_eq!(ctx.settings().log_level, "warn");
}

struct DenyAll;

impl ConditionEvaluator for DenyAll {
    fn should_skip(&self, _owner: &str, _conditions: &[String]) -> bool {
        true
    }
}

#[test]
fn custom_condition_evaluator_can_exclude_everything() {
    let mut ctx = BootstrapContext::with_conditions(
        BootstrapSettings::default(),
        Rc::new(demo_catalog()),
        Rc::new(DenyAll),
    )
    .unwrap();

    assert_eq!(ctx.register_class("demo.AppConfig").unwrap(), None);
    ctx.refresh().unwrap();
    assert!(!ctx.factory().registry().contains("clock"));
}

#[test]
fn unknown_classes_cannot_be_registered() {
    let mut ctx = BootstrapContext::new(BootstrapSettings::default(), Rc::new(ClassCatalog::new())).unwrap();
    let err = ctx.register_class("demo.Missing").expect_err("unknown class");
    assert!(matches!(err, EngineError::MissingMetadata(ref class) if class == "demo.Missing"));
}
