//! Component-container bootstrap engine.
//!
//! Drives a definition registry through registry-mutating and
//! factory-configuring extensions, resolves configuration units to a fixed
//! point, and installs the interceptor chain.

pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod factory;
pub mod logging;
pub mod model;
pub mod registry;
pub mod settings;

pub use config::catalog::{ClassCatalog, MetadataReader};
pub use config::condition::{ActiveConditions, ConditionEvaluator};
pub use config::problems::{
    CollectingProblemReporter, FailFastProblemReporter, Problem, ProblemKind, ProblemReporter,
};
pub use config::processor::{ConfigurationProcessor, ResolutionSummary};
pub use context::{BootstrapContext, RefreshReport};
pub use error::{EngineError, EngineResult, Phase};
pub use extension::interceptors::register_interceptors;
pub use extension::invoker::{invoke_extensions, InvocationReport};
pub use factory::diagnostics::Diagnostic;
pub use factory::instance::{
    Component, Extension, ExtensionHandle, ImportAware, Instance, Interceptor, InterceptorHandle,
};
pub use factory::{ComponentFactory, RegistryContext};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::definition::{Capability, ConfigClassKind, Definition, InstanceSupplier, Role, Tier};
pub use model::metadata::{ClassMetadata, FactoryMethodDecl, ImportRegistrar, ScanDecl};
pub use registry::{DefinitionRegistry, DefinitionStore};
pub use settings::BootstrapSettings;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
