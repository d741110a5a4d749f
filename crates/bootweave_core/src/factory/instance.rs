//! Handle and instance contracts.
//!
//! # Responsibility
//! - Define the traits extensions, interceptors and components implement.
//! - Pair each live handle with the arena identity the factory issued for it.
//!
//! # Invariants
//! - A `HandleId` is issued once per instance and never reused in a factory.
//! - Tier, order and capability flags on a handle are copied from registration data.

use crate::error::EngineResult;
use crate::extension::order::Prioritized;
use crate::factory::{ComponentFactory, RegistryContext};
use crate::model::definition::{Capability, Definition, Tier};
use crate::model::metadata::ClassMetadata;
use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

/// Arena index of an adopted or instantiated handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u32);

impl Display for HandleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry-mutating and/or factory-configuring extension.
///
/// Which hooks the engine calls is decided by the handle's capability flags,
/// not by which methods an implementation overrides.
pub trait Extension {
    fn post_process_registry(&mut self, _ctx: &mut RegistryContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    fn post_process_factory(&mut self, _factory: &mut ComponentFactory) -> EngineResult<()> {
        Ok(())
    }
}

/// Lifecycle interceptor installed into the factory chain.
pub trait Interceptor {
    /// Called only for handles flagged `MERGED_DEFINITION`.
    fn merge_definition(&self, _name: &str, _definition: &mut Definition) {}

    fn before_init(
        &self,
        _factory: &ComponentFactory,
        _name: &str,
        _instance: &Instance,
    ) -> EngineResult<()> {
        Ok(())
    }

    fn after_init(
        &self,
        _factory: &ComponentFactory,
        _name: &str,
        _instance: &Instance,
    ) -> EngineResult<()> {
        Ok(())
    }
}

/// Receives the metadata of the configuration unit that imported its class.
pub trait ImportAware {
    fn set_import_metadata(&self, importing: &ClassMetadata);
}

/// Plain managed component.
pub trait Component {
    fn import_aware(&self) -> Option<&dyn ImportAware> {
        None
    }
}

pub type ExtensionRef = Rc<RefCell<dyn Extension>>;
pub type InterceptorRef = Rc<dyn Interceptor>;
pub type ComponentRef = Rc<dyn Component>;

/// Component created for definitions that declare no supplier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericComponent {
    class_name: String,
}

impl GenericComponent {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class_name.as_str()
    }
}

impl Component for GenericComponent {}

/// Live extension paired with its registration data.
#[derive(Clone)]
pub struct ExtensionHandle {
    pub id: HandleId,
    /// Definition name, or a caller-chosen label for explicit handles.
    pub label: String,
    pub tier: Tier,
    pub order: Option<i32>,
    pub capabilities: Capability,
    pub instance: ExtensionRef,
}

impl ExtensionHandle {
    pub fn provides(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl Debug for ExtensionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("tier", &self.tier)
            .field("order", &self.order)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Prioritized for ExtensionHandle {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn order(&self) -> Option<i32> {
        self.order
    }
}

/// Live interceptor paired with its registration data.
#[derive(Clone)]
pub struct InterceptorHandle {
    pub id: HandleId,
    pub label: String,
    pub tier: Tier,
    pub order: Option<i32>,
    pub capabilities: Capability,
    pub instance: InterceptorRef,
}

impl InterceptorHandle {
    pub fn merges_definitions(&self) -> bool {
        self.capabilities.contains(Capability::MERGED_DEFINITION)
    }
}

impl Debug for InterceptorHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("tier", &self.tier)
            .field("order", &self.order)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl Prioritized for InterceptorHandle {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn order(&self) -> Option<i32> {
        self.order
    }
}

/// Materialized singleton held by the factory.
#[derive(Clone)]
pub enum Instance {
    Extension(ExtensionHandle),
    Interceptor(InterceptorHandle),
    Component(ComponentRef),
}

impl Instance {
    pub fn is_interceptor(&self) -> bool {
        matches!(self, Self::Interceptor(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Extension(_) => "extension",
            Self::Interceptor(_) => "interceptor",
            Self::Component(_) => "component",
        }
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension(handle) => write!(f, "Instance::Extension({handle:?})"),
            Self::Interceptor(handle) => write!(f, "Instance::Interceptor({handle:?})"),
            Self::Component(_) => write!(f, "Instance::Component(..)"),
        }
    }
}
