//! Component definition model.
//!
//! # Responsibility
//! - Describe one named component before any instance exists.
//! - Carry the capability flags and tier assigned at registration time.
//!
//! # Invariants
//! - Capability and tier are plain data; nothing inspects instances to find them.
//! - A definition tagged `Full` or `Lite` is never parsed as a configuration unit again.
//! - Sealed definitions reject in-place enhancement.

use crate::factory::instance::{ComponentRef, ExtensionRef, GenericComponent, InterceptorRef};
use crate::model::metadata::ClassMetadata;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;

/// Attribute key set on enhanced configuration definitions.
pub const PRESERVE_TARGET_CLASS_ATTRIBUTE: &str = "preserve_target_class";
/// Attribute key set on definitions produced by static factory methods.
pub const STATIC_FACTORY_METHOD_ATTRIBUTE: &str = "static_factory_method";

bitflags! {
    /// Capabilities a registered handle or component declares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Capability: u8 {
        /// May add or alter definitions before anything is instantiated.
        const REGISTRY_MUTATING = 1 << 0;
        /// May adjust factory-wide configuration once all definitions are known.
        const FACTORY_CONFIGURING = 1 << 1;
        /// Lifecycle interceptor.
        const INTERCEPTOR = 1 << 2;
        /// Interceptor that adjusts merged definitions; re-registered at the chain end.
        const MERGED_DEFINITION = 1 << 3;
        /// Component that wants to be tracked as a listener once initialized.
        const LISTENER = 1 << 4;
    }
}

/// Invocation precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Priority,
    Ordered,
    Unordered,
}

impl Tier {
    /// Lower rank runs first.
    pub fn rank(self) -> u8 {
        match self {
            Self::Priority => 0,
            Self::Ordered => 1,
            Self::Unordered => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    /// Support/internal component; skipped by eligibility checks.
    Infrastructure,
}

/// Configuration-class kind tag stored on a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigClassKind {
    None,
    /// Component-style unit; factory methods are plain calls.
    Lite,
    /// Configuration unit; factory methods keep single-instance semantics.
    Full,
}

impl ConfigClassKind {
    pub fn is_tagged(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Where a definition came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DefinitionSource {
    Explicit,
    Scanned { base_package: String },
    Imported { importer: String },
    FactoryMethod { unit: String, method: String },
    Registrar { registrar: String },
}

/// Reference to the implementing class of a definition.
///
/// Enhancement keeps the target name and flips `enhanced`, so lookups keyed by
/// the user-visible class keep working after the swap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassRef {
    target: String,
    enhanced: bool,
}

impl ClassRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            enhanced: false,
        }
    }

    /// Class name before any enhancement.
    pub fn target_name(&self) -> &str {
        self.target.as_str()
    }

    pub fn is_enhanced(&self) -> bool {
        self.enhanced
    }

    pub fn enhanced(&self) -> Self {
        Self {
            target: self.target.clone(),
            enhanced: true,
        }
    }
}

impl Display for ClassRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.enhanced {
            write!(f, "{}$$Enhanced", self.target)
        } else {
            write!(f, "{}", self.target)
        }
    }
}

/// Instance produced by a supplier, before the factory assigns it an identity.
#[derive(Clone)]
pub enum RawInstance {
    Extension(ExtensionRef),
    Interceptor(InterceptorRef),
    Component(ComponentRef),
}

impl RawInstance {
    pub fn same_instance(&self, other: &RawInstance) -> bool {
        match (self, other) {
            (Self::Extension(a), Self::Extension(b)) => Rc::ptr_eq(a, b),
            (Self::Interceptor(a), Self::Interceptor(b)) => Rc::ptr_eq(a, b),
            (Self::Component(a), Self::Component(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Debug for RawInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension(_) => write!(f, "RawInstance::Extension(..)"),
            Self::Interceptor(_) => write!(f, "RawInstance::Interceptor(..)"),
            Self::Component(_) => write!(f, "RawInstance::Component(..)"),
        }
    }
}

/// Factory closure producing one instance of a definition.
#[derive(Clone)]
pub enum InstanceSupplier {
    Extension(Rc<dyn Fn() -> ExtensionRef>),
    Interceptor(Rc<dyn Fn() -> InterceptorRef>),
    Component(Rc<dyn Fn() -> ComponentRef>),
}

impl InstanceSupplier {
    pub fn extension(supplier: impl Fn() -> ExtensionRef + 'static) -> Self {
        Self::Extension(Rc::new(supplier))
    }

    pub fn interceptor(supplier: impl Fn() -> InterceptorRef + 'static) -> Self {
        Self::Interceptor(Rc::new(supplier))
    }

    pub fn component(supplier: impl Fn() -> ComponentRef + 'static) -> Self {
        Self::Component(Rc::new(supplier))
    }

    pub fn produce(&self) -> RawInstance {
        match self {
            Self::Extension(supplier) => RawInstance::Extension(supplier()),
            Self::Interceptor(supplier) => RawInstance::Interceptor(supplier()),
            Self::Component(supplier) => RawInstance::Component(supplier()),
        }
    }

    /// Supplier used when a definition declares none: a plain class instance.
    pub fn generic(class: &ClassRef) -> Self {
        let class_name = class.to_string();
        Self::component(move || Rc::new(GenericComponent::new(class_name.clone())))
    }
}

impl Debug for InstanceSupplier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extension(_) => write!(f, "InstanceSupplier::Extension(..)"),
            Self::Interceptor(_) => write!(f, "InstanceSupplier::Interceptor(..)"),
            Self::Component(_) => write!(f, "InstanceSupplier::Component(..)"),
        }
    }
}

/// Named component definition stored in the registry.
#[derive(Debug, Clone)]
pub struct Definition {
    pub class: ClassRef,
    pub source: DefinitionSource,
    pub role: Role,
    pub tier: Tier,
    /// Explicit order value; `None` sorts as lowest precedence.
    pub order: Option<i32>,
    pub capabilities: Capability,
    pub config_kind: ConfigClassKind,
    /// Name of the definition whose factory method produces this one.
    pub factory_bean: Option<String>,
    pub factory_method: Option<String>,
    /// Free-form attribute bag.
    pub attributes: BTreeMap<String, String>,
    pub supplier: Option<InstanceSupplier>,
    sealed: bool,
}

impl Definition {
    /// Creates a plain user-role definition for `class`.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: ClassRef::new(class),
            source: DefinitionSource::Explicit,
            role: Role::User,
            tier: Tier::Unordered,
            order: None,
            capabilities: Capability::empty(),
            config_kind: ConfigClassKind::None,
            factory_bean: None,
            factory_method: None,
            attributes: BTreeMap::new(),
            supplier: None,
            sealed: false,
        }
    }

    /// Builds a definition from class metadata, copying its declared handle shape.
    pub fn from_metadata(metadata: &ClassMetadata, source: DefinitionSource) -> Self {
        let mut definition = Self::new(metadata.class_name.clone());
        definition.source = source;
        definition.role = metadata.role;
        definition.tier = metadata.tier;
        definition.order = metadata.order;
        definition.capabilities = metadata.capabilities;
        definition.supplier = metadata.supplier.clone();
        definition
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capability) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_source(mut self, source: DefinitionSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_supplier(mut self, supplier: InstanceSupplier) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Marks this definition as a foreign, non-enhanceable representation.
    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn provides(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_factory_method(&self) -> bool {
        self.factory_method.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, ClassRef, ConfigClassKind, Definition, Tier};

    #[test]
    fn enhanced_class_keeps_target_name() {
        let class = ClassRef::new("demo.AppConfig");
        let enhanced = class.enhanced();
        assert_eq!(enhanced.target_name(), "demo.AppConfig");
        assert!(enhanced.is_enhanced());
        assert_eq!(enhanced.to_string(), "demo.AppConfig$$Enhanced");
        assert_eq!(class.to_string(), "demo.AppConfig");
    }

    #[test]
    fn new_definition_defaults_to_untagged_unordered_user_component() {
        let definition = Definition::new("demo.Service");
        assert_eq!(definition.tier, Tier::Unordered);
        assert_eq!(definition.config_kind, ConfigClassKind::None);
        assert!(definition.capabilities.is_empty());
        assert!(!definition.is_sealed());
    }

    #[test]
    fn provides_checks_all_requested_flags() {
        let definition = Definition::new("demo.Ext").with_capabilities(
            Capability::REGISTRY_MUTATING | Capability::FACTORY_CONFIGURING,
        );
        assert!(definition.provides(Capability::REGISTRY_MUTATING));
        assert!(!definition.provides(Capability::REGISTRY_MUTATING | Capability::INTERCEPTOR));
    }

    #[test]
    fn tier_rank_is_strict() {
        assert!(Tier::Priority.rank() < Tier::Ordered.rank());
        assert!(Tier::Ordered.rank() < Tier::Unordered.rank());
    }
}
