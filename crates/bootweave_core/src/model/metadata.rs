//! Class metadata as seen by the configuration resolution engine.
//!
//! Metadata is produced by an external reader (see `config::catalog`); this
//! module only fixes its shape. Builders keep test fixtures and demo catalogs
//! short.

use crate::error::EngineResult;
use crate::model::definition::{Capability, InstanceSupplier, Role, Tier};
use crate::registry::DefinitionRegistry;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Stereotype markers a class may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stereotypes {
    /// Eligible for scanning.
    pub component: bool,
    /// Full configuration unit.
    pub configuration: bool,
}

/// Nested scan declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDecl {
    pub base_package: String,
    /// Regular expressions over fully-qualified class names; empty means all.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl ScanDecl {
    pub fn new(base_package: impl Into<String>) -> Self {
        Self {
            base_package: base_package.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn including(mut self, pattern: impl Into<String>) -> Self {
        self.include.push(pattern.into());
        self
    }

    pub fn excluding(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}

/// Factory-method declaration inside a configuration unit.
#[derive(Debug, Clone)]
pub struct FactoryMethodDecl {
    pub method: String,
    /// Registered definition name; defaults to the method name.
    pub definition_name: Option<String>,
    /// Class of the produced component.
    pub returns: String,
    pub is_static: bool,
    /// Whether an enhanced unit can intercept this method.
    pub overridable: bool,
    pub conditions: Vec<String>,
    pub supplier: Option<InstanceSupplier>,
}

impl FactoryMethodDecl {
    pub fn new(method: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            definition_name: None,
            returns: returns.into(),
            is_static: false,
            overridable: true,
            conditions: Vec::new(),
            supplier: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.definition_name = Some(name.into());
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn non_overridable(mut self) -> Self {
        self.overridable = false;
        self
    }

    pub fn conditional_on(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn with_supplier(mut self, supplier: InstanceSupplier) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn registered_name(&self) -> &str {
        self.definition_name.as_deref().unwrap_or(self.method.as_str())
    }
}

type RegistrarFn = dyn Fn(&ClassMetadata, &mut dyn DefinitionRegistry) -> EngineResult<()>;

/// Callback for imported classes that register definitions programmatically.
#[derive(Clone)]
pub struct ImportRegistrar(Rc<RegistrarFn>);

impl ImportRegistrar {
    pub fn new(
        callback: impl Fn(&ClassMetadata, &mut dyn DefinitionRegistry) -> EngineResult<()> + 'static,
    ) -> Self {
        Self(Rc::new(callback))
    }

    pub fn register(
        &self,
        importing: &ClassMetadata,
        registry: &mut dyn DefinitionRegistry,
    ) -> EngineResult<()> {
        (self.0)(importing, registry)
    }
}

impl Debug for ImportRegistrar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImportRegistrar(..)")
    }
}

/// Capability/annotation view of one class.
#[derive(Debug, Clone)]
pub struct ClassMetadata {
    pub class_name: String,
    pub stereotypes: Stereotypes,
    pub is_final: bool,
    pub order: Option<i32>,
    /// Condition keys; the class is excluded unless all are satisfied.
    pub conditions: Vec<String>,
    /// Explicit component name overriding the naming rule.
    pub component_name: Option<String>,
    pub imports: Vec<String>,
    pub scans: Vec<ScanDecl>,
    pub factory_methods: Vec<FactoryMethodDecl>,
    pub role: Role,
    pub tier: Tier,
    pub capabilities: Capability,
    pub supplier: Option<InstanceSupplier>,
    pub registrar: Option<ImportRegistrar>,
}

impl ClassMetadata {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            stereotypes: Stereotypes::default(),
            is_final: false,
            order: None,
            conditions: Vec::new(),
            component_name: None,
            imports: Vec::new(),
            scans: Vec::new(),
            factory_methods: Vec::new(),
            role: Role::User,
            tier: Tier::Unordered,
            capabilities: Capability::empty(),
            supplier: None,
            registrar: None,
        }
    }

    /// Marks a full configuration unit (implies component).
    pub fn configuration(mut self) -> Self {
        self.stereotypes.configuration = true;
        self.stereotypes.component = true;
        self
    }

    pub fn component(mut self) -> Self {
        self.stereotypes.component = true;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }

    pub fn final_class(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn conditional_on(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn importing(mut self, class_name: impl Into<String>) -> Self {
        self.imports.push(class_name.into());
        self
    }

    pub fn scanning(mut self, scan: ScanDecl) -> Self {
        self.scans.push(scan);
        self
    }

    pub fn with_factory_method(mut self, method: FactoryMethodDecl) -> Self {
        self.factory_methods.push(method);
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Declares the handle shape copied into definitions built from this class.
    pub fn as_handle(mut self, tier: Tier, capabilities: Capability) -> Self {
        self.tier = tier;
        self.capabilities = capabilities;
        self
    }

    pub fn with_supplier(mut self, supplier: InstanceSupplier) -> Self {
        self.supplier = Some(supplier);
        self
    }

    pub fn as_registrar(mut self, registrar: ImportRegistrar) -> Self {
        self.registrar = Some(registrar);
        self
    }

    /// Short class name after the last `.`.
    pub fn short_name(&self) -> &str {
        self.class_name
            .rsplit('.')
            .next()
            .unwrap_or(self.class_name.as_str())
    }

    /// Package part before the last `.`; empty for the default package.
    pub fn package(&self) -> &str {
        match self.class_name.rfind('.') {
            Some(index) => &self.class_name[..index],
            None => "",
        }
    }

    /// Whether the class declares anything the resolution engine expands.
    pub fn declares_expansions(&self) -> bool {
        !self.imports.is_empty() || !self.scans.is_empty() || !self.factory_methods.is_empty()
    }
}
