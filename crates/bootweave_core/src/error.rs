//! Engine error taxonomy.
//!
//! # Responsibility
//! - Provide one fatal error type for the bootstrap pipeline.
//! - Keep non-fatal findings out of this type (see `factory::Diagnostic`).
//!
//! # Invariants
//! - Every variant is fatal: the container that produced it must be discarded.
//! - Nothing is rolled back when an error propagates.

use crate::config::problems::Problem;
use crate::model::definition::Capability;
use crate::registry::RegistryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Lifecycle phase of an extension capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Registry-mutating capability.
    Registry,
    /// Factory-configuring capability.
    Factory,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Factory => "factory",
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// A capability was invoked a second time against the same container.
    DoubleInvocation { handle: String, phase: Phase },
    /// Enhancement or expansion needs a mutable definition but found a sealed one.
    DefinitionShape { name: String, reason: String },
    /// A configuration unit broke a structural rule and the reporter fails fast.
    ConfigurationValidation(Problem),
    Registry(RegistryError),
    /// A definition was asked for a capability it does not declare.
    CapabilityMismatch { name: String, expected: Capability },
    MissingMetadata(String),
    DefinitionConflict {
        name: String,
        existing: String,
        incoming: String,
    },
    InvalidScanFilter { pattern: String, message: String },
    /// The handle is already executing further up the call stack.
    HandleBusy(String),
    Settings(String),
    Logging(String),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DoubleInvocation { handle, phase } => write!(
                f,
                "{} capability of `{handle}` already invoked against this container",
                phase.as_str()
            ),
            Self::DefinitionShape { name, reason } => {
                write!(f, "definition `{name}` has an unsupported shape: {reason}")
            }
            Self::ConfigurationValidation(problem) => write!(f, "{problem}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::CapabilityMismatch { name, expected } => {
                write!(f, "definition `{name}` does not provide {expected:?}")
            }
            Self::MissingMetadata(class) => write!(f, "no metadata available for class `{class}`"),
            Self::DefinitionConflict {
                name,
                existing,
                incoming,
            } => write!(
                f,
                "definition `{name}` of class `{incoming}` conflicts with existing class `{existing}`"
            ),
            Self::InvalidScanFilter { pattern, message } => {
                write!(f, "invalid scan filter `{pattern}`: {message}")
            }
            Self::HandleBusy(name) => write!(f, "handle `{name}` is already executing"),
            Self::Settings(message) => write!(f, "invalid bootstrap settings: {message}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(err) => Some(err),
            Self::ConfigurationValidation(problem) => Some(problem),
            _ => None,
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}
