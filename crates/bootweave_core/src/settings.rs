//! Bootstrap settings.
//!
//! Settings arrive as JSON; unknown keys are rejected so typos surface early.

use crate::error::{EngineError, EngineResult};
use crate::logging::{default_log_level, normalize_level};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapSettings {
    /// Whether a factory method may replace a definition registered elsewhere.
    pub allow_definition_overriding: bool,
    /// Abort on the first configuration problem instead of collecting them.
    pub fail_fast: bool,
    /// Condition keys considered active.
    pub active_conditions: Vec<String>,
    pub log_level: String,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            allow_definition_overriding: true,
            fail_fast: true,
            active_conditions: Vec::new(),
            log_level: default_log_level().to_string(),
        }
    }
}

impl BootstrapSettings {
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|err| EngineError::Settings(err.to_string()))?;
        normalize_level(&settings.log_level).map_err(EngineError::Settings)?;
        Ok(settings)
    }

    pub fn with_active_condition(mut self, condition: impl Into<String>) -> Self {
        self.active_conditions.push(condition.into());
        self
    }
}
