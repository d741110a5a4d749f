//! Non-fatal findings recorded while the container bootstraps.

use serde::Serialize;

/// Recorded anomaly; never changes control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An instance finished initialization before the interceptor chain was complete.
    NotEligibleForAllInterceptors {
        name: String,
        installed: usize,
        target: usize,
    },
    /// A full configuration unit was materialized before enhancement ran.
    EnhancementSkipped { name: String, class: String },
}
