//! Conditional-inclusion evaluation.

use log::debug;
use std::collections::BTreeSet;

/// Decides whether a unit or factory method is excluded.
pub trait ConditionEvaluator {
    /// `owner` names the class (or `Class::method`) the conditions belong to.
    fn should_skip(&self, owner: &str, conditions: &[String]) -> bool;
}

/// Condition keys switched on for this container.
///
/// A condition `key` holds when `key` is active; `!key` holds when it is not.
/// A unit is skipped unless every condition holds.
#[derive(Debug, Clone, Default)]
pub struct ActiveConditions {
    active: BTreeSet<String>,
}

impl ActiveConditions {
    pub fn new<I, S>(active: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: active.into_iter().map(Into::into).collect(),
        }
    }

    fn holds(&self, condition: &str) -> bool {
        match condition.trim().strip_prefix('!') {
            Some(negated) => !self.active.contains(negated.trim()),
            None => self.active.contains(condition.trim()),
        }
    }
}

impl ConditionEvaluator for ActiveConditions {
    fn should_skip(&self, owner: &str, conditions: &[String]) -> bool {
        let failed = conditions.iter().find(|condition| !self.holds(condition));
        if let Some(condition) = failed {
            debug!(
                "event=condition_excluded module=config owner={} condition={}",
                owner, condition
            );
            return true;
        }
        false
    }
}
