//! Pluggable reporting of configuration-unit rule violations.

use crate::error::{EngineError, EngineResult};
use log::{error, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// A full unit cannot be final: it could not be enhanced.
    FinalConfiguration,
    /// A non-static factory method of a full unit cannot be intercepted.
    NonOverridableFactoryMethod,
    CircularImport,
}

/// Structural problem found in one configuration unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub class_name: String,
    pub message: String,
}

impl Problem {
    pub fn new(kind: ProblemKind, class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            class_name: class_name.into(),
            message: message.into(),
        }
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "configuration problem in `{}`: {}",
            self.class_name, self.message
        )
    }
}

impl Error for Problem {}

pub trait ProblemReporter {
    /// Returns `Err` to abort resolution, `Ok` to continue.
    fn report(&mut self, problem: Problem) -> EngineResult<()>;
}

/// Default reporter: the first problem aborts resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFastProblemReporter;

impl ProblemReporter for FailFastProblemReporter {
    fn report(&mut self, problem: Problem) -> EngineResult<()> {
        error!(
            "event=configuration_problem module=config status=fatal kind={:?} class={}",
            problem.kind, problem.class_name
        );
        Err(EngineError::ConfigurationValidation(problem))
    }
}

/// Records problems and lets resolution continue.
///
/// Clones share the same underlying list, so a caller can keep one clone and
/// hand the other to the processor.
#[derive(Debug, Default, Clone)]
pub struct CollectingProblemReporter {
    problems: Rc<RefCell<Vec<Problem>>>,
}

impl CollectingProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problems(&self) -> Vec<Problem> {
        self.problems.borrow().clone()
    }
}

impl ProblemReporter for CollectingProblemReporter {
    fn report(&mut self, problem: Problem) -> EngineResult<()> {
        warn!(
            "event=configuration_problem module=config status=collected kind={:?} class={}",
            problem.kind, problem.class_name
        );
        self.problems.borrow_mut().push(problem);
        Ok(())
    }
}
