use std::collections::BTreeMap;
use std::fmt;

use crate::step::MacroStep;

/// A single unsatisfied contract clause, with enough context to act on it
/// without re-running the step.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractFailure {
    pub subject: String,
    pub clause: String,
    pub configuration: Vec<String>,
    pub context: BTreeMap<String, String>,
    /// The macro-step in progress when the clause was checked. `None` for
    /// the statechart's own preconditions, checked before any step exists.
    pub step: Option<MacroStep>,
}

impl fmt::Display for ContractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.clause)
    }
}

/// Everything that can stop a macro-step from completing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("precondition failed on {0}")]
    PreconditionFailed(ContractFailure),

    #[error("invariant failed on {0}")]
    InvariantFailed(ContractFailure),

    #[error("postcondition failed on {0}")]
    PostconditionFailed(ContractFailure),

    #[error(
        "non-determinism: '{t1}' and '{t2}' are both enabled from configuration {configuration:?} but share no orthogonal ancestor"
    )]
    NonDeterminism {
        t1: String,
        t2: String,
        configuration: Vec<String>,
    },

    #[error(
        "conflicting transitions: '{t1}' and '{t2}' both fire from configuration {configuration:?} and at least one leaves its orthogonal region"
    )]
    Conflict {
        t1: String,
        t2: String,
        configuration: Vec<String>,
    },

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error("clock time must be monotonic: cannot move from {current} to {requested}")]
    ClockNotMonotonic { current: f64, requested: f64 },
}

impl From<crate::evaluator::EvalError> for StepError {
    fn from(value: crate::evaluator::EvalError) -> Self {
        StepError::Evaluation(value.0)
    }
}

impl From<crate::clock::ClockError> for StepError {
    fn from(value: crate::clock::ClockError) -> Self {
        match value {
            crate::clock::ClockError::NotMonotonic { current, requested } => {
                StepError::ClockNotMonotonic { current, requested }
            }
        }
    }
}
