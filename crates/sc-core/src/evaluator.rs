use std::collections::BTreeMap;
use std::fmt;

use sc_model::{State, Transition};

use crate::event::Event;

/// The entity a contract clause or piece of code belongs to.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Statechart,
    State(&'a State),
    Transition { index: usize, transition: &'a Transition },
}

impl fmt::Display for Subject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Statechart => write!(f, "statechart"),
            Subject::State(state) => write!(f, "state '{}'", state.name),
            Subject::Transition { transition, .. } => match &transition.to_state {
                Some(to) => write!(f, "transition '{}' -> '{}'", transition.from_state, to),
                None => write!(f, "internal transition on '{}'", transition.from_state),
            },
        }
    }
}

/// Read-only information an [`Evaluator`] needs to resolve `active(...)`,
/// `after(...)`, `idle(...)` and similar expression-language builtins.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub configuration: &'a [String],
    pub time: f64,
    pub event: Option<&'a Event>,
}

impl EvalContext<'_> {
    pub fn is_active(&self, name: &str) -> bool {
        self.configuration.iter().any(|s| s == name)
    }
}

/// An error raised by evaluating or executing user code. Carries only a
/// message: the interpreter is responsible for attaching the subject,
/// configuration, and clause that were being evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError(pub String);

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EvalError {}

impl From<String> for EvalError {
    fn from(value: String) -> Self {
        EvalError(value)
    }
}

impl From<&str> for EvalError {
    fn from(value: &str) -> Self {
        EvalError(value.to_string())
    }
}

/// The collaborator that gives a statechart meaning.
///
/// `sc-core` never parses or runs expression-language source itself; it
/// only carries strings from `sc-model` and hands them to whichever
/// `Evaluator` the caller chose (a no-code evaluator for structural-only
/// testing, a dynamic one for live expressions). Events raised by user
/// code during execution are reported through `raise`, not returned
/// directly, so a single action can raise more than one internal event.
pub trait Evaluator {
    fn execute_preamble(
        &mut self,
        preamble: Option<&str>,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError>;

    fn execute_onentry(
        &mut self,
        state: &State,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError>;

    fn execute_onexit(
        &mut self,
        state: &State,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError>;

    fn execute_action(
        &mut self,
        transition_index: usize,
        transition: &Transition,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError>;

    fn evaluate_guard(
        &mut self,
        transition_index: usize,
        transition: &Transition,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError>;

    /// Returns the subset of `clauses` that did *not* hold.
    fn evaluate_preconditions(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError>;

    fn evaluate_invariants(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError>;

    fn evaluate_postconditions(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError>;

    /// A flattened, debug-printed snapshot of whatever state the evaluator
    /// keeps, attached to contract failure records for diagnostics.
    fn context_snapshot(&self) -> BTreeMap<String, String>;
}
