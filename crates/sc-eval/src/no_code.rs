use std::collections::BTreeMap;

use sc_core::{EvalContext, EvalError, Evaluator, Event, Subject};
use sc_model::{State, Transition};

/// An evaluator that treats every piece of code as a no-op and every guard
/// and contract clause as trivially satisfied.
///
/// Useful for validating the structure of a statechart (reachability,
/// determinism, hierarchy well-formedness) without writing any expression
/// language at all, and for the CLI's `--no-code` flag.
#[derive(Debug, Default)]
pub struct NoCodeEvaluator;

impl NoCodeEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for NoCodeEvaluator {
    fn execute_preamble(
        &mut self,
        _preamble: Option<&str>,
        _ctx: &EvalContext<'_>,
        _raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn execute_onentry(
        &mut self,
        _state: &State,
        _ctx: &EvalContext<'_>,
        _raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn execute_onexit(
        &mut self,
        _state: &State,
        _ctx: &EvalContext<'_>,
        _raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn execute_action(
        &mut self,
        _transition_index: usize,
        _transition: &Transition,
        _ctx: &EvalContext<'_>,
        _raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        Ok(())
    }

    fn evaluate_guard(
        &mut self,
        _transition_index: usize,
        _transition: &Transition,
        _ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        Ok(true)
    }

    fn evaluate_preconditions(
        &mut self,
        _subject: Subject<'_>,
        _clauses: &[String],
        _ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        Ok(Vec::new())
    }

    fn evaluate_invariants(
        &mut self,
        _subject: Subject<'_>,
        _clauses: &[String],
        _ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        Ok(Vec::new())
    }

    fn evaluate_postconditions(
        &mut self,
        _subject: Subject<'_>,
        _clauses: &[String],
        _ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        Ok(Vec::new())
    }

    fn context_snapshot(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
