use std::collections::HashMap;

use sc_core::{Interpreter, MacroStep, StepError};
use sc_model::Transition;

/// Records every [`MacroStep`] produced by [`Tracer::execute_once`], mirroring
/// the reference's `log_trace`: a thin wrapper around `execute_once` that
/// appends non-empty steps to a running log instead of monkey-patching the
/// interpreter's method in place.
#[derive(Debug, Default)]
pub struct Tracer {
    trace: Vec<MacroStep>,
}

impl Tracer {
    pub fn new() -> Self {
        Self { trace: Vec::new() }
    }

    /// Run one macro-step on `interpreter` and, if it did anything, append
    /// it to the trace.
    pub fn execute_once(&mut self, interpreter: &mut Interpreter) -> Result<Option<MacroStep>, StepError> {
        let step = interpreter.execute_once()?;
        if let Some(step) = &step {
            self.trace.push(step.clone());
        }
        Ok(step)
    }

    /// Run macro-steps until none remain (`max_steps <= 0`) or `max_steps`
    /// have executed, appending each to the trace.
    pub fn execute(&mut self, interpreter: &mut Interpreter, max_steps: i64) -> Result<Vec<MacroStep>, StepError> {
        let mut out = Vec::new();
        loop {
            if max_steps > 0 && out.len() as i64 >= max_steps {
                break;
            }
            match self.execute_once(interpreter)? {
                Some(step) => out.push(step),
                None => break,
            }
        }
        Ok(out)
    }

    pub fn trace(&self) -> &[MacroStep] {
        &self.trace
    }

    /// Coverage accumulated over the whole recorded trace so far.
    pub fn coverage(&self) -> Coverage {
        coverage_from_trace(&self.trace)
    }
}

/// Identifies a transition for coverage purposes without requiring
/// [`Transition`] to implement `Hash`: `from_state`, `event`, `to_state`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub from_state: String,
    pub event: Option<String>,
    pub to_state: Option<String>,
}

impl From<&Transition> for TransitionKey {
    fn from(t: &Transition) -> Self {
        Self { from_state: t.from_state.clone(), event: t.event.clone(), to_state: t.to_state.clone() }
    }
}

/// Visit counts for states entered and transitions fired over a trace.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Coverage {
    pub states: HashMap<String, usize>,
    pub transitions: HashMap<TransitionKey, usize>,
}

/// Tally state-entry and transition-firing counts across a recorded trace.
///
/// Counts every `entered` state of every micro-step, and every micro-step
/// that fired a transition, across every macro-step in `trace`.
pub fn coverage_from_trace(trace: &[MacroStep]) -> Coverage {
    let mut coverage = Coverage::default();
    for macro_step in trace {
        for micro_step in &macro_step.steps {
            for state in &micro_step.entered {
                *coverage.states.entry(state.clone()).or_insert(0) += 1;
            }
            if let Some(transition) = &micro_step.transition {
                *coverage.transitions.entry(TransitionKey::from(transition)).or_insert(0) += 1;
            }
        }
    }
    coverage
}
