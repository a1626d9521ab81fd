use sc_model::Transition;

use crate::event::Event;

/// One atomic move of the interpreter: a single transition firing (or a
/// stabilization move with no transition), and the states it exits/enters.
#[derive(Debug, Clone, PartialEq)]
pub struct MicroStep {
    pub event: Option<Event>,
    pub transition: Option<Transition>,
    /// Exited, deepest-first.
    pub exited: Vec<String>,
    /// Entered, outer-to-inner.
    pub entered: Vec<String>,
}

impl MicroStep {
    pub fn consumed_event(event: Event) -> Self {
        Self {
            event: Some(event),
            transition: None,
            exited: Vec::new(),
            entered: Vec::new(),
        }
    }
}

/// One run-to-completion step: the initial transition-driven micro-step
/// plus every stabilization micro-step that followed it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroStep {
    pub steps: Vec<MicroStep>,
}

impl MacroStep {
    pub fn event(&self) -> Option<&Event> {
        self.steps.first().and_then(|s| s.event.as_ref())
    }

    pub fn entered(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.entered.iter().cloned()).collect()
    }

    pub fn exited(&self) -> Vec<String> {
        self.steps.iter().flat_map(|s| s.exited.iter().cloned()).collect()
    }

    pub fn transitions(&self) -> Vec<&Transition> {
        self.steps.iter().filter_map(|s| s.transition.as_ref()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
