use std::path::Path;

use anyhow::{Context, Result};
use sc_model::{History, State, StateKind, Statechart, Transition};
use serde::Deserialize;

/// On-disk `.sc.ron` representation of a [`Statechart`], read with the
/// `ron` crate. This is an intermediate plan, not `sc_model`'s own types
/// (which stay free of `serde` — `sc-model` carries no runtime behavior,
/// let alone a serialization format): `StatechartFixture::into_statechart`
/// lowers it into a validated `Statechart` the same way `Statechart::build`
/// validates a hand-built one.
#[derive(Debug, Deserialize)]
pub struct StatechartFixture {
    #[serde(default)]
    pub preamble: Option<String>,
    pub initial: String,
    pub states: Vec<StateFixture>,
    #[serde(default)]
    pub transitions: Vec<TransitionFixture>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct StateFixture {
    pub name: String,
    pub kind: StateKindFixture,
    #[serde(default)]
    pub on_entry: Option<String>,
    #[serde(default)]
    pub on_exit: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub enum StateKindFixture {
    Atomic,
    Final,
    Compound { children: Vec<String>, initial: String },
    Orthogonal { children: Vec<String> },
    History { deep: bool, initial: String },
}

#[derive(Debug, Deserialize)]
pub struct TransitionFixture {
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub guard: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub preconditions: Vec<String>,
    #[serde(default)]
    pub invariants: Vec<String>,
    #[serde(default)]
    pub postconditions: Vec<String>,
}

impl StatechartFixture {
    pub fn load(path: impl AsRef<Path>) -> Result<Statechart> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let fixture: StatechartFixture =
            ron::from_str(&content).with_context(|| format!("failed to parse {} as a statechart fixture", path.as_ref().display()))?;
        fixture.into_statechart().map_err(|e| anyhow::anyhow!("{e}"))
    }

    pub fn into_statechart(self) -> Result<Statechart, sc_model::ModelError> {
        let states = self.states.into_iter().map(StateFixture::into_state).collect();
        let transitions = self.transitions.into_iter().map(TransitionFixture::into_transition).collect();
        Statechart::build(self.preamble, self.initial, states, transitions, self.preconditions, self.invariants, self.postconditions)
    }
}

impl StateFixture {
    fn into_state(self) -> State {
        let kind = match self.kind {
            StateKindFixture::Atomic => StateKind::Atomic,
            StateKindFixture::Final => StateKind::Final,
            StateKindFixture::Compound { children, initial } => StateKind::Compound { children, initial },
            StateKindFixture::Orthogonal { children } => StateKind::Orthogonal { children },
            StateKindFixture::History { deep, initial } => StateKind::History(History { deep, initial }),
        };
        let mut state = State::new(self.name, kind);
        if let Some(code) = self.on_entry {
            state = state.with_on_entry(code);
        }
        if let Some(code) = self.on_exit {
            state = state.with_on_exit(code);
        }
        for clause in self.preconditions {
            state = state.with_precondition(clause);
        }
        for clause in self.invariants {
            state = state.with_invariant(clause);
        }
        for clause in self.postconditions {
            state = state.with_postcondition(clause);
        }
        state
    }
}

impl TransitionFixture {
    fn into_transition(self) -> Transition {
        let mut transition = Transition::new(self.from);
        if let Some(to) = self.to {
            transition = transition.to(to);
        }
        if let Some(event) = self.event {
            transition = transition.on(event);
        }
        if let Some(guard) = self.guard {
            transition = transition.guarded_by(guard);
        }
        if let Some(action) = self.action {
            transition = transition.with_action(action);
        }
        transition.preconditions = self.preconditions;
        transition.invariants = self.invariants;
        transition.postconditions = self.postconditions;
        transition
    }
}
