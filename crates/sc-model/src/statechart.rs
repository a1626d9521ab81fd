use std::collections::HashMap;

use crate::error::ModelError;
use crate::state::{State, StateKind};
use crate::transition::Transition;

/// An immutable, validated hierarchical statechart.
///
/// `Statechart::build` is the only constructor; it checks every structural
/// invariant from the spec and returns [`ModelError`] rather than letting
/// an ill-formed chart reach the interpreter. Everything afterwards — the
/// interpreter, the tester harness, the CLI — can assume the chart is
/// well-formed.
#[derive(Debug, Clone)]
pub struct Statechart {
    /// Code to run once, before the root's `initial` state is entered.
    pub preamble: Option<String>,
    /// Name of the single top-level state entered at construction.
    pub initial: String,
    pub preconditions: Vec<String>,
    pub invariants: Vec<String>,
    pub postconditions: Vec<String>,
    states: HashMap<String, State>,
    transitions: Vec<Transition>,
    parents: HashMap<String, String>,
}

impl Statechart {
    /// Validate and freeze a statechart built from its states and transitions.
    ///
    /// Checks (§3): names unique, every `to_state`/`from_state` resolves,
    /// initial children exist and belong to their parent, history states
    /// attach only to compound parents, orthogonal children are compound
    /// or orthogonal.
    pub fn build(
        preamble: Option<String>,
        initial: impl Into<String>,
        states: Vec<State>,
        transitions: Vec<Transition>,
        preconditions: Vec<String>,
        invariants: Vec<String>,
        postconditions: Vec<String>,
    ) -> Result<Self, ModelError> {
        let initial = initial.into();
        let mut map = HashMap::with_capacity(states.len());
        for state in states {
            if map.insert(state.name.clone(), state).is_some() {
                let name = map.into_keys().next().unwrap_or_default();
                return Err(ModelError::DuplicateStateName(name));
            }
        }

        if !map.contains_key(&initial) {
            return Err(ModelError::MissingRootInitial);
        }

        let mut parents = HashMap::new();
        for state in map.values() {
            for child in state.children() {
                parents.insert(child.clone(), state.name.clone());
            }
        }

        for transition in &transitions {
            if !map.contains_key(&transition.from_state) {
                return Err(ModelError::NoSuchState(transition.from_state.clone()));
            }
            if let Some(to) = &transition.to_state
                && !map.contains_key(to)
            {
                return Err(ModelError::UnknownState {
                    from: transition.from_state.clone(),
                    to: to.clone(),
                });
            }
        }

        for state in map.values() {
            match &state.kind {
                StateKind::Compound { children, initial } => {
                    if initial.is_empty() {
                        return Err(ModelError::MissingInitial(state.name.clone()));
                    }
                    if !map.contains_key(initial) {
                        return Err(ModelError::UnknownInitial {
                            parent: state.name.clone(),
                            initial: initial.clone(),
                        });
                    }
                    if !children.iter().any(|c| c == initial) {
                        return Err(ModelError::InitialNotAChild {
                            parent: state.name.clone(),
                            initial: initial.clone(),
                        });
                    }
                }
                StateKind::History(history) => {
                    let parent = parents.get(&state.name).ok_or_else(|| {
                        ModelError::HistoryNotOnCompound(state.name.clone())
                    })?;
                    let parent_state = &map[parent];
                    if !parent_state.is_compound() {
                        return Err(ModelError::HistoryNotOnCompound(state.name.clone()));
                    }
                    if !map.contains_key(&history.initial) {
                        return Err(ModelError::UnknownInitial {
                            parent: state.name.clone(),
                            initial: history.initial.clone(),
                        });
                    }
                }
                StateKind::Orthogonal { children } => {
                    for child in children {
                        let child_state = map.get(child).ok_or_else(|| ModelError::NoSuchState(child.clone()))?;
                        if !(child_state.is_compound() || child_state.is_orthogonal()) {
                            return Err(ModelError::InvalidOrthogonalChild {
                                parent: state.name.clone(),
                                child: child.clone(),
                            });
                        }
                    }
                }
                StateKind::Atomic | StateKind::Final => {}
            }
        }

        Ok(Self {
            preamble,
            initial,
            preconditions,
            invariants,
            postconditions,
            states: map,
            transitions,
            parents,
        })
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.get(name)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn parent_for(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    /// Ancestors of `name`, nearest-first, not including `name` itself.
    pub fn ancestors_for(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = name.to_string();
        while let Some(parent) = self.parent_for(&current) {
            let parent = parent.to_string();
            out.push(parent.clone());
            current = parent;
        }
        out
    }

    /// Descendants of `name` in pre-order, not including `name` itself.
    pub fn descendants_for(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_descendants(name, &mut out);
        out
    }

    fn collect_descendants(&self, name: &str, out: &mut Vec<String>) {
        let Some(state) = self.states.get(name) else {
            return;
        };
        for child in state.children() {
            out.push(child.clone());
            self.collect_descendants(child, out);
        }
    }

    pub fn depth_of(&self, name: &str) -> usize {
        self.ancestors_for(name).len()
    }

    /// Least common ancestor of `a` and `b`. When `a == b`, this is `a`
    /// itself — two distinct transitions sharing a `from_state` always
    /// fail the "LCA must be orthogonal" check, which is the correct
    /// non-determinism verdict.
    pub fn least_common_ancestor(&self, a: &str, b: &str) -> Option<String> {
        let mut a_chain = vec![a.to_string()];
        a_chain.extend(self.ancestors_for(a));

        let mut b_chain = vec![b.to_string()];
        b_chain.extend(self.ancestors_for(b));

        for candidate in &b_chain {
            if a_chain.contains(candidate) {
                return Some(candidate.clone());
            }
        }
        None
    }

    /// Deepest active leaves of `configuration`: active states none of
    /// whose children are also active.
    pub fn leaf_for(&self, configuration: &[String]) -> Vec<String> {
        configuration
            .iter()
            .filter(|name| {
                self.states
                    .get(name.as_str())
                    .map(|s| !s.children().iter().any(|c| configuration.iter().any(|a| a == c)))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}
