use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use sc_model::{Statechart, StateKind, Transition};

use crate::clock::Clock;
use crate::error::{ContractFailure, StepError};
use crate::event::Event;
use crate::evaluator::{EvalContext, Evaluator, Subject};
use crate::step::{MacroStep, MicroStep};

#[derive(Clone, Copy)]
enum ClauseKind {
    Pre,
    Invariant,
    Post,
}

fn clauses_for<'a>(subject: Subject<'a>, kind: &ClauseKind, statechart: &'a Statechart) -> &'a [String] {
    match (subject, kind) {
        (Subject::Statechart, ClauseKind::Pre) => &statechart.preconditions,
        (Subject::Statechart, ClauseKind::Invariant) => &statechart.invariants,
        (Subject::Statechart, ClauseKind::Post) => &statechart.postconditions,
        (Subject::State(state), ClauseKind::Pre) => &state.preconditions,
        (Subject::State(state), ClauseKind::Invariant) => &state.invariants,
        (Subject::State(state), ClauseKind::Post) => &state.postconditions,
        (Subject::Transition { transition, .. }, ClauseKind::Pre) => &transition.preconditions,
        (Subject::Transition { transition, .. }, ClauseKind::Invariant) => &transition.invariants,
        (Subject::Transition { transition, .. }, ClauseKind::Post) => &transition.postconditions,
    }
}

/// A hierarchical statechart interpreter following run-to-completion
/// macro-steps built from inner-first, non-conflicting micro-steps.
///
/// Construction runs the preamble, enters the root's `initial` state, and
/// stabilizes, exactly like every subsequent `execute_once`. `reset`
/// rebuilds a fresh evaluator from the stored factory and repeats that
/// bootstrap, so a reset interpreter is indistinguishable from a freshly
/// constructed one.
pub struct Interpreter {
    statechart: Arc<Statechart>,
    evaluator_factory: Box<dyn Fn() -> Box<dyn Evaluator>>,
    evaluator: Box<dyn Evaluator>,
    configuration: HashSet<String>,
    events: VecDeque<Event>,
    memory: HashMap<String, Vec<String>>,
    silent_contract: bool,
    failed_conditions: Vec<ContractFailure>,
    clock: Clock,
}

impl Interpreter {
    pub fn new(
        statechart: Statechart,
        evaluator_factory: Box<dyn Fn() -> Box<dyn Evaluator>>,
        silent_contract: bool,
    ) -> Result<Self, StepError> {
        let evaluator = evaluator_factory();
        let mut interpreter = Self {
            statechart: Arc::new(statechart),
            evaluator_factory,
            evaluator,
            configuration: HashSet::new(),
            events: VecDeque::new(),
            memory: HashMap::new(),
            silent_contract,
            failed_conditions: Vec::new(),
            clock: Clock::new(),
        };
        interpreter.start()?;
        Ok(interpreter)
    }

    /// Rebuild a fresh evaluator and re-run the bootstrap from scratch.
    pub fn reset(&mut self) -> Result<(), StepError> {
        self.evaluator = (self.evaluator_factory)();
        self.configuration.clear();
        self.events.clear();
        self.memory.clear();
        self.failed_conditions.clear();
        self.clock = Clock::new();
        self.start()
    }

    pub fn statechart(&self) -> &Statechart {
        &self.statechart
    }

    /// Active state names, sorted by (depth, name) for deterministic
    /// output and comparison.
    pub fn configuration(&self) -> Vec<String> {
        let mut out: Vec<String> = self.configuration.iter().cloned().collect();
        out.sort_by_key(|name| (self.statechart.depth_of(name), name.clone()));
        out
    }

    pub fn running(&self) -> bool {
        !self.configuration.is_empty()
    }

    pub fn failed_conditions(&self) -> &[ContractFailure] {
        &self.failed_conditions
    }

    /// The collaborator currently giving this statechart meaning, for
    /// callers that need to read its `context_snapshot` (testers, BDD
    /// steps) without reaching into the interpreter's internals.
    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    /// Queue an external event for the next `execute_once`/`execute` call.
    pub fn send(&mut self, event: Event) -> &mut Self {
        self.events.push_back(event);
        self
    }

    /// Run one macro-step: the first eventless transition found, else the
    /// next queued event consumed by a transition, else that event alone
    /// if nothing fires on it. Returns `None` when there is nothing left
    /// to do (no eventless transition, no queued event).
    pub fn execute_once(&mut self) -> Result<Option<MacroStep>, StepError> {
        let mut event = None;
        let mut selected = self.select_transitions(None)?;

        if selected.is_empty() {
            match self.events.pop_front() {
                Some(e) => {
                    selected = self.select_transitions(Some(&e))?;
                    event = Some(e);
                }
                None => return Ok(None),
            }
        }

        if selected.is_empty() {
            let macro_step = MacroStep {
                steps: vec![MicroStep::consumed_event(event.expect("event set when selection empty"))],
            };
            return Ok(Some(macro_step));
        }

        let selected = self.sort_transitions(selected)?;

        let mut steps = Vec::new();
        for step in self.compute_transition_steps(event.as_ref(), &selected) {
            self.execute_step(&step)?;
            steps.push(step);
            steps.extend(self.stabilize()?);
        }

        let macro_step = MacroStep { steps };

        let statechart = Arc::clone(&self.statechart);
        for name in self.configuration() {
            let state = statechart.state(&name).expect("configuration names resolve");
            self.evaluate_contract(Subject::State(state), ClauseKind::Invariant, None, Some(&macro_step))?;
        }
        self.evaluate_contract(Subject::Statechart, ClauseKind::Invariant, None, Some(&macro_step))?;

        if !self.running() {
            self.evaluate_contract(Subject::Statechart, ClauseKind::Post, None, Some(&macro_step))?;
        }

        Ok(Some(macro_step))
    }

    /// Run macro-steps until none remain or `max_steps` have executed.
    /// `max_steps <= 0` means unbounded, matching the reference's `-1`
    /// convention at the API boundary.
    pub fn execute(&mut self, max_steps: i64) -> Result<Vec<MacroStep>, StepError> {
        let mut out = Vec::new();
        loop {
            if max_steps > 0 && out.len() as i64 >= max_steps {
                break;
            }
            match self.execute_once()? {
                Some(step) => out.push(step),
                None => break,
            }
        }
        Ok(out)
    }

    fn start(&mut self) -> Result<(), StepError> {
        let preamble = self.statechart.preamble.clone();
        self.run_code(None, |evaluator, ctx, raise| evaluator.execute_preamble(preamble.as_deref(), ctx, raise))?;

        self.evaluate_contract(Subject::Statechart, ClauseKind::Pre, None, None)?;

        let initial = self.statechart.initial.clone();
        let bootstrap = MicroStep {
            event: None,
            transition: None,
            exited: Vec::new(),
            entered: vec![initial],
        };
        self.execute_step(&bootstrap)?;
        self.stabilize()?;
        Ok(())
    }

    fn select_transitions(&mut self, event: Option<&Event>) -> Result<Vec<usize>, StepError> {
        let configuration = self.configuration();
        let time = self.clock.time();
        let target_event = event.map(|e| e.name.as_str());

        let mut candidates = Vec::new();
        for (index, transition) in self.statechart.transitions().iter().enumerate() {
            if transition.event.as_deref() != target_event {
                continue;
            }
            if !self.configuration.contains(&transition.from_state) {
                continue;
            }
            let enabled = match &transition.guard {
                None => true,
                Some(_) => {
                    let ctx = EvalContext {
                        configuration: &configuration,
                        time,
                        event,
                    };
                    self.evaluator.evaluate_guard(index, transition, &ctx)?
                }
            };
            if enabled {
                candidates.push(index);
            }
        }

        let transitions = self.statechart.transitions();
        let mut shadowed = HashSet::new();
        for &i in &candidates {
            let descendants = self.statechart.descendants_for(&transitions[i].from_state);
            for &j in &candidates {
                if i == j {
                    continue;
                }
                if descendants.contains(&transitions[j].from_state) {
                    shadowed.insert(i);
                    break;
                }
            }
        }

        Ok(candidates.into_iter().filter(|i| !shadowed.contains(i)).collect())
    }

    fn sort_transitions(&self, mut selected: Vec<usize>) -> Result<Vec<usize>, StepError> {
        let transitions = self.statechart.transitions();

        if selected.len() > 1 {
            for a in 0..selected.len() {
                for b in (a + 1)..selected.len() {
                    let t1 = &transitions[selected[a]];
                    let t2 = &transitions[selected[b]];
                    let configuration = self.configuration();

                    let lca = self
                        .statechart
                        .least_common_ancestor(&t1.from_state, &t2.from_state)
                        .ok_or_else(|| StepError::NonDeterminism {
                            t1: describe(t1),
                            t2: describe(t2),
                            configuration: configuration.clone(),
                        })?;

                    let lca_is_orthogonal = self.statechart.state(&lca).map(|s| s.is_orthogonal()).unwrap_or(false);
                    if !lca_is_orthogonal {
                        return Err(StepError::NonDeterminism {
                            t1: describe(t1),
                            t2: describe(t2),
                            configuration,
                        });
                    }

                    for t in [t1, t2] {
                        let mut last_before_lca = t.from_state.clone();
                        for ancestor in self.statechart.ancestors_for(&t.from_state) {
                            if ancestor == lca {
                                break;
                            }
                            last_before_lca = ancestor;
                        }
                        let descendants = self.statechart.descendants_for(&last_before_lca);
                        // An internal transition (`to_state: None`) never matches
                        // `last_before_lca` or any of its descendants, so it always
                        // conflicts here, the same as the reference.
                        let escapes_region = match &t.to_state {
                            Some(to) => to != &last_before_lca && !descendants.contains(to),
                            None => true,
                        };
                        if escapes_region {
                            return Err(StepError::Conflict {
                                t1: describe(t1),
                                t2: describe(t2),
                                configuration,
                            });
                        }
                    }
                }
            }

            selected.sort_by(|&i, &j| {
                let from_i = &transitions[i].from_state;
                let from_j = &transitions[j].from_state;
                let depth_i = self.statechart.depth_of(from_i);
                let depth_j = self.statechart.depth_of(from_j);
                depth_j.cmp(&depth_i).then_with(|| from_i.cmp(from_j))
            });
        }

        Ok(selected)
    }

    fn compute_transition_steps(&self, event: Option<&Event>, selected: &[usize]) -> Vec<MicroStep> {
        let transitions = self.statechart.transitions();
        selected
            .iter()
            .map(|&index| {
                let transition = transitions[index].clone();
                let Some(to) = transition.to_state.clone() else {
                    return MicroStep {
                        event: event.cloned(),
                        transition: Some(transition),
                        exited: Vec::new(),
                        entered: Vec::new(),
                    };
                };

                let lca = self
                    .statechart
                    .least_common_ancestor(&transition.from_state, &to)
                    .unwrap_or_else(|| transition.from_state.clone());

                let mut last_before_lca = transition.from_state.clone();
                for ancestor in self.statechart.ancestors_for(&transition.from_state) {
                    if ancestor == lca {
                        break;
                    }
                    last_before_lca = ancestor;
                }

                let mut exited: Vec<String> = self.statechart.descendants_for(&last_before_lca);
                exited.retain(|s| self.configuration.contains(s));
                exited.reverse();
                if self.configuration.contains(&last_before_lca) {
                    exited.push(last_before_lca);
                }

                let mut entered = vec![to.clone()];
                for ancestor in self.statechart.ancestors_for(&to) {
                    if ancestor == lca {
                        break;
                    }
                    entered.insert(0, ancestor);
                }

                MicroStep {
                    event: event.cloned(),
                    transition: Some(transition),
                    exited,
                    entered,
                }
            })
            .collect()
    }

    fn execute_step(&mut self, step: &MicroStep) -> Result<(), StepError> {
        let statechart = Arc::clone(&self.statechart);

        for name in &step.exited {
            let state = statechart.state(name).expect("exited state resolves");
            self.run_code(step.event.as_ref(), |evaluator, ctx, raise| evaluator.execute_onexit(state, ctx, raise))?;
            self.evaluate_contract(Subject::State(state), ClauseKind::Post, step.event.as_ref(), None)?;
        }

        for name in &step.exited {
            let Some(state) = statechart.state(name) else { continue };
            if !state.is_compound() {
                continue;
            }
            for child in state.children() {
                let Some(child_state) = statechart.state(child) else { continue };
                let Some(history) = child_state.history() else { continue };
                let entry = if history.deep {
                    let mut deepest: Vec<String> = statechart
                        .descendants_for(name)
                        .into_iter()
                        .filter(|s| self.configuration.contains(s))
                        .collect();
                    if deepest.is_empty() {
                        deepest.push(history.initial.clone());
                    }
                    deepest
                } else {
                    state
                        .children()
                        .iter()
                        .find(|c| self.configuration.contains(*c))
                        .cloned()
                        .map(|c| vec![c])
                        .unwrap_or_else(|| vec![history.initial.clone()])
                };
                self.memory.insert(child.clone(), entry);
            }
        }

        for name in &step.exited {
            self.configuration.remove(name);
        }

        if let Some(transition) = &step.transition
            && transition.action.is_some()
        {
            let index = statechart.transitions().iter().position(|t| t == transition).unwrap_or(0);

            self.evaluate_contract(
                Subject::Transition { index, transition },
                ClauseKind::Pre,
                step.event.as_ref(),
                None,
            )?;
            self.evaluate_contract(
                Subject::Transition { index, transition },
                ClauseKind::Invariant,
                step.event.as_ref(),
                None,
            )?;

            self.run_code(step.event.as_ref(), |evaluator, ctx, raise| {
                evaluator.execute_action(index, transition, ctx, raise)
            })?;

            self.evaluate_contract(
                Subject::Transition { index, transition },
                ClauseKind::Post,
                step.event.as_ref(),
                None,
            )?;
            self.evaluate_contract(
                Subject::Transition { index, transition },
                ClauseKind::Invariant,
                step.event.as_ref(),
                None,
            )?;
        }

        for name in &step.entered {
            let state = statechart.state(name).expect("entered state resolves");
            self.evaluate_contract(Subject::State(state), ClauseKind::Pre, step.event.as_ref(), None)?;
            self.run_code(step.event.as_ref(), |evaluator, ctx, raise| evaluator.execute_onentry(state, ctx, raise))?;
        }

        for name in &step.entered {
            self.configuration.insert(name.clone());
        }

        Ok(())
    }

    fn stabilize(&mut self) -> Result<Vec<MicroStep>, StepError> {
        let mut out = Vec::new();
        while let Some(step) = self.compute_stabilization_step() {
            self.execute_step(&step)?;
            out.push(step);
        }
        Ok(out)
    }

    fn compute_stabilization_step(&self) -> Option<MicroStep> {
        let configuration = self.configuration();
        let leaves = self.statechart.leaf_for(&configuration);

        if !leaves.is_empty()
            && leaves
                .iter()
                .all(|name| self.statechart.state(name).map(|s| s.is_final()).unwrap_or(false))
        {
            let mut exited = configuration;
            exited.sort_by(|a, b| {
                let depth_a = self.statechart.depth_of(a);
                let depth_b = self.statechart.depth_of(b);
                depth_b.cmp(&depth_a).then_with(|| a.cmp(b))
            });
            return Some(MicroStep {
                event: None,
                transition: None,
                exited,
                entered: Vec::new(),
            });
        }

        for name in &leaves {
            let state = self.statechart.state(name)?;
            match &state.kind {
                StateKind::History(history) => {
                    let mut entered = self.memory.get(name).cloned().unwrap_or_else(|| vec![history.initial.clone()]);
                    entered.sort_by_key(|s| (self.statechart.depth_of(s), s.clone()));
                    return Some(MicroStep {
                        event: None,
                        transition: None,
                        exited: vec![name.clone()],
                        entered,
                    });
                }
                StateKind::Orthogonal { children } => {
                    let mut entered = children.clone();
                    entered.sort();
                    return Some(MicroStep {
                        event: None,
                        transition: None,
                        exited: Vec::new(),
                        entered,
                    });
                }
                StateKind::Compound { initial, .. } => {
                    return Some(MicroStep {
                        event: None,
                        transition: None,
                        exited: Vec::new(),
                        entered: vec![initial.clone()],
                    });
                }
                StateKind::Atomic | StateKind::Final => continue,
            }
        }

        None
    }

    fn evaluate_contract(
        &mut self,
        subject: Subject<'_>,
        kind: ClauseKind,
        event: Option<&Event>,
        step: Option<&MacroStep>,
    ) -> Result<(), StepError> {
        let clauses = clauses_for(subject, &kind, &self.statechart).to_vec();
        if clauses.is_empty() {
            return Ok(());
        }

        let configuration = self.configuration();
        let time = self.clock.time();
        let ctx = EvalContext {
            configuration: &configuration,
            time,
            event,
        };

        let unsatisfied = match kind {
            ClauseKind::Pre => self.evaluator.evaluate_preconditions(subject, &clauses, &ctx)?,
            ClauseKind::Invariant => self.evaluator.evaluate_invariants(subject, &clauses, &ctx)?,
            ClauseKind::Post => self.evaluator.evaluate_postconditions(subject, &clauses, &ctx)?,
        };

        for clause in unsatisfied {
            let failure = ContractFailure {
                subject: subject.to_string(),
                clause,
                configuration: configuration.clone(),
                context: self.evaluator.context_snapshot(),
                step: step.cloned(),
            };
            if self.silent_contract {
                self.failed_conditions.push(failure);
            } else {
                return Err(match kind {
                    ClauseKind::Pre => StepError::PreconditionFailed(failure),
                    ClauseKind::Invariant => StepError::InvariantFailed(failure),
                    ClauseKind::Post => StepError::PostconditionFailed(failure),
                });
            }
        }

        Ok(())
    }

    /// Run an evaluator call, draining whatever internal events it raised
    /// into the front of the event queue in the order they were raised.
    fn run_code<F>(&mut self, event: Option<&Event>, call: F) -> Result<(), StepError>
    where
        F: FnOnce(&mut dyn Evaluator, &EvalContext<'_>, &mut dyn FnMut(Event)) -> Result<(), crate::evaluator::EvalError>,
    {
        let configuration = self.configuration();
        let time = self.clock.time();
        let ctx = EvalContext {
            configuration: &configuration,
            time,
            event,
        };

        let mut raised = Vec::new();
        {
            let mut raise = |event: Event| raised.push(event);
            call(self.evaluator.as_mut(), &ctx, &mut raise)?;
        }
        for event in raised {
            self.events.push_front(event);
        }
        Ok(())
    }
}

fn describe(transition: &Transition) -> String {
    match &transition.to_state {
        Some(to) => format!("{} -> {}", transition.from_state, to),
        None => format!("{} (internal)", transition.from_state),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sc_model::{History, State};

    use super::*;

    /// An evaluator for structural tests: guards are disabled by the
    /// literal string `"false"`, actions of the form `raise:<name>` raise
    /// an internal event, and the clause `"fail"` is always unsatisfied.
    /// Everything else is a no-op, so tests only exercise the interpreter's
    /// own selection/stabilization/contract machinery.
    struct LiteralEvaluator;

    impl Evaluator for LiteralEvaluator {
        fn execute_preamble(&mut self, _: Option<&str>, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), crate::evaluator::EvalError> {
            Ok(())
        }

        fn execute_onentry(&mut self, _: &sc_model::State, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), crate::evaluator::EvalError> {
            Ok(())
        }

        fn execute_onexit(&mut self, _: &sc_model::State, _: &EvalContext<'_>, _: &mut dyn FnMut(Event)) -> Result<(), crate::evaluator::EvalError> {
            Ok(())
        }

        fn execute_action(
            &mut self,
            _index: usize,
            transition: &Transition,
            _ctx: &EvalContext<'_>,
            raise: &mut dyn FnMut(Event),
        ) -> Result<(), crate::evaluator::EvalError> {
            if let Some(action) = &transition.action {
                for part in action.split(';') {
                    if let Some(name) = part.trim().strip_prefix("raise:") {
                        raise(Event::new(name.to_string()));
                    }
                }
            }
            Ok(())
        }

        fn evaluate_guard(&mut self, _index: usize, transition: &Transition, _ctx: &EvalContext<'_>) -> Result<bool, crate::evaluator::EvalError> {
            Ok(transition.guard.as_deref() != Some("false"))
        }

        fn evaluate_preconditions(
            &mut self,
            _subject: Subject<'_>,
            clauses: &[String],
            _ctx: &EvalContext<'_>,
        ) -> Result<Vec<String>, crate::evaluator::EvalError> {
            Ok(clauses.iter().filter(|c| c.as_str() == "fail").cloned().collect())
        }

        fn evaluate_invariants(
            &mut self,
            subject: Subject<'_>,
            clauses: &[String],
            ctx: &EvalContext<'_>,
        ) -> Result<Vec<String>, crate::evaluator::EvalError> {
            self.evaluate_preconditions(subject, clauses, ctx)
        }

        fn evaluate_postconditions(
            &mut self,
            subject: Subject<'_>,
            clauses: &[String],
            ctx: &EvalContext<'_>,
        ) -> Result<Vec<String>, crate::evaluator::EvalError> {
            self.evaluate_preconditions(subject, clauses, ctx)
        }

        fn context_snapshot(&self) -> BTreeMap<String, String> {
            BTreeMap::new()
        }
    }

    fn literal_factory() -> Box<dyn Fn() -> Box<dyn Evaluator>> {
        Box::new(|| Box::new(LiteralEvaluator) as Box<dyn Evaluator>)
    }

    fn atomic(name: &str) -> State {
        State::new(name, sc_model::StateKind::Atomic)
    }

    fn compound(name: &str, children: &[&str], initial: &str) -> State {
        State::new(
            name,
            sc_model::StateKind::Compound {
                children: children.iter().map(|s| s.to_string()).collect(),
                initial: initial.to_string(),
            },
        )
    }

    fn orthogonal(name: &str, children: &[&str]) -> State {
        State::new(
            name,
            sc_model::StateKind::Orthogonal {
                children: children.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    fn interpreter(statechart: Statechart) -> Interpreter {
        Interpreter::new(statechart, literal_factory(), false).unwrap()
    }

    #[test]
    fn construction_enters_the_root_and_its_initial_child() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), atomic("s2")],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let interp = interpreter(sc);
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s1".to_string()]);
    }

    #[test]
    fn event_driven_transition_moves_the_active_state() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), atomic("s2")],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        let step = interp.execute_once().unwrap().unwrap();
        assert_eq!(step.entered(), vec!["s2".to_string()]);
        assert_eq!(step.exited(), vec!["s1".to_string()]);
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);
    }

    #[test]
    fn eventless_transition_fires_ahead_of_the_event_queue() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), atomic("s2")],
            vec![Transition::new("s1").to("s2")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);
    }

    #[test]
    fn false_guard_blocks_the_transition() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), atomic("s2")],
            vec![Transition::new("s1").to("s2").on("e").guarded_by("false")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        let step = interp.execute_once().unwrap().unwrap();
        assert!(step.entered().is_empty());
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s1".to_string()]);
    }

    #[test]
    fn orthogonal_regions_enter_their_initials_together() {
        let sc = Statechart::build(
            None,
            "root",
            vec![
                orthogonal("root", &["a", "b"]),
                compound("a", &["a1", "a2"], "a1"),
                atomic("a1"),
                atomic("a2"),
                compound("b", &["b1", "b2"], "b1"),
                atomic("b1"),
                atomic("b2"),
            ],
            vec![Transition::new("a1").to("a2").on("e1"), Transition::new("b1").to("b2").on("e2")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        assert_eq!(
            interp.configuration(),
            vec!["root".to_string(), "a".to_string(), "b".to_string(), "a1".to_string(), "b1".to_string()]
        );
        interp.send(Event::new("e1"));
        interp.execute_once().unwrap();
        assert!(interp.configuration().contains(&"a2".to_string()));
        assert!(interp.configuration().contains(&"b1".to_string()));
    }

    #[test]
    fn all_regions_reaching_final_terminates_the_interpreter() {
        let sc = Statechart::build(
            None,
            "root",
            vec![
                compound("root", &["s1", "s2"], "s1"),
                atomic("s1"),
                State::new("s2", sc_model::StateKind::Final),
            ],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        interp.execute_once().unwrap();
        assert!(!interp.running());
        assert!(interp.configuration().is_empty());
    }

    #[test]
    fn statechart_postcondition_is_checked_once_the_interpreter_empties() {
        let sc = Statechart::build(
            None,
            "root",
            vec![
                compound("root", &["s1", "s2"], "s1"),
                atomic("s1"),
                State::new("s2", sc_model::StateKind::Final),
            ],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec!["fail".to_string()],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        let err = interp.execute_once().unwrap_err();
        assert!(matches!(err, StepError::PostconditionFailed(_)));
    }

    #[test]
    fn precondition_violation_is_strict_by_default() {
        let s2 = atomic("s2").with_precondition("fail");
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), s2],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = Interpreter::new(sc, literal_factory(), false).unwrap();
        interp.send(Event::new("e"));
        let err = interp.execute_once().unwrap_err();
        assert!(matches!(err, StepError::PreconditionFailed(_)));
    }

    #[test]
    fn precondition_violation_is_recorded_when_contracts_are_silent() {
        let s2 = atomic("s2").with_precondition("fail");
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), s2],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = Interpreter::new(sc, literal_factory(), true).unwrap();
        interp.send(Event::new("e"));
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);
        assert_eq!(interp.failed_conditions().len(), 1);
        assert_eq!(interp.failed_conditions()[0].clause, "fail");
    }

    #[test]
    fn two_always_enabled_transitions_from_the_same_state_are_non_deterministic() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2", "s3"], "s1"), atomic("s1"), atomic("s2"), atomic("s3")],
            vec![Transition::new("s1").to("s2").on("e"), Transition::new("s1").to("s3").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        let err = interp.execute_once().unwrap_err();
        assert!(matches!(err, StepError::NonDeterminism { .. }));
    }

    #[test]
    fn deep_history_restores_the_last_active_child() {
        let a_history = State::new(
            "ah",
            sc_model::StateKind::History(History {
                deep: true,
                initial: "a1".to_string(),
            }),
        );
        let sc = Statechart::build(
            None,
            "root",
            vec![
                compound("root", &["a", "other"], "a"),
                compound("a", &["a1", "a2", "ah"], "a1"),
                atomic("a1"),
                atomic("a2"),
                a_history,
                atomic("other"),
            ],
            vec![
                Transition::new("a1").to("a2").on("advance"),
                Transition::new("a").to("other").on("leave"),
                Transition::new("other").to("ah").on("resume"),
            ],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);

        interp.send(Event::new("advance"));
        interp.execute_once().unwrap();
        assert!(interp.configuration().contains(&"a2".to_string()));

        interp.send(Event::new("leave"));
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "other".to_string()]);

        interp.send(Event::new("resume"));
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "a".to_string(), "a2".to_string()]);
    }

    #[test]
    fn internal_action_raises_an_event_processed_next() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2", "s3"], "s1"), atomic("s1"), atomic("s2"), atomic("s3")],
            vec![
                Transition::new("s1").to("s2").on("e").with_action("raise:f"),
                Transition::new("s2").to("s3").on("f"),
            ],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s3".to_string()]);
    }

    #[test]
    fn reset_rebuilds_the_initial_configuration() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2"], "s1"), atomic("s1"), atomic("s2")],
            vec![Transition::new("s1").to("s2").on("e")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        interp.execute_once().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);
        interp.reset().unwrap();
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s1".to_string()]);
    }

    #[test]
    fn execute_drains_queued_events_up_to_max_steps() {
        let sc = Statechart::build(
            None,
            "root",
            vec![compound("root", &["s1", "s2", "s3"], "s1"), atomic("s1"), atomic("s2"), atomic("s3")],
            vec![Transition::new("s1").to("s2").on("e"), Transition::new("s2").to("s3").on("f")],
            vec![],
            vec![],
            vec![],
        )
        .unwrap();
        let mut interp = interpreter(sc);
        interp.send(Event::new("e"));
        interp.send(Event::new("f"));
        let steps = interp.execute(1).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s2".to_string()]);

        let steps = interp.execute(0).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(interp.configuration(), vec!["root".to_string(), "s3".to_string()]);
    }
}
