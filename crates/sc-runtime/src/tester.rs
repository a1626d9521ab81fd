use sc_core::{Event, Interpreter, MacroStep, StepError, Value};

use crate::error::TesterError;

/// Named `Interpreter` under test, alongside the tester interpreters that
/// observe it and the scripted event scenario sent to it.
///
/// Co-executes the tested interpreter with zero or more tester
/// interpreters. On construction, every tester receives a synthetic
/// `start` event; after each successful macro-step on the tested
/// interpreter, every tester receives a `step` event carrying a reflective
/// snapshot of that step as event data (`entered`, `exited`, `active`,
/// `processed`, `consumed` — see `sc-eval`'s `DynamicEvaluator` tester
/// builtins); on [`StateChartTester::stop`], every tester receives `stop`.
/// A tester whose own contract rejects the synthetic event surfaces as
/// [`TesterError::Tester`].
pub struct StateChartTester {
    tested: Interpreter,
    testers: Vec<(String, Interpreter)>,
}

impl StateChartTester {
    /// `testers` pairs a human-readable label (used in [`TesterError`]) with
    /// an already-constructed tester `Interpreter`. `events` is the
    /// scenario sent to `tested`, queued but not yet delivered.
    pub fn new(tested: Interpreter, testers: Vec<(String, Interpreter)>, events: Vec<Event>) -> Result<Self, TesterError> {
        let mut harness = Self { tested, testers };
        let start_event = harness.reflective_event("start", None);
        harness.run_testers(start_event)?;
        for event in events {
            harness.tested.send(event);
        }
        Ok(harness)
    }

    /// Every tester's active configuration, for diagnostics.
    pub fn tester_configurations(&self) -> Vec<(String, Vec<String>)> {
        self.testers.iter().map(|(name, i)| (name.clone(), i.configuration())).collect()
    }

    pub fn tested(&self) -> &Interpreter {
        &self.tested
    }

    /// Mutable access to the tested interpreter, for callers (BDD steps)
    /// that need to move its clock as well as send events.
    pub fn tested_mut(&mut self) -> &mut Interpreter {
        &mut self.tested
    }

    /// Queue an event for the tested interpreter, for callers (BDD steps)
    /// that send events one at a time rather than as an upfront scenario.
    pub fn send(&mut self, event: Event) -> &mut Self {
        self.tested.send(event);
        self
    }

    /// Build the synthetic event sent to every tester: `name` (`start`,
    /// `step`, or `stop`) carrying the reflective snapshot as data.
    fn reflective_event(&self, name: &str, step: Option<&MacroStep>) -> Event {
        let processed = step
            .and_then(|s| s.transitions().into_iter().next())
            .and_then(|t| t.event.clone());
        let consumed = step.and_then(|s| s.event()).map(|e| e.name.clone());

        Event::new(name)
            .with_data("entered", Value::Array(step.map(|s| s.entered()).unwrap_or_default().into_iter().map(Value::Str).collect()))
            .with_data("exited", Value::Array(step.map(|s| s.exited()).unwrap_or_default().into_iter().map(Value::Str).collect()))
            .with_data("active", Value::Array(self.tested.configuration().into_iter().map(Value::Str).collect()))
            .with_data("processed", processed.map(Value::Str).unwrap_or(Value::Null))
            .with_data("consumed", consumed.map(Value::Str).unwrap_or(Value::Null))
    }

    fn run_testers(&mut self, event: Event) -> Result<(), TesterError> {
        for (name, tester) in &mut self.testers {
            tester.send(event.clone());
            tester.execute(0).map_err(|source| TesterError::Tester { tester: name.clone(), source })?;
        }
        Ok(())
    }

    /// Run one macro-step of the tested interpreter, then run every tester
    /// to react to it. Returns the tested interpreter's macro-step, or
    /// `None` once it has terminated.
    pub fn execute_once(&mut self) -> Result<Option<MacroStep>, TesterError> {
        let step = self.tested.execute_once().map_err(TesterError::Tested)?;
        if let Some(step) = &step {
            let event = self.reflective_event("step", Some(step));
            self.run_testers(event)?;
        }
        Ok(step)
    }

    /// Repeatedly call [`Self::execute_once`] until the tested interpreter
    /// has nothing left to do, or `max_steps` macro-steps have run
    /// (`max_steps <= 0` means unbounded).
    pub fn execute(&mut self, max_steps: i64) -> Result<Vec<MacroStep>, TesterError> {
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

    /// Send `stop` to every tester. Call once the scenario has finished.
    pub fn stop(&mut self) -> Result<(), TesterError> {
        let event = self.reflective_event("stop", None);
        self.run_testers(event)
    }
}

/// Accumulates tester statecharts before building a [`StateChartTester`]
/// over a scenario of events, mirroring the reference's
/// `TesterConfiguration`/`build_tester` shape: a configuration object that
/// remembers which interpreters to build, built up incrementally and then
/// materialized once.
pub struct TesterConfig {
    tested: Interpreter,
    testers: Vec<(String, Interpreter)>,
}

impl TesterConfig {
    pub fn new(tested: Interpreter) -> Self {
        Self { tested, testers: Vec::new() }
    }

    pub fn add_test(mut self, name: impl Into<String>, tester: Interpreter) -> Self {
        self.testers.push((name.into(), tester));
        self
    }

    pub fn build_tester(self, events: Vec<Event>) -> Result<StateChartTester, TesterError> {
        StateChartTester::new(self.tested, self.testers, events)
    }
}

impl From<StepError> for TesterError {
    fn from(value: StepError) -> Self {
        TesterError::Tested(value)
    }
}
