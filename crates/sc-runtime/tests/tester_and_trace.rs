use sc_core::{Event, Interpreter};
use sc_eval::{DynamicEvaluator, NoCodeEvaluator};
use sc_model::{State, StateKind, Statechart, Transition};
use sc_runtime::{StateChartTester, Tracer};

fn atomic(name: &str) -> State {
    State::new(name, StateKind::Atomic)
}

fn compound(name: &str, children: &[&str], initial: &str) -> State {
    State::new(
        name,
        StateKind::Compound { children: children.iter().map(|s| s.to_string()).collect(), initial: initial.to_string() },
    )
}

/// A light switch: `off -> on -> off` on repeated `toggle` events.
fn switch() -> Statechart {
    Statechart::build(
        None,
        "root",
        vec![compound("root", &["off", "on"], "off"), atomic("off"), atomic("on")],
        vec![Transition::new("off").to("on").on("toggle"), Transition::new("on").to("off").on("toggle")],
        vec![],
        vec![],
        vec![],
    )
    .unwrap()
}

#[test]
fn tracer_reports_coverage_across_a_toggled_switch() {
    let mut interpreter = Interpreter::new(switch(), Box::new(|| Box::new(NoCodeEvaluator)), false).unwrap();
    let mut tracer = Tracer::new();

    interpreter.send(Event::new("toggle"));
    interpreter.send(Event::new("toggle"));
    interpreter.send(Event::new("toggle"));
    tracer.execute(&mut interpreter, 0).unwrap();

    assert!(interpreter.configuration().contains(&"on".to_string()));
    let coverage = tracer.coverage();
    assert_eq!(coverage.states.get("on"), Some(&2));
    assert_eq!(coverage.states.get("off"), Some(&1));
}

/// A tester statechart that fails its contract once the switch has been
/// toggled on twice in a row without ever being seen off in between, using
/// the tester-harness builtins (`active`) exposed through the reflective
/// `step` event.
fn watches_for_double_on() -> Statechart {
    Statechart::build(
        None,
        "watch",
        vec![compound("watch", &["armed", "tripped"], "armed"), atomic("armed"), atomic("tripped")],
        vec![Transition::new("armed").to("tripped").on("step").guarded_by("active(\"on\") and processed(\"toggle\")")],
        vec![],
        vec![],
        vec![],
    )
    .unwrap()
}

#[test]
fn tester_harness_observes_every_macro_step_of_the_tested_interpreter() {
    let tested = Interpreter::new(switch(), Box::new(|| Box::new(NoCodeEvaluator)), false).unwrap();
    let tester = Interpreter::new(watches_for_double_on(), Box::new(|| Box::new(DynamicEvaluator::new())), false).unwrap();

    let mut harness =
        StateChartTester::new(tested, vec![("double-on".to_string(), tester)], vec![Event::new("toggle")]).unwrap();

    harness.execute(1).unwrap();
    assert!(harness.tested().configuration().contains(&"on".to_string()));

    let configs = harness.tester_configurations();
    assert_eq!(configs[0].1, vec!["tripped".to_string()]);

    harness.stop().unwrap();
}
