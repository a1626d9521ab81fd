use std::collections::{BTreeMap, HashMap};

use sc_core::{EvalContext, EvalError, Evaluator, Event, Subject, Value};
use sc_model::{State, Transition};

use crate::ast::{BinOp, Expr, FieldRef, Stmt};
use crate::parser::{parse_expr, parse_statements};

/// The small dynamic expression/statement language evaluator.
///
/// Variables live in a flat context shared by every state and transition;
/// there is no scoping, matching the flat `context` dictionary
/// `sismic.evaluator.PythonEvaluator` hands to user code. `__old__.x`
/// resolves against a snapshot taken at the start of each call into this
/// evaluator (preamble, `on_entry`, `on_exit`, action), which is simpler
/// than tracking one frozen snapshot per macro step but is precise enough
/// for the common "did this change since last time" guard idiom.
///
/// `idle(seconds)` is implemented as a plain alias for `after(seconds)`
/// rather than sismic's separate "no transition fired" tracking.
#[derive(Debug, Default)]
pub struct DynamicEvaluator {
    context: BTreeMap<String, Value>,
    entry_time: HashMap<String, f64>,
    old: BTreeMap<String, Value>,
}

impl DynamicEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: BTreeMap<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    fn snapshot_old(&mut self) {
        self.old = self.context.clone();
    }

    fn run(
        &mut self,
        code: &str,
        ctx: &EvalContext<'_>,
        subject: Option<&str>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        let stmts = parse_statements(code)?;
        for stmt in &stmts {
            self.exec_stmt(stmt, ctx, subject, raise)?;
        }
        Ok(())
    }

    fn exec_stmt(
        &mut self,
        stmt: &Stmt,
        ctx: &EvalContext<'_>,
        subject: Option<&str>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        match stmt {
            Stmt::Assign(name, expr) => {
                let value = self.eval_expr(expr, ctx, subject)?;
                self.context.insert(name.clone(), value);
            }
            Stmt::Send { event, data } => {
                let mut fields = BTreeMap::new();
                for (key, expr) in data {
                    fields.insert(key.clone(), self.eval_expr(expr, ctx, subject)?);
                }
                raise(Event { name: event.clone(), data: fields });
            }
        }
        Ok(())
    }

    fn eval_expr(&self, expr: &Expr, ctx: &EvalContext<'_>, subject: Option<&str>) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::StringLit(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Field(field_ref) => self.resolve_field(field_ref, ctx),
            Expr::Neg(inner) => Ok(Value::Number(-as_number(&self.eval_expr(inner, ctx, subject)?)?)),
            Expr::Not(inner) => Ok(Value::Bool(!as_bool(&self.eval_expr(inner, ctx, subject)?)?)),
            Expr::BinOp { op, left, right } => self.eval_binop(*op, left, right, ctx, subject),
            Expr::FuncCall { name, args } => self.eval_func(name, args, ctx, subject),
        }
    }

    fn resolve_field(&self, field_ref: &FieldRef, ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
        match field_ref {
            FieldRef::Simple(name) => self
                .context
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError(format!("undefined variable '{name}'"))),
            FieldRef::Qualified(ns, key) => match ns.as_str() {
                "event" => {
                    let event = ctx
                        .event
                        .ok_or_else(|| EvalError("'event' referenced outside of an event context".to_string()))?;
                    event
                        .data
                        .get(key)
                        .cloned()
                        .ok_or_else(|| EvalError(format!("event '{}' carries no field '{key}'", event.name)))
                }
                "__old__" => self
                    .old
                    .get(key)
                    .cloned()
                    .ok_or_else(|| EvalError(format!("no prior value recorded for '__old__.{key}'"))),
                other => Err(EvalError(format!("unknown namespace '{other}' in field reference"))),
            },
        }
    }

    fn eval_binop(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ctx: &EvalContext<'_>,
        subject: Option<&str>,
    ) -> Result<Value, EvalError> {
        use BinOp::*;

        if matches!(op, Or | And) {
            let lhs = as_bool(&self.eval_expr(left, ctx, subject)?)?;
            if op == Or && lhs {
                return Ok(Value::Bool(true));
            }
            if op == And && !lhs {
                return Ok(Value::Bool(false));
            }
            let rhs = as_bool(&self.eval_expr(right, ctx, subject)?)?;
            return Ok(Value::Bool(rhs));
        }

        let lhs = self.eval_expr(left, ctx, subject)?;
        let rhs = self.eval_expr(right, ctx, subject)?;
        match op {
            Eq => Ok(Value::Bool(lhs == rhs)),
            Ne => Ok(Value::Bool(lhs != rhs)),
            Lt => Ok(Value::Bool(compare(&lhs, &rhs)? == std::cmp::Ordering::Less)),
            Le => Ok(Value::Bool(compare(&lhs, &rhs)? != std::cmp::Ordering::Greater)),
            Gt => Ok(Value::Bool(compare(&lhs, &rhs)? == std::cmp::Ordering::Greater)),
            Ge => Ok(Value::Bool(compare(&lhs, &rhs)? != std::cmp::Ordering::Less)),
            Add => match (&lhs, &rhs) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
                _ => Ok(Value::Number(as_number(&lhs)? + as_number(&rhs)?)),
            },
            Sub => Ok(Value::Number(as_number(&lhs)? - as_number(&rhs)?)),
            Mul => Ok(Value::Number(as_number(&lhs)? * as_number(&rhs)?)),
            Div => {
                let divisor = as_number(&rhs)?;
                if divisor == 0.0 {
                    return Err(EvalError("division by zero".to_string()));
                }
                Ok(Value::Number(as_number(&lhs)? / divisor))
            }
            Mod => {
                let divisor = as_number(&rhs)?;
                if divisor == 0.0 {
                    return Err(EvalError("modulo by zero".to_string()));
                }
                Ok(Value::Number(as_number(&lhs)? % divisor))
            }
            Or | And => unreachable!("handled above"),
        }
    }

    fn eval_func(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &EvalContext<'_>,
        subject: Option<&str>,
    ) -> Result<Value, EvalError> {
        match name {
            // Prefers the "active" array on the current event when present
            // (the tester harness's reflective `step` event), falling back
            // to the evaluator's own configuration otherwise.
            "active" => {
                let arg = require_one_arg(args, name)?;
                let state_name = as_string(&self.eval_expr(arg, ctx, subject)?)?;
                if event_data_array(ctx, "active").is_some() {
                    Ok(Value::Bool(event_array_contains(ctx, "active", &state_name)))
                } else {
                    Ok(Value::Bool(ctx.is_active(&state_name)))
                }
            }
            "after" | "idle" => {
                let arg = require_one_arg(args, name)?;
                let seconds = as_number(&self.eval_expr(arg, ctx, subject)?)?;
                let state_name = subject
                    .ok_or_else(|| EvalError(format!("'{name}()' has no enclosing state to measure time against")))?;
                let entered_at = self.entry_time.get(state_name).copied().unwrap_or(ctx.time);
                Ok(Value::Bool(ctx.time - entered_at >= seconds))
            }
            // Tester-harness predicates: true when `name` appears in the
            // `entered`/`exited` lists, or equals the `processed`/`consumed`
            // event name, carried as data on the reflective `step` event.
            "entered" | "exited" => {
                let arg = require_one_arg(args, name)?;
                let state_name = as_string(&self.eval_expr(arg, ctx, subject)?)?;
                Ok(Value::Bool(event_array_contains(ctx, name, &state_name)))
            }
            "processed" | "consumed" => {
                let arg = require_one_arg(args, name)?;
                let event_name = as_string(&self.eval_expr(arg, ctx, subject)?)?;
                let field = if name == "processed" { "processed" } else { "consumed" };
                let matches = ctx
                    .event
                    .and_then(|e| e.data.get(field))
                    .map(|v| v == &Value::Str(event_name))
                    .unwrap_or(false);
                Ok(Value::Bool(matches))
            }
            other => Err(EvalError(format!("unknown function '{other}'"))),
        }
    }
}

fn event_data_array<'a>(ctx: &'a EvalContext<'_>, key: &str) -> Option<&'a [Value]> {
    match ctx.event.and_then(|e| e.data.get(key)) {
        Some(Value::Array(items)) => Some(items.as_slice()),
        _ => None,
    }
}

fn event_array_contains(ctx: &EvalContext<'_>, key: &str, name: &str) -> bool {
    event_data_array(ctx, key)
        .map(|items| items.iter().any(|v| v == &Value::Str(name.to_string())))
        .unwrap_or(false)
}

fn require_one_arg<'a>(args: &'a [Expr], name: &str) -> Result<&'a Expr, EvalError> {
    match args {
        [arg] => Ok(arg),
        other => Err(EvalError(format!("'{name}()' expects exactly one argument, got {}", other.len()))),
    }
}

fn as_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError(format!("expected a number, got {other:?}"))),
    }
}

fn as_bool(value: &Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(EvalError(format!("expected a boolean, got {other:?}"))),
    }
}

fn as_string(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(EvalError(format!("expected a string, got {other:?}"))),
    }
}

fn compare(left: &Value, right: &Value) -> Result<std::cmp::Ordering, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => {
            a.partial_cmp(b).ok_or_else(|| EvalError("cannot order NaN".to_string()))
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(EvalError(format!("cannot compare {left:?} with {right:?}"))),
    }
}

fn clauses_to_code<'a>(clauses: &'a [String]) -> impl Iterator<Item = &'a str> {
    clauses.iter().map(String::as_str)
}

fn subject_state_name<'a>(subject: &Subject<'a>) -> Option<&'a str> {
    match subject {
        Subject::Statechart => None,
        Subject::State(state) => Some(state.name.as_str()),
        Subject::Transition { transition, .. } => Some(transition.from_state.as_str()),
    }
}

impl Evaluator for DynamicEvaluator {
    fn execute_preamble(
        &mut self,
        preamble: Option<&str>,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        self.snapshot_old();
        match preamble {
            Some(code) => self.run(code, ctx, None, raise),
            None => Ok(()),
        }
    }

    fn execute_onentry(
        &mut self,
        state: &State,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        self.entry_time.insert(state.name.clone(), ctx.time);
        self.snapshot_old();
        match &state.on_entry {
            Some(code) => self.run(code, ctx, Some(&state.name), raise),
            None => Ok(()),
        }
    }

    fn execute_onexit(
        &mut self,
        state: &State,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        self.snapshot_old();
        match &state.on_exit {
            Some(code) => self.run(code, ctx, Some(&state.name), raise),
            None => Ok(()),
        }
    }

    fn execute_action(
        &mut self,
        _transition_index: usize,
        transition: &Transition,
        ctx: &EvalContext<'_>,
        raise: &mut dyn FnMut(Event),
    ) -> Result<(), EvalError> {
        self.snapshot_old();
        match &transition.action {
            Some(code) => self.run(code, ctx, Some(&transition.from_state), raise),
            None => Ok(()),
        }
    }

    fn evaluate_guard(
        &mut self,
        _transition_index: usize,
        transition: &Transition,
        ctx: &EvalContext<'_>,
    ) -> Result<bool, EvalError> {
        match &transition.guard {
            Some(code) => {
                let expr = parse_expr(code)?;
                as_bool(&self.eval_expr(&expr, ctx, Some(&transition.from_state))?)
            }
            None => Ok(true),
        }
    }

    fn evaluate_preconditions(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        self.evaluate_clauses(subject, clauses, ctx)
    }

    fn evaluate_invariants(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        self.evaluate_clauses(subject, clauses, ctx)
    }

    fn evaluate_postconditions(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        self.evaluate_clauses(subject, clauses, ctx)
    }

    fn context_snapshot(&self) -> BTreeMap<String, String> {
        self.context.iter().map(|(k, v)| (k.clone(), format!("{v:?}"))).collect()
    }
}

impl DynamicEvaluator {
    fn evaluate_clauses(
        &mut self,
        subject: Subject<'_>,
        clauses: &[String],
        ctx: &EvalContext<'_>,
    ) -> Result<Vec<String>, EvalError> {
        let subject_name = subject_state_name(&subject);
        let mut failed = Vec::new();
        for clause in clauses_to_code(clauses) {
            let expr = parse_expr(clause)?;
            if !as_bool(&self.eval_expr(&expr, ctx, subject_name)?)? {
                failed.push(clause.to_string());
            }
        }
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_model::StateKind;

    fn ctx<'a>(configuration: &'a [String], time: f64, event: Option<&'a Event>) -> EvalContext<'a> {
        EvalContext { configuration, time, event }
    }

    #[test]
    fn assigns_variables_and_reads_them_back() {
        let mut eval = DynamicEvaluator::new();
        let state = State::new("s", StateKind::Atomic).with_on_entry("x = 1; y = x + 2");
        let mut raised = Vec::new();
        eval.execute_onentry(&state, &ctx(&[], 0.0, None), &mut |e| raised.push(e)).unwrap();
        assert_eq!(eval.context().get("y"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn guard_reads_event_data() {
        let mut eval = DynamicEvaluator::new();
        let transition = Transition::new("a").to("b").on("go").guarded_by("event.n > 10");
        let event = Event::new("go").with_data("n", Value::Number(20.0));
        let c = ctx(&[], 0.0, Some(&event));
        assert!(eval.evaluate_guard(0, &transition, &c).unwrap());
    }

    #[test]
    fn after_measures_time_since_entry() {
        let mut eval = DynamicEvaluator::new();
        let state = State::new("s", StateKind::Atomic);
        let mut raised = Vec::new();
        eval.execute_onentry(&state, &ctx(&[], 5.0, None), &mut |e| raised.push(e)).unwrap();
        let transition = Transition::new("s").to("t").guarded_by("after(2)");
        assert!(!eval.evaluate_guard(0, &transition, &ctx(&[], 6.0, None)).unwrap());
        assert!(eval.evaluate_guard(0, &transition, &ctx(&[], 8.0, None)).unwrap());
    }

    #[test]
    fn old_snapshot_captures_value_before_current_call() {
        let mut eval = DynamicEvaluator::new().with_context(BTreeMap::from([("x".to_string(), Value::Number(1.0))]));
        let state = State::new("s", StateKind::Atomic).with_on_entry("x = 2; changed = x != __old__.x");
        let mut raised = Vec::new();
        eval.execute_onentry(&state, &ctx(&[], 0.0, None), &mut |e| raised.push(e)).unwrap();
        assert_eq!(eval.context().get("changed"), Some(&Value::Bool(true)));
    }

    #[test]
    fn send_statement_raises_event_with_evaluated_data() {
        let mut eval = DynamicEvaluator::new().with_context(BTreeMap::from([("n".to_string(), Value::Number(4.0))]));
        let state = State::new("s", StateKind::Atomic).with_on_entry("send(\"tick\", count=n)");
        let mut raised = Vec::new();
        eval.execute_onentry(&state, &ctx(&[], 0.0, None), &mut |e| raised.push(e)).unwrap();
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].name, "tick");
        assert_eq!(raised[0].data.get("count"), Some(&Value::Number(4.0)));
    }

    #[test]
    fn invariant_clause_failure_is_reported_by_text() {
        let mut eval = DynamicEvaluator::new().with_context(BTreeMap::from([("x".to_string(), Value::Number(-1.0))]));
        let state = State::new("s", StateKind::Atomic);
        let failed = eval
            .evaluate_invariants(Subject::State(&state), &["x >= 0".to_string()], &ctx(&[], 0.0, None))
            .unwrap();
        assert_eq!(failed, vec!["x >= 0".to_string()]);
    }

    #[test]
    fn active_builtin_checks_configuration() {
        let mut eval = DynamicEvaluator::new();
        let transition = Transition::new("a").to("b").guarded_by("active(\"a\")");
        let configuration = vec!["a".to_string()];
        assert!(eval.evaluate_guard(0, &transition, &ctx(&configuration, 0.0, None)).unwrap());
    }

    #[test]
    fn tester_builtins_read_the_reflective_step_event() {
        let mut eval = DynamicEvaluator::new();
        let step_event = Event::new("step")
            .with_data("entered", Value::Array(vec![Value::Str("target".to_string())]))
            .with_data("exited", Value::Array(vec![Value::Str("idle".to_string())]))
            .with_data("active", Value::Array(vec![Value::Str("target".to_string())]))
            .with_data("processed", Value::Str("go".to_string()))
            .with_data("consumed", Value::Str("go".to_string()));
        let state = State::new("pass", StateKind::Atomic)
            .with_precondition("entered(\"target\") && processed(\"go\") && consumed(\"go\") && active(\"target\")")
            .with_precondition("not exited(\"target\")");
        let failed = eval
            .evaluate_preconditions(Subject::State(&state), &state.preconditions, &ctx(&[], 0.0, Some(&step_event)))
            .unwrap();
        assert!(failed.is_empty());
    }
}
