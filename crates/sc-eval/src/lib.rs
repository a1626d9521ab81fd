//! Evaluator collaborators for `sc-core`.
//!
//! [`NoCodeEvaluator`] treats every guard and contract clause as trivially
//! true and every action as a no-op, for structural-only testing.
//! [`DynamicEvaluator`] parses and runs a small expression/statement
//! language against a flat variable context, close enough to
//! `sismic.evaluator.PythonEvaluator`'s surface (`active()`, `after()`,
//! `idle()`, `event.*`, `__old__.*`) to drive real statecharts.

mod ast;
mod dynamic;
mod no_code;
mod parser;

pub use ast::{BinOp, Expr, FieldRef, Stmt};
pub use dynamic::DynamicEvaluator;
pub use no_code::NoCodeEvaluator;
pub use parser::{parse_expr, parse_statements};
