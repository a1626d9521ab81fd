//! Statechart interpreter core.
//!
//! This crate holds the run-to-completion interpreter loop, the virtual
//! clock, the evaluator collaborator contract, and the macro/micro-step
//! types the loop produces. It never parses or evaluates expression-language
//! source itself — that is the job of whichever [`Evaluator`] the caller
//! constructs the interpreter with (see `sc-eval`).

mod clock;
mod error;
mod evaluator;
mod event;
mod interpreter;
mod step;

pub use clock::{Clock, ClockError};
pub use error::{ContractFailure, StepError};
pub use evaluator::{EvalContext, EvalError, Evaluator, Subject};
pub use event::{Event, Value};
pub use interpreter::Interpreter;
pub use step::{MacroStep, MicroStep};
