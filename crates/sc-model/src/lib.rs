//! Pure data model for hierarchical statecharts.
//!
//! Everything in this crate is immutable after construction and has no
//! runtime behavior: no expression evaluation, no stepping, no I/O. The
//! interpreter (`sc-core`) is the only consumer that gives this data
//! meaning; this crate only answers structural questions about it
//! (ancestors, descendants, least common ancestor, ...).

mod error;
mod state;
mod statechart;
mod transition;

pub use error::ModelError;
pub use state::{History, State, StateKind};
pub use statechart::Statechart;
pub use transition::Transition;
