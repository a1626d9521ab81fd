//! Library surface of the `sc` CLI: modules the binary uses internally and
//! that a host BDD runner (a `cucumber` step module, say) can depend on
//! directly — `bdd::StepRegistry` in particular is meant to be consumed
//! from outside this crate, not just from `main.rs`.

pub mod bdd;
pub mod config;
pub mod event_parser;
pub mod fixture;
