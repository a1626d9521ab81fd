//! Runtime collaborators built on top of `sc-core`'s interpreter: a
//! tester harness for Design-by-Contract-driven statechart testing, trace
//! and coverage recording, a background wall-clock driver, and `tracing`
//! subscriber setup shared by `sc-cli`.

pub mod driver;
pub mod error;
pub mod tester;
pub mod trace;
pub mod tracing_init;

pub use driver::BackgroundDriver;
pub use error::{DriverError, TesterError};
pub use tester::{StateChartTester, TesterConfig};
pub use trace::{coverage_from_trace, Coverage, Tracer, TransitionKey};
pub use tracing_init::init_tracing;
