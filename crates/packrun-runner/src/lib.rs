//! Plugin execution for packrun.
//!
//! Runs every registered plugin against every package (and target, for
//! target-dependent plugins), records one report case per unit and turns
//! the outcome into a process exit status.

pub mod driver;
pub mod error;
pub mod orchestrator;

pub use driver::{Driver, RunSummary};
pub use error::{RunnerError, RunnerResult};
pub use orchestrator::{MatrixRunner, RunTally};
