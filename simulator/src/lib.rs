//! Deadline propagation simulator.
//!
//! Models how a time budget degrades as it flows through a sequence of
//! dependent calls. Each call may take a weighted slice of the remaining
//! budget, get a fixed timeout, or run unmonitored. The architecture keeps
//! the same split throughout:
//!
//! - **[`core`]**: Deadline arithmetic (clock, gauge, budget strategies,
//!   contexts) and result types. In-memory only.
//! - **[`io`]**: Scenario files on disk.
//!
//! Orchestration modules ([`task`], [`run`]) race work against derived
//! deadlines and assemble the per-task records.

pub mod core;
pub mod io;
pub mod logging;
pub mod run;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use crate::core::types::{RunOutcome, RunState, SimulationResult, TaskRecord};
pub use crate::run::Simulator;
pub use crate::task::{SleepTask, Task};
