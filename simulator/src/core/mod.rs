//! Deadline arithmetic shared by tasks and the simulator.
//!
//! Core modules never touch the filesystem. They only depend on tokio's clock
//! and sync primitives, so tests can drive them with a paused clock.

pub mod budget;
pub mod clock;
pub mod context;
pub mod durations;
pub mod gauge;
pub mod remarks;
pub mod types;
