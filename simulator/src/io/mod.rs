//! File-backed inputs for the simulator.

pub mod scenario;
