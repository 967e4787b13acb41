//! Result records produced by a simulator run.
//!
//! Records are immutable snapshots. They are handed to report renderers and
//! never fed back into the simulator.

use std::time::Duration;

use serde::Serialize;

use crate::core::durations::serialize_millis;

/// Lifecycle of a simulator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    HaltedByTimeout,
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every task ran.
    Completed,
    /// The outer budget reached zero; remaining tasks were skipped.
    HaltedByTimeout,
}

impl RunOutcome {
    pub fn label(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::HaltedByTimeout => "halted by timeout",
        }
    }
}

impl From<RunOutcome> for RunState {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::HaltedByTimeout => RunState::HaltedByTimeout,
        }
    }
}

/// One task's outcome within a run.
///
/// `time_in`/`time_out` are the outer budget left before and after the task,
/// clamped at zero. Both stay zero for untimed runs and skipped tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub name: String,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub overran: bool,
    #[serde(rename = "time_in_ms", serialize_with = "serialize_millis")]
    pub time_in: Duration,
    #[serde(rename = "time_out_ms", serialize_with = "serialize_millis")]
    pub time_out: Duration,
    pub remark: String,
}

/// Everything a report needs about one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationResult {
    pub name: String,
    /// Outer timeout; zero means the run was untimed.
    #[serde(rename = "timeout_ms", serialize_with = "serialize_millis")]
    pub timeout: Duration,
    pub outcome: RunOutcome,
    pub records: Vec<TaskRecord>,
    /// Trailing tasks that never ran because the outer budget ran out.
    pub skipped: usize,
}

impl SimulationResult {
    pub fn executed(&self) -> usize {
        self.records.len() - self.skipped
    }

    pub fn overran(&self) -> usize {
        self.records.iter().filter(|record| record.overran).count()
    }

    pub fn record(&self, name: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|record| record.name == name)
    }
}
