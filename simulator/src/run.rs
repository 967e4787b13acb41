//! Orchestration for a single simulator run.
//!
//! Tasks run strictly in insertion order against one shared outer context.
//! Order matters: every task spends outer budget that later tasks no longer
//! see. A timed run halts as soon as the outer budget measures zero and records
//! every remaining task as skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::{debug, info, instrument};

use crate::core::clock::Clock;
use crate::core::context::DeadlineContext;
use crate::core::durations::{clamp_to_std, delta_from_std};
use crate::core::gauge::DeadlineGauge;
use crate::core::remarks::RemarkTemplates;
use crate::core::types::{RunOutcome, RunState, SimulationResult, TaskRecord};
use crate::task::Task;

/// Records gathered by one pass over the task list.
struct Pass {
    records: Vec<TaskRecord>,
    skipped: usize,
    halted: bool,
}

/// Runs an ordered list of tasks under one outer timeout.
pub struct Simulator {
    name: String,
    timeout: Duration,
    tasks: Vec<Box<dyn Task>>,
    gauge: DeadlineGauge,
    remarks: RemarkTemplates,
    state: RunState,
}

impl Simulator {
    /// Build a simulator. A zero `timeout` runs the tasks without an outer deadline.
    pub fn new(name: impl Into<String>, timeout: Duration, tasks: Vec<Box<dyn Task>>) -> Self {
        Self {
            name: name.into(),
            timeout,
            tasks,
            gauge: DeadlineGauge::default(),
            remarks: RemarkTemplates::default(),
            state: RunState::Pending,
        }
    }

    /// Measure the outer budget, and every task's derived budget, against
    /// `clock`. Deadlines still fire on tokio's clock, so the two must agree for
    /// races to line up with the measured budgets.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        for task in &mut self.tasks {
            task.set_clock(Arc::clone(&clock));
        }
        self.gauge = DeadlineGauge::new(clock);
        self
    }

    pub fn with_remarks(mut self, remarks: RemarkTemplates) -> Self {
        self.remarks = remarks;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn tasks(&self) -> &[Box<dyn Task>] {
        &self.tasks
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute every task in order and assemble the result.
    #[instrument(
        skip_all,
        fields(
            simulator = %self.name,
            timeout_ms = self.timeout.as_millis() as u64,
            tasks = self.tasks.len(),
        )
    )]
    pub async fn run(&mut self) -> SimulationResult {
        self.state = RunState::Running;
        info!("simulation started");

        let Pass {
            records,
            skipped,
            halted,
        } = if self.timeout.is_zero() {
            self.run_untimed().await
        } else {
            self.run_timed().await
        };

        let outcome = if halted {
            RunOutcome::HaltedByTimeout
        } else {
            RunOutcome::Completed
        };
        self.state = outcome.into();
        info!(outcome = outcome.label(), skipped, "simulation finished");

        SimulationResult {
            name: self.name.clone(),
            timeout: self.timeout,
            outcome,
            records,
            skipped,
        }
    }

    async fn run_untimed(&mut self) -> Pass {
        let ctx = DeadlineContext::background();
        let mut records = Vec::with_capacity(self.tasks.len());

        for task in &mut self.tasks {
            let overran = task.run(Some(&ctx)).await;
            records.push(TaskRecord {
                name: task.name().to_string(),
                latency: task.latency(),
                overran,
                time_in: Duration::ZERO,
                time_out: Duration::ZERO,
                remark: task.remark().to_string(),
            });
        }

        Pass {
            records,
            skipped: 0,
            halted: false,
        }
    }

    async fn run_timed(&mut self) -> Pass {
        let (outer, _release) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            self.gauge.clock(),
            delta_from_std(self.timeout),
        );
        let mut records = Vec::with_capacity(self.tasks.len());
        let mut executed = 0;
        let mut halted = false;

        for task in &mut self.tasks {
            let time_in = self.gauge.remaining(&outer);
            let overran = task.run(Some(&outer)).await;
            let time_out = self.gauge.remaining(&outer);
            executed += 1;

            debug!(
                task = task.name(),
                overran,
                time_in_ms = time_in.num_milliseconds(),
                time_out_ms = time_out.num_milliseconds(),
                "task finished"
            );
            records.push(TaskRecord {
                name: task.name().to_string(),
                latency: task.latency(),
                overran,
                time_in: clamp_to_std(time_in),
                time_out: clamp_to_std(time_out),
                remark: task.remark().to_string(),
            });

            if time_out <= TimeDelta::zero() {
                info!(task = task.name(), "outer budget exhausted, halting");
                halted = true;
                break;
            }
        }

        for task in &self.tasks[executed..] {
            records.push(TaskRecord {
                name: task.name().to_string(),
                latency: task.latency(),
                overran: true,
                time_in: Duration::ZERO,
                time_out: Duration::ZERO,
                remark: self.remarks.simulator_timeout.clone(),
            });
        }

        Pass {
            records,
            skipped: self.tasks.len() - executed,
            halted,
        }
    }
}
