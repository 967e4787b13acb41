//! Test-only helpers for building tasks and scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::sleep;

use crate::core::budget::BudgetStrategy;
use crate::core::context::DeadlineContext;
use crate::task::{SleepTask, Task};

/// Shorthand for whole-millisecond durations.
pub fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Observes what a [`CountingTask`] saw while it ran.
#[derive(Debug, Clone, Default)]
pub struct TaskProbe {
    runs: Arc<AtomicUsize>,
    last_parent: Arc<Mutex<Option<DeadlineContext>>>,
}

impl TaskProbe {
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// The parent context handed to the most recent run.
    pub fn last_parent(&self) -> Option<DeadlineContext> {
        self.last_parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Unmonitored sleeping task that counts its executions.
#[derive(Debug)]
pub struct CountingTask {
    name: String,
    latency: Duration,
    probe: TaskProbe,
}

impl CountingTask {
    pub fn new(name: &str, latency: Duration) -> (Self, TaskProbe) {
        let probe = TaskProbe::default();
        let task = Self {
            name: name.to_string(),
            latency,
            probe: probe.clone(),
        };
        (task, probe)
    }
}

impl Task for CountingTask {
    fn run<'a>(&'a mut self, parent: Option<&'a DeadlineContext>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.probe.runs.fetch_add(1, Ordering::SeqCst);
            *self
                .probe
                .last_parent
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = parent.cloned();
            sleep(self.latency).await;
            false
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> Duration {
        self.latency
    }

    fn remark(&self) -> &str {
        "counted"
    }
}

/// The five-call chain used throughout the docs and tests.
///
/// Outer timeout 100ms, priority threshold 30ms:
/// `func 1` 10ms @ 0.2, `func 2` 80ms @ 0.5, `func 3` 20ms @ 0.3,
/// `func 4` 50ms @ 0.6 priority, `func 5` 30ms fixed 30ms.
pub fn reference_tasks() -> Vec<Box<dyn Task>> {
    let threshold = ms(30);
    vec![
        Box::new(SleepTask::new(
            "func 1",
            ms(10),
            BudgetStrategy::weighted(threshold, 0.2, false),
        )),
        Box::new(SleepTask::new(
            "func 2",
            ms(80),
            BudgetStrategy::weighted(threshold, 0.5, false),
        )),
        Box::new(SleepTask::new(
            "func 3",
            ms(20),
            BudgetStrategy::weighted(threshold, 0.3, false),
        )),
        Box::new(SleepTask::new(
            "func 4",
            ms(50),
            BudgetStrategy::weighted(threshold, 0.6, true),
        )),
        Box::new(SleepTask::new("func 5", ms(30), BudgetStrategy::fixed(ms(30)))),
    ]
}
