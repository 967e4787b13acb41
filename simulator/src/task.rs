//! Work units scheduled by the simulator.
//!
//! The [`Task`] trait decouples orchestration from what a unit of work does.
//! [`SleepTask`] is the reference implementation: it "works" by sleeping for a
//! fixed latency, racing that sleep against the deadline its budget strategy
//! derives.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::core::budget::{BudgetStrategy, Derived};
use crate::core::clock::Clock;
use crate::core::context::DeadlineContext;
use crate::core::remarks::RemarkTemplates;

/// A unit of work the simulator can schedule.
pub trait Task: Send {
    /// Run once against `parent`. Returns `true` if the work overran its deadline.
    fn run<'a>(&'a mut self, parent: Option<&'a DeadlineContext>) -> BoxFuture<'a, bool>;

    fn name(&self) -> &str;

    /// Time the work takes when nothing interrupts it.
    fn latency(&self) -> Duration;

    /// Note left by the most recent run, empty if none.
    fn remark(&self) -> &str;

    /// Measure any derived budget against `clock`. Tasks that derive nothing
    /// ignore it.
    fn set_clock(&mut self, _clock: Arc<dyn Clock>) {}
}

/// Sleeps for a fixed latency, optionally under a derived deadline.
///
/// Without a strategy the sleep runs to completion and never overruns, which
/// models an unmonitored call.
#[derive(Debug, Clone)]
pub struct SleepTask {
    name: String,
    latency: Duration,
    strategy: Option<BudgetStrategy>,
    remarks: RemarkTemplates,
    remark: String,
}

impl SleepTask {
    pub fn new(name: impl Into<String>, latency: Duration, strategy: BudgetStrategy) -> Self {
        Self {
            name: name.into(),
            latency,
            strategy: Some(strategy),
            remarks: RemarkTemplates::default(),
            remark: String::new(),
        }
    }

    pub fn unmonitored(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency,
            strategy: None,
            remarks: RemarkTemplates::default(),
            remark: String::new(),
        }
    }

    pub fn with_remarks(mut self, remarks: RemarkTemplates) -> Self {
        self.remarks = remarks;
        self
    }

    #[instrument(skip_all, fields(task = %self.name, latency_ms = self.latency.as_millis() as u64))]
    async fn execute(&mut self, parent: Option<&DeadlineContext>) -> bool {
        let Some(strategy) = self.strategy.as_mut() else {
            sleep(self.latency).await;
            return false;
        };
        let Some(parent) = parent else {
            warn!("budget strategy has no parent context to derive from");
            self.remark = self.remarks.nil_context.clone();
            return false;
        };

        let Derived { context, guard } = strategy.derive(Some(parent));
        let child = context.unwrap_or_else(|| parent.clone());
        let budget = strategy.granted_budget();

        // Single-slot completion signal. The work task is detached: if the
        // deadline wins, it still sleeps to the end and its send is dropped.
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let latency = self.latency;
        tokio::spawn(async move {
            sleep(latency).await;
            let _ = done_tx.send(());
        });

        let overran = tokio::select! {
            reason = child.done() => {
                debug!(?reason, "deadline fired before work finished");
                true
            }
            _ = done_rx => {
                debug!("work finished within budget");
                false
            }
        };
        guard.cancel();

        self.remark = if overran {
            self.remarks.overrun(budget, latency)
        } else {
            self.remarks.within_budget(budget, latency)
        };
        overran
    }
}

impl Task for SleepTask {
    fn run<'a>(&'a mut self, parent: Option<&'a DeadlineContext>) -> BoxFuture<'a, bool> {
        Box::pin(self.execute(parent))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn latency(&self) -> Duration {
        self.latency
    }

    fn remark(&self) -> &str {
        &self.remark
    }

    fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.set_clock(clock);
        }
    }
}
