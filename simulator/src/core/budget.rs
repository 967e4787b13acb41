//! Strategies that derive a child deadline from a parent context.
//!
//! Two policies exist:
//!
//! - **Weighted**: the child gets `weight` times the parent's remaining budget.
//!   A priority child whose slice would fall under the threshold gets the whole
//!   remaining parent budget instead.
//! - **Fixed**: the child always gets the same timeout, whatever the parent has
//!   left. It may exceed the parent's remaining budget; the simulator's outer
//!   accounting catches that separately.
//!
//! Both record the budget they granted on the most recent derivation. Degenerate
//! weights (zero or negative) are not rejected: they produce a child that is
//! already past its deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tracing::debug;

use crate::core::clock::Clock;
use crate::core::context::{CancelGuard, DeadlineContext};
use crate::core::durations::delta_from_std;
use crate::core::gauge::DeadlineGauge;

/// A derived child context and the guard that releases it.
///
/// `context` is `None` only when the parent was absent.
#[derive(Debug)]
pub struct Derived {
    pub context: Option<DeadlineContext>,
    pub guard: CancelGuard,
}

impl Derived {
    fn passthrough(parent: Option<&DeadlineContext>) -> Self {
        Self {
            context: parent.cloned(),
            guard: CancelGuard::noop(),
        }
    }
}

/// Weighted share of the parent's remaining budget, with a priority override.
#[derive(Debug, Clone)]
pub struct WeightedBudget {
    threshold: Duration,
    weight: f64,
    priority: bool,
    granted: Option<TimeDelta>,
    gauge: DeadlineGauge,
}

impl WeightedBudget {
    pub fn new(threshold: Duration, weight: f64, priority: bool) -> Self {
        Self {
            threshold,
            weight,
            priority,
            granted: None,
            gauge: DeadlineGauge::default(),
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    /// Derive a child context from `parent`.
    ///
    /// An absent parent, or one without a deadline, is passed through unchanged
    /// with a no-op guard.
    pub fn derive(&mut self, parent: Option<&DeadlineContext>) -> Derived {
        let Some(ctx) = parent else {
            return Derived::passthrough(parent);
        };
        if ctx.deadline().is_none() {
            self.granted = None;
            return Derived::passthrough(parent);
        }

        let parent_remaining = self.gauge.remaining(ctx);
        let mut budget = weigh(parent_remaining, self.weight);
        let override_applied = self.priority && budget < delta_from_std(self.threshold);
        if override_applied {
            budget = parent_remaining;
        }
        self.granted = Some(budget);
        debug!(
            parent_remaining_ms = parent_remaining.num_milliseconds(),
            granted_us = budget.num_microseconds(),
            weight = self.weight,
            override_applied,
            "derived weighted budget"
        );

        let (context, guard) = DeadlineContext::with_timeout(ctx, self.gauge.clock(), budget);
        Derived {
            context: Some(context),
            guard,
        }
    }

    /// Budget granted by the most recent derivation, if any.
    pub fn granted_budget(&self) -> Option<TimeDelta> {
        self.granted
    }
}

/// The same timeout on every derivation.
#[derive(Debug, Clone)]
pub struct FixedBudget {
    timeout: Duration,
    granted: Option<TimeDelta>,
    gauge: DeadlineGauge,
}

impl FixedBudget {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            granted: None,
            gauge: DeadlineGauge::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Derive a child due at `now + timeout`. An absent parent is passed through.
    pub fn derive(&mut self, parent: Option<&DeadlineContext>) -> Derived {
        let Some(ctx) = parent else {
            return Derived::passthrough(parent);
        };
        let budget = delta_from_std(self.timeout);
        self.granted = Some(budget);
        debug!(
            granted_ms = budget.num_milliseconds(),
            "derived fixed budget"
        );

        let (context, guard) = DeadlineContext::with_timeout(ctx, self.gauge.clock(), budget);
        Derived {
            context: Some(context),
            guard,
        }
    }

    pub fn granted_budget(&self) -> Option<TimeDelta> {
        self.granted
    }
}

/// How a task derives its own deadline from the context it is handed.
#[derive(Debug, Clone)]
pub enum BudgetStrategy {
    Weighted(WeightedBudget),
    Fixed(FixedBudget),
}

impl BudgetStrategy {
    pub fn weighted(threshold: Duration, weight: f64, priority: bool) -> Self {
        Self::Weighted(WeightedBudget::new(threshold, weight, priority))
    }

    pub fn fixed(timeout: Duration) -> Self {
        Self::Fixed(FixedBudget::new(timeout))
    }

    /// Measure budgets against `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.set_clock(clock);
        self
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        let gauge = DeadlineGauge::new(clock);
        match self {
            Self::Weighted(weighted) => weighted.gauge = gauge,
            Self::Fixed(fixed) => fixed.gauge = gauge,
        }
    }

    pub fn derive(&mut self, parent: Option<&DeadlineContext>) -> Derived {
        match self {
            Self::Weighted(weighted) => weighted.derive(parent),
            Self::Fixed(fixed) => fixed.derive(parent),
        }
    }

    pub fn granted_budget(&self) -> Option<TimeDelta> {
        match self {
            Self::Weighted(weighted) => weighted.granted_budget(),
            Self::Fixed(fixed) => fixed.granted_budget(),
        }
    }
}

/// `remaining * weight`, truncated toward zero at nanosecond precision.
fn weigh(remaining: TimeDelta, weight: f64) -> TimeDelta {
    let nanos = remaining.num_nanoseconds().unwrap_or(i64::MAX);
    // `as` saturates at the i64 bounds and maps NaN to zero.
    TimeDelta::nanoseconds((nanos as f64 * weight) as i64)
}
