//! Remaining-budget measurement against a clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use crate::core::clock::{Clock, shared_system_clock};
use crate::core::context::DeadlineContext;
use crate::core::durations::clamp_to_std;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// Measures how much of a context's budget is left.
#[derive(Clone)]
pub struct DeadlineGauge {
    clock: Arc<dyn Clock>,
}

impl DeadlineGauge {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Deadline minus now, truncated toward zero to whole milliseconds.
    ///
    /// Negative once the deadline has passed. A context without a deadline
    /// measures as zero; callers only ask about contexts they gave a deadline.
    pub fn remaining(&self, ctx: &DeadlineContext) -> TimeDelta {
        let Some(deadline) = ctx.deadline() else {
            return TimeDelta::zero();
        };
        let now = self.clock.now();
        let nanos = if deadline >= now {
            signed_nanos(deadline - now)
        } else {
            -signed_nanos(now - deadline)
        };
        let millis = nanos / NANOS_PER_MILLI;
        TimeDelta::milliseconds(i64::try_from(millis).unwrap_or(i64::MAX))
    }

    /// `remaining` clamped at zero, as reported in task records.
    pub fn remaining_clamped(&self, ctx: &DeadlineContext) -> Duration {
        clamp_to_std(self.remaining(ctx))
    }
}

impl Default for DeadlineGauge {
    fn default() -> Self {
        Self::new(shared_system_clock())
    }
}

impl std::fmt::Debug for DeadlineGauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadlineGauge").finish_non_exhaustive()
    }
}

fn signed_nanos(duration: Duration) -> i128 {
    i128::try_from(duration.as_nanos()).unwrap_or(i128::MAX)
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::context::DeadlineContext;

    fn gauge_at(start: Instant) -> (Arc<ManualClock>, DeadlineGauge) {
        let clock = Arc::new(ManualClock::new(start));
        let gauge = DeadlineGauge::new(clock.clone());
        (clock, gauge)
    }

    #[test]
    fn truncates_to_whole_milliseconds() {
        let start = Instant::now();
        let (clock, gauge) = gauge_at(start);
        let (ctx, _guard) = DeadlineContext::with_deadline(
            &DeadlineContext::background(),
            start + Duration::from_millis(100),
        );

        clock.advance(Duration::from_micros(1_300));
        assert_eq!(gauge.remaining(&ctx), TimeDelta::milliseconds(98));
    }

    #[test]
    fn past_deadline_goes_negative_but_clamps_for_records() {
        let start = Instant::now();
        let (clock, gauge) = gauge_at(start);
        let (ctx, _guard) = DeadlineContext::with_deadline(
            &DeadlineContext::background(),
            start + Duration::from_millis(10),
        );

        clock.advance(Duration::from_micros(12_700));
        assert_eq!(gauge.remaining(&ctx), TimeDelta::milliseconds(-2));
        assert_eq!(gauge.remaining_clamped(&ctx), Duration::ZERO);
    }

    #[test]
    fn sub_millisecond_overshoot_truncates_to_zero() {
        let start = Instant::now();
        let (clock, gauge) = gauge_at(start);
        let (ctx, _guard) = DeadlineContext::with_deadline(
            &DeadlineContext::background(),
            start + Duration::from_millis(10),
        );

        clock.advance(Duration::from_micros(10_400));
        assert_eq!(gauge.remaining(&ctx), TimeDelta::zero());
    }

    #[test]
    fn repeated_reads_never_increase() {
        let start = Instant::now();
        let (clock, gauge) = gauge_at(start);
        let (ctx, _guard) = DeadlineContext::with_deadline(
            &DeadlineContext::background(),
            start + Duration::from_millis(50),
        );

        let first = gauge.remaining(&ctx);
        clock.advance(Duration::from_micros(700));
        let second = gauge.remaining(&ctx);
        clock.advance(Duration::from_millis(3));
        let third = gauge.remaining(&ctx);
        assert!(first >= second);
        assert!(second >= third);
    }

    #[test]
    fn context_without_deadline_measures_zero() {
        let gauge = DeadlineGauge::default();
        assert_eq!(gauge.remaining(&DeadlineContext::background()), TimeDelta::zero());
    }
}
