//! Deadline-bearing contexts with scoped cancellation.
//!
//! A context carries an optional deadline plus the cancellation signals of
//! itself and every ancestor. Deriving a child hands back a [`CancelGuard`];
//! cancelling or dropping the guard signals the child and all of its
//! descendants. A child's deadline is independent of its parent's deadline.

use futures::future::select_all;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use chrono::TimeDelta;

use crate::core::clock::Clock;

/// Why a context's `done` future resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    DeadlineExceeded,
    Cancelled,
}

/// An optional deadline plus the cancellation signals inherited from ancestors.
#[derive(Debug, Clone)]
pub struct DeadlineContext {
    deadline: Option<Instant>,
    signals: Vec<watch::Receiver<bool>>,
}

impl DeadlineContext {
    /// Root context: no deadline, never cancelled.
    pub fn background() -> Self {
        Self {
            deadline: None,
            signals: Vec::new(),
        }
    }

    /// Derive a child whose deadline is `clock.now() + timeout`.
    ///
    /// A non-positive `timeout` yields a child that is already past its deadline.
    pub fn with_timeout(
        parent: &DeadlineContext,
        clock: &dyn Clock,
        timeout: TimeDelta,
    ) -> (DeadlineContext, CancelGuard) {
        let deadline = offset_instant(clock.now(), timeout);
        Self::with_deadline(parent, deadline)
    }

    /// Derive a child with an absolute deadline.
    pub fn with_deadline(
        parent: &DeadlineContext,
        deadline: Instant,
    ) -> (DeadlineContext, CancelGuard) {
        let (tx, rx) = watch::channel(false);
        let mut signals = parent.signals.clone();
        signals.push(rx);
        let child = DeadlineContext {
            deadline: Some(deadline),
            signals,
        };
        (child, CancelGuard { tx: Some(tx) })
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once this context or any ancestor has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.signals
            .iter()
            .any(|rx| *rx.borrow() || rx.has_changed().is_err())
    }

    /// True once the deadline has passed (per tokio's clock) or the context was cancelled.
    pub fn is_done(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now()) || self.is_cancelled()
    }

    /// Resolve at the first of: deadline elapsed, this context or an ancestor cancelled.
    ///
    /// Pends forever for a context with neither a deadline nor a cancellation signal.
    pub async fn done(&self) -> DoneReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    () = sleep_until(deadline) => DoneReason::DeadlineExceeded,
                    () = self.cancelled() => DoneReason::Cancelled,
                }
            }
            None => {
                self.cancelled().await;
                DoneReason::Cancelled
            }
        }
    }

    async fn cancelled(&self) {
        if self.signals.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.signals.iter().cloned().map(|mut rx| {
            Box::pin(async move {
                // A dropped sender means the guard is gone; treat as cancelled.
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            })
        });
        select_all(waits).await;
    }
}

/// Releases a derived context. Cancels on `cancel()` or on drop, exactly once.
#[derive(Debug)]
pub struct CancelGuard {
    tx: Option<watch::Sender<bool>>,
}

impl CancelGuard {
    /// Guard for passthrough derivations that created no context.
    pub fn noop() -> Self {
        Self { tx: None }
    }

    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(tx) = self.tx.take() {
            tx.send_replace(true);
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn offset_instant(now: Instant, offset: TimeDelta) -> Instant {
    match offset.to_std() {
        Ok(forward) => now.checked_add(forward).unwrap_or(now),
        Err(_) => offset
            .abs()
            .to_std()
            .ok()
            .and_then(|back| now.checked_sub(back))
            .unwrap_or(now),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::clock::{ManualClock, SystemClock};

    #[test]
    fn background_has_no_deadline_and_is_never_cancelled() {
        let ctx = DeadlineContext::background();
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn non_positive_timeout_is_born_expired() {
        let start = Instant::now();
        let clock = ManualClock::new(start + Duration::from_millis(100));
        let (ctx, _guard) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            &clock,
            TimeDelta::milliseconds(-20),
        );
        assert_eq!(ctx.deadline(), Some(start + Duration::from_millis(80)));
    }

    #[test]
    fn cancelling_parent_cancels_child() {
        let clock = SystemClock;
        let (parent, parent_guard) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            &clock,
            TimeDelta::seconds(10),
        );
        let (child, _child_guard) =
            DeadlineContext::with_timeout(&parent, &clock, TimeDelta::seconds(5));
        assert!(!child.is_cancelled());

        parent_guard.cancel();
        assert!(parent.is_cancelled());
        assert!(child.is_cancelled());
    }

    #[test]
    fn dropping_guard_releases_context() {
        let (ctx, guard) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            &SystemClock,
            TimeDelta::seconds(10),
        );
        drop(guard);
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn noop_guard_touches_nothing() {
        let ctx = DeadlineContext::background();
        CancelGuard::noop().cancel();
        assert!(!ctx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn done_fires_at_deadline() {
        let start = Instant::now();
        let (ctx, _guard) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            &SystemClock,
            TimeDelta::milliseconds(25),
        );
        assert_eq!(ctx.done().await, DoneReason::DeadlineExceeded);
        assert_eq!(start.elapsed(), Duration::from_millis(25));
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn done_reports_cancellation_before_deadline() {
        let (ctx, guard) = DeadlineContext::with_timeout(
            &DeadlineContext::background(),
            &SystemClock,
            TimeDelta::seconds(60),
        );
        guard.cancel();
        assert_eq!(ctx.done().await, DoneReason::Cancelled);
    }
}
