//! Time sources for deadline arithmetic.
//!
//! Instants are `tokio::time::Instant` so that the clock and the race timers
//! agree. Under a paused tokio runtime `SystemClock` follows the test clock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Supplies the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Reads tokio's notion of now.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shared handle to the system clock, the default for every component.
pub fn shared_system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to.
///
/// Deadlines computed against it do not drive tokio timers, so it is meant for
/// budget arithmetic tests rather than races.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }

    /// Moves the clock to `instant`. Earlier instants are ignored to keep time monotonic.
    pub fn set(&self, instant: Instant) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if instant > *now {
            *now = instant;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_only_when_told() {
        let start = Instant::now();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_millis(15));
        assert_eq!(clock.now(), start + Duration::from_millis(15));
    }

    #[test]
    fn manual_clock_set_never_moves_backwards() {
        let start = Instant::now();
        let clock = ManualClock::new(start + Duration::from_millis(10));

        clock.set(start);
        assert_eq!(clock.now(), start + Duration::from_millis(10));

        clock.set(start + Duration::from_millis(40));
        assert_eq!(clock.now(), start + Duration::from_millis(40));
    }
}
