//! Diagnostic tracing for simulator runs.
//!
//! Events go to stderr and never into a rendered report, so `RUST_LOG` can be
//! raised without changing stdout. Useful targets:
//!
//! - `simulator::run`: run start and finish, one event per task with its
//!   before/after outer budget, and the halt.
//! - `simulator::core::budget`: every derivation with the granted budget and
//!   whether the priority override applied.
//! - `simulator::task`: which side of each race won.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr subscriber. Filter comes from `RUST_LOG`, `warn` if unset.
/// A second call is a no-op: the first subscriber stays installed.
///
/// # Example
/// ```bash
/// RUST_LOG=simulator::core::budget=debug deadline-sim run scenarios/reference.toml
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_keeps_first_subscriber() {
        init();
        init();
        tracing::debug!("still routed after a second init");
    }
}
