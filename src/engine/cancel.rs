// Cooperative cancellation and wall-clock budgets

//! # Cancellation and Deadlines
//!
//! The validator and the simulator can run for a long time on hostile
//! inputs, so both accept a [`CancellationToken`] and observe it at
//! iteration boundaries - the validator on every enqueue, the simulator on
//! every step. There is no async runtime and no signal handling involved:
//! the token is an atomic flag the caller may flip from another thread,
//! and the engine polls it.
//!
//! [`Deadline`] is the matching wall-clock budget: a monotonic-clock
//! expiry polled in the same spots. Both cancellation and expiry turn the
//! current run into an `inconclusive`/`cancelled` result carrying the work
//! performed so far; neither ever panics or unwinds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Clonable cancellation handle backed by an atomic flag
///
/// All clones share the same flag; cancelling any clone cancels them all.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, un-cancelled token
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Request cancellation; observed at the next iteration boundary
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Monotonic wall-clock budget
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires_at: Option<Instant>,
}

impl Deadline {
    /// A deadline `millis` from now
    pub fn after_millis(millis: u64) -> Self {
        Deadline {
            expires_at: Some(Instant::now() + Duration::from_millis(millis)),
        }
    }

    /// A deadline that never expires
    pub fn never() -> Self {
        Deadline { expires_at: None }
    }

    /// Whether the budget is spent
    pub fn expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_clear_and_latches() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_never_deadline_does_not_expire() {
        assert!(!Deadline::never().expired());
    }

    #[test]
    fn test_zero_deadline_expires_immediately() {
        assert!(Deadline::after_millis(0).expired());
    }
}
