//! Cooperative cancellation for the timestep loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag checked by the stepper between timesteps. Raising it stops
/// the loop after the current step completes cleanly; no exchange is torn
/// down mid-flight.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    was_cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn was_cancelled(&self) -> bool {
        self.was_cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.was_cancelled.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.was_cancelled.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.was_cancelled());
        token.cancel();
        assert!(other.was_cancelled());
        other.reset();
        assert!(!token.was_cancelled());
    }
}
