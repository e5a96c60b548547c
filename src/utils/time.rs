#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Wall-clock budget of one evaluation tick.
pub struct TickBudget {
    start: Instant,
    budget: Duration,
}

impl TickBudget {
    /// Starts counting now.
    #[must_use]
    pub fn start(budget: Duration) -> Self {
        Self {
            start: Instant::now(),
            budget,
        }
    }

    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.elapsed() >= self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_budget_is_exhausted_immediately() {
        assert!(TickBudget::start(Duration::ZERO).is_exhausted());
    }

    #[test]
    fn large_budget_is_not() {
        assert!(!TickBudget::start(Duration::from_secs(3600)).is_exhausted());
    }
}
