//! Per-invocation follow-up fetch budget.

/// Counts follow-up fetch attempts against a fixed maximum.
///
/// Every attempt counts, whatever its outcome, since errors consume outbound
/// calls just like successes. Reaching the maximum is not an error: the caller
/// simply stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBudget {
    max: usize,
    attempted: usize,
}

impl FetchBudget {
    pub fn new(max: usize) -> Self {
        Self { max, attempted: 0 }
    }

    /// True once no further fetch may be attempted.
    pub fn is_exhausted(&self) -> bool {
        self.attempted >= self.max
    }

    /// Record one attempted fetch.
    pub fn record_attempt(&mut self) {
        self.attempted += 1;
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }
}
