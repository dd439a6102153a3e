use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

/// Step counter for the running pipeline.
#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl Progress {
    /// Starts a new run of `total` steps.
    pub fn reset(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    pub fn advance(&self, steps: usize) {
        let done = self.done.fetch_add(steps, Ordering::Relaxed) + steps;
        trace!(done, total = self.total(), "progress");
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in `[0, 1]`; 0 when nothing is running.
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.done() as f64 / total as f64).min(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_steps() {
        let p = Progress::default();
        assert_eq!(p.fraction(), 0.0);
        p.reset(4);
        p.advance(1);
        p.advance(1);
        assert_eq!(p.done(), 2);
        assert_eq!(p.fraction(), 0.5);
        p.reset(0);
        assert_eq!(p.done(), 0);
    }
}
