//! Dispatcher round-robin cursor (§3, §5): an integer read-and-incremented
//! under a lock — here, an atomic, since the only operation is `fetch_add`.

use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Cursor(AtomicUsize);

impl Cursor {
    pub fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    /// Advances the cursor exactly once and returns an index into a slice of
    /// length `len` (§5 "Round-robin cursor advances exactly once per
    /// dispatch attempt, even across concurrent callers").
    pub fn next(&self, len: usize) -> usize {
        debug_assert!(len > 0, "next() called with an empty candidate list");
        self.0.fetch_add(1, Ordering::Relaxed) % len
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_round_robin_wraps() {
        let cursor = Cursor::new();
        let picks: Vec<usize> = (0..6).map(|_| cursor.next(3)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn fair_distribution_across_concurrent_callers() {
        use std::sync::Arc;
        use std::thread;

        let cursor = Arc::new(Cursor::new());
        let mut counts = [0usize; 4];
        let handles: Vec<_> = (0..400)
            .map(|_| {
                let cursor = Arc::clone(&cursor);
                thread::spawn(move || cursor.next(4))
            })
            .collect();
        for handle in handles {
            counts[handle.join().unwrap()] += 1;
        }
        for count in counts {
            assert!((90..=110).contains(&count), "count {count} too skewed for 400/4");
        }
    }
}
