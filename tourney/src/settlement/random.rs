//! Random sources for winner selection.
//!
//! The engine only asks for an index in `[0, upper)`; tests plug in
//! [`FixedSequence`] to pick exact winners.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Uniform index source
pub trait RandomSource: Send + Sync {
    /// Index drawn uniformly from `[0, upper)`. Callers never pass zero.
    fn next_index(&self, upper: usize) -> usize;
}

/// Thread-local OS-seeded generator
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_index(&self, upper: usize) -> usize {
        rand::rng().random_range(0..upper)
    }
}

/// Reproducible generator from a fixed seed
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&self, upper: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.random_range(0..upper)
    }
}

/// Replays a fixed list of indices, each reduced modulo `upper`. Once the
/// list is exhausted it keeps returning 0.
pub struct FixedSequence {
    picks: Mutex<VecDeque<usize>>,
}

impl FixedSequence {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: Mutex::new(picks.into_iter().collect()),
        }
    }
}

impl RandomSource for FixedSequence {
    fn next_index(&self, upper: usize) -> usize {
        let mut picks = self.picks.lock().unwrap_or_else(|e| e.into_inner());
        picks.pop_front().map_or(0, |pick| pick % upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_sequence_replays_modulo_upper() {
        let source = FixedSequence::new([1, 5, 2]);
        assert_eq!(source.next_index(3), 1);
        assert_eq!(source.next_index(3), 2);
        assert_eq!(source.next_index(4), 2);
        assert_eq!(source.next_index(4), 0);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let picks_a: Vec<usize> = (0..20).map(|_| a.next_index(10)).collect();
        let picks_b: Vec<usize> = (0..20).map(|_| b.next_index(10)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_thread_random_stays_in_range() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            assert!(source.next_index(7) < 7);
        }
        assert_eq!(source.next_index(1), 0);
    }

    #[test]
    fn test_seeded_random_covers_all_indices() {
        let source = SeededRandom::new(7);
        let mut seen = [false; 4];
        for _ in 0..400 {
            seen[source.next_index(4)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
