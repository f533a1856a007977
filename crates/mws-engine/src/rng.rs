//! Deterministic generator behind `random`, seeded from `EngineOptions`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rng {
    state: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        next_random_u32(&mut self.state)
    }

    /// Uniform value in `0..bound`; `bound` must be positive.
    pub fn below(&mut self, bound: u32) -> u32 {
        next_random_bounded_with(&mut self.state, bound, next_random_u32)
    }
}

fn next_random_u32(state: &mut u32) -> u32 {
    let mut next = state.wrapping_add(0x6d2b79f5);
    *state = next;
    next = (next ^ (next >> 15)).wrapping_mul(next | 1);
    next ^= next.wrapping_add((next ^ (next >> 7)).wrapping_mul(next | 61));
    next ^ (next >> 14)
}

fn next_random_bounded_with<F>(state: &mut u32, bound: u32, mut next: F) -> u32
where
    F: FnMut(&mut u32) -> u32,
{
    // Reject the tail that would bias the modulo.
    let threshold = (u64::from(u32::MAX) + 1) / u64::from(bound) * u64::from(bound);
    let mut candidate = next(state);
    while u64::from(candidate) >= threshold {
        candidate = next(state);
    }
    candidate % bound
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_retries_past_the_biased_tail() {
        let mut state = 0u32;
        let mut values = vec![u32::MAX, 42u32].into_iter();
        let result = next_random_bounded_with(&mut state, 10, |_| {
            values.next().expect("test values should be available")
        });
        assert_eq!(result, 2);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        let left = (0..8).map(|_| a.below(100)).collect::<Vec<_>>();
        let right = (0..8).map(|_| b.below(100)).collect::<Vec<_>>();
        assert_eq!(left, right);
        assert!(left.iter().all(|value| *value < 100));
    }
}
