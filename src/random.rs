//! Uniform random sources for game outcomes.
//!
//! Production code draws from the operating system CSPRNG; tests use a seeded
//! generator or a scripted sequence so engine decisions are reproducible.
//! [`SourceRng`] lends any source to `rand`'s slice and index sampling.

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Supplier of uniform random numbers
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`
    fn next_f64(&self) -> f64;

    /// Uniform 64-bit word
    fn next_u64(&self) -> u64;

    /// Uniform integer in `[0, upper)`. `upper` must be non-zero.
    fn below(&self, upper: u32) -> u32;

    /// Uniform integer in the inclusive range `[low, high]`
    fn range_inclusive(&self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        low + self.below(high - low + 1)
    }

    /// Uniform float in `[low, high)`
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + self.next_f64() * (high - low)
    }
}

/// Cryptographically strong source backed by the OS generator
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn next_f64(&self) -> f64 {
        OsRng.gen::<f64>()
    }

    fn next_u64(&self) -> u64 {
        OsRng.next_u64()
    }

    fn below(&self, upper: u32) -> u32 {
        OsRng.gen_range(0..upper)
    }
}

/// Deterministic source for simulations and tests
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned lock only means another test thread panicked mid-draw.
        let mut guard = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.with_rng(|rng| rng.gen::<f64>())
    }

    fn next_u64(&self) -> u64 {
        self.with_rng(|rng| rng.next_u64())
    }

    fn below(&self, upper: u32) -> u32 {
        self.with_rng(|rng| rng.gen_range(0..upper))
    }
}

/// Replays a fixed list of `[0, 1)` draws, then falls back to a seeded stream.
///
/// Integer and word draws consume the same queue, scaled to their range.
pub struct ScriptedRandom {
    script: Mutex<VecDeque<f64>>,
    fallback: SeededRandom,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            script: Mutex::new(draws.into_iter().collect()),
            fallback: SeededRandom::new(0x5eed),
        }
    }

    fn pop(&self) -> Option<f64> {
        let mut guard = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.pop_front()
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&self) -> f64 {
        self.pop().unwrap_or_else(|| self.fallback.next_f64())
    }

    fn next_u64(&self) -> u64 {
        match self.pop() {
            Some(draw) => (draw * u64::MAX as f64) as u64,
            None => self.fallback.next_u64(),
        }
    }

    fn below(&self, upper: u32) -> u32 {
        match self.pop() {
            Some(draw) => ((draw * upper as f64) as u32).min(upper.saturating_sub(1)),
            None => self.fallback.below(upper),
        }
    }
}

/// [`RngCore`] view over a [`RandomSource`]
pub struct SourceRng<'a> {
    source: &'a dyn RandomSource,
}

impl<'a> SourceRng<'a> {
    pub fn new(source: &'a dyn RandomSource) -> Self {
        Self { source }
    }
}

impl RngCore for SourceRng<'_> {
    fn next_u32(&mut self) -> u32 {
        (self.source.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.source.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_bounds() {
        let random = OsRandom;
        for _ in 0..1_000 {
            let x = random.next_f64();
            assert!((0.0..1.0).contains(&x));
            assert!(random.below(4) < 4);
            let r = random.range_inclusive(3, 5);
            assert!((3..=5).contains(&r));
        }
    }

    #[test]
    fn test_seeded_is_repeatable() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        let xs: Vec<f64> = (0..10).map(|_| a.next_f64()).collect();
        let ys: Vec<f64> = (0..10).map(|_| b.next_f64()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_scripted_replays_then_falls_back() {
        let random = ScriptedRandom::new([0.25, 0.99]);
        assert_eq!(random.next_f64(), 0.25);
        assert_eq!(random.below(4), 3);
        let x = random.next_f64();
        assert!((0.0..1.0).contains(&x));
    }

    #[test]
    fn test_source_rng_drives_slice_sampling() {
        use rand::seq::SliceRandom;

        let random = SeededRandom::new(7);
        let mut rng = SourceRng::new(&random);
        let mut items: Vec<u8> = (1..=25).collect();
        items.shuffle(&mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=25).collect::<Vec<u8>>());
        assert!(items.choose(&mut rng).is_some());

        let mut bytes = [0u8; 13];
        rng.fill_bytes(&mut bytes);
    }

    #[test]
    fn test_scripted_words_follow_script() {
        let random = ScriptedRandom::new([0.0, 0.5]);
        assert_eq!(random.next_u64(), 0);
        assert_eq!(random.next_u64() >> 63, 1);
    }
}
