//! Deterministic Random Number Generator
//!
//! Uses xorshift32 over a 32-bit state derived from an opaque seed string.
//! Given the same seed, produces identical draw sequence on all platforms.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Errors raised when constructing a [`SeededRng`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RngError {
    /// Seed string was empty.
    #[error("seed string must not be empty")]
    EmptySeed,
}

/// Deterministic PRNG using the xorshift32 algorithm.
///
/// # Determinism Guarantee
///
/// Given the same seed string, this RNG will produce the exact same
/// sequence of draws on any platform. Callers must consume draws in a
/// fixed order per action, or client prediction and server authority
/// diverge.
///
/// # Example
///
/// ```
/// use gloomspire::core::rng::SeededRng;
///
/// let mut a = SeededRng::from_seed("test_seed_12345").unwrap();
/// let mut b = SeededRng::from_seed("test_seed_12345").unwrap();
/// assert_eq!(a.next_f64(), b.next_f64()); // Always the same!
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: i32,
}

impl SeededRng {
    /// Create a new RNG from an opaque seed string.
    ///
    /// The seed is folded into a 32-bit state with a 31-multiplier string
    /// hash over the UTF-8 bytes. A zero hash is remapped to 1 so the
    /// xorshift cycle never degenerates; this remap must be preserved for
    /// compatibility of derived sequences.
    pub fn from_seed(seed: &str) -> Result<Self, RngError> {
        if seed.is_empty() {
            return Err(RngError::EmptySeed);
        }

        let mut hash: i32 = 0;
        for byte in seed.as_bytes() {
            hash = hash.wrapping_mul(31).wrapping_add(*byte as i32);
        }

        let state = if hash == 0 { 1 } else { hash };
        Ok(Self { state })
    }

    /// Generate the next uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let mut x = self.state as u32;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x as i32;

        // 2^32 as divisor keeps the result strictly below 1.0
        x as f64 / 4_294_967_296.0
    }

    /// Generate an integer in `[min, max)`.
    #[inline]
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        (self.next_f64() * (max - min) as f64).floor() as i32 + min
    }

    /// Roll a twenty-sided die, `[1, 20]` inclusive.
    #[inline]
    pub fn roll_d20(&mut self) -> i32 {
        self.next_int(1, 21)
    }

    /// Sum `count` rolls of an N-sided die.
    pub fn roll_dice(&mut self, count: u32, sides: i32) -> i32 {
        let mut total = 0;
        for _ in 0..count {
            total += self.next_int(1, sides + 1);
        }
        total
    }

    /// Select a uniformly-random element from a slice.
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(0, slice.len() as i32) as usize;
            Some(&slice[idx])
        }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> i32 {
        self.state
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rng_determinism() {
        // Same seed must produce same sequence
        let mut rng1 = SeededRng::from_seed("test_seed_12345").unwrap();
        let mut rng2 = SeededRng::from_seed("test_seed_12345").unwrap();

        for _ in 0..1000 {
            assert_eq!(rng1.next_f64(), rng2.next_f64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        // Different seeds produce different sequences
        let mut rng1 = SeededRng::from_seed("test_seed_12345").unwrap();
        let mut rng2 = SeededRng::from_seed("another_seed").unwrap();

        // Very unlikely to match
        assert_ne!(rng1.next_f64(), rng2.next_f64());
    }

    #[test]
    fn test_empty_seed_rejected() {
        assert_eq!(SeededRng::from_seed(""), Err(RngError::EmptySeed));
    }

    #[test]
    fn test_seed_hash_known_values() {
        // "a" hashes to 97, "ab" to 97*31 + 98 = 3105.
        // These values must never change - persisted sessions replay from them.
        assert_eq!(SeededRng::from_seed("a").unwrap().state(), 97);
        assert_eq!(SeededRng::from_seed("ab").unwrap().state(), 3105);
    }

    #[test]
    fn test_xorshift_known_state() {
        // One xorshift32 step from state 97:
        //   97 ^ (97 << 13) = 794721
        //   794721 ^ (794721 >> 17) = 794727
        //   794727 ^ (794727 << 5) = 25701511
        let mut rng = SeededRng::from_seed("a").unwrap();
        let value = rng.next_f64();
        assert_eq!(rng.state(), 25_701_511);
        assert_eq!(value, 25_701_511.0 / 4_294_967_296.0);
    }

    #[test]
    fn test_zero_hash_remapped() {
        // "\0" hashes to 0 and must be remapped to 1
        assert_eq!(SeededRng::from_seed("\0").unwrap().state(), 1);
    }

    #[test]
    fn test_next_int_bounds() {
        let mut rng = SeededRng::from_seed("bounds").unwrap();

        for _ in 0..1000 {
            let val = rng.next_int(0, 100);
            assert!((0..100).contains(&val));
        }

        // Edge case: min == max
        assert_eq!(rng.next_int(5, 5), 5);

        // Edge case: inverted range
        assert_eq!(rng.next_int(10, 3), 10);
    }

    #[test]
    fn test_roll_d20_bounds() {
        let mut rng = SeededRng::from_seed("d20").unwrap();
        for _ in 0..1000 {
            let roll = rng.roll_d20();
            assert!((1..=20).contains(&roll));
        }
    }

    #[test]
    fn test_roll_dice_bounds() {
        let mut rng = SeededRng::from_seed("2d6").unwrap();
        for _ in 0..1000 {
            let total = rng.roll_dice(2, 6);
            assert!((2..=12).contains(&total));
        }
    }

    #[test]
    fn test_pick() {
        let mut rng = SeededRng::from_seed("pick").unwrap();
        let items = [10, 20, 30, 40];

        for _ in 0..100 {
            let chosen = rng.pick(&items).unwrap();
            assert!(items.contains(chosen));
        }

        let empty: [i32; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }

    #[test]
    fn test_pick_determinism() {
        let items = ["left", "right", "up", "down"];
        let mut rng1 = SeededRng::from_seed("pick_det").unwrap();
        let mut rng2 = SeededRng::from_seed("pick_det").unwrap();

        for _ in 0..50 {
            assert_eq!(rng1.pick(&items), rng2.pick(&items));
        }
    }

    #[test]
    fn test_serde_roundtrip_resumes_sequence() {
        let mut rng = SeededRng::from_seed("persisted").unwrap();
        for _ in 0..10 {
            rng.next_f64();
        }

        let encoded = serde_json::to_string(&rng).unwrap();
        let mut restored: SeededRng = serde_json::from_str(&encoded).unwrap();

        for _ in 0..10 {
            assert_eq!(rng.next_f64(), restored.next_f64());
        }
    }

    proptest! {
        #[test]
        fn prop_next_f64_in_unit_interval(seed in "[a-z0-9_]{1,32}") {
            let mut rng = SeededRng::from_seed(&seed).unwrap();
            for _ in 0..256 {
                let v = rng.next_f64();
                prop_assert!((0.0..1.0).contains(&v));
            }
        }

        #[test]
        fn prop_next_int_in_range(
            seed in "[a-z0-9_]{1,32}",
            min in -1000i32..1000,
            span in 1i32..1000,
        ) {
            let mut rng = SeededRng::from_seed(&seed).unwrap();
            let max = min + span;
            for _ in 0..64 {
                let v = rng.next_int(min, max);
                prop_assert!(v >= min && v < max);
            }
        }
    }
}
