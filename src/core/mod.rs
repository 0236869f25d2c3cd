//! Deterministic primitives.
//!
//! Everything in this module is 100% deterministic:
//! - No system time, no ambient randomness
//! - All randomness from the seeded xorshift32 PRNG
//! - Identical results on any platform given the same seed

pub mod hash;
pub mod rng;

pub use hash::{StateHash, StateHasher};
pub use rng::{RngError, SeededRng};
