//! Stochastic mechanics: seeding, uniform index draws and shuffles.
//! Note: every draw goes through a caller-owned `WyRand`, so one seed pins
//! the whole search trajectory.

use bevy_prng::WyRand;
use rand_core::{RngCore, SeedableRng};

/// The generator a simulation owns, seeded the same way everywhere.
#[inline]
pub fn seeded(seed: u64) -> WyRand {
    WyRand::from_seed(seed.to_le_bytes())
}

/// Uniform index in `0..n` (multiply-shift on a 64-bit draw).
#[inline]
pub fn below<R: RngCore + ?Sized>(rng: &mut R, n: usize) -> usize {
    assert!(n > 0, "cannot draw an index from an empty range");
    ((rng.next_u64() as u128 * n as u128) >> 64) as usize
}

/// Uniform pick from `items`, `None` when empty.
#[inline]
pub fn choose<'a, T, R: RngCore + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[below(rng, items.len())])
    }
}

/// In-place Fisher–Yates.
pub fn shuffle<T, R: RngCore + ?Sized>(rng: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = below(rng, i + 1);
        items.swap(i, j);
    }
}
