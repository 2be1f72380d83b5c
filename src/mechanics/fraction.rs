//! Exact similarity fractions: same-kind neighbors over occupied neighbors.

use std::cmp::Ordering;
use std::fmt;

/// Reduced non-negative rational `num / den`, `den > 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: u32,
    den: u32,
}

impl Fraction {
    pub const ZERO: Fraction = Fraction { num: 0, den: 1 };
    pub const ONE: Fraction = Fraction { num: 1, den: 1 };

    pub fn new(num: u32, den: u32) -> Self {
        assert!(den > 0, "fraction denominator must be positive");
        let g = gcd(num, den);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    /// `same / (same + other)`, or exactly 0 with nobody to compare against.
    pub fn similarity(same: u32, other: u32) -> Self {
        match same + other {
            0 => Self::ZERO,
            total => Self::new(same, total),
        }
    }

    #[inline]
    pub const fn num(self) -> u32 {
        self.num
    }

    #[inline]
    pub const fn den(self) -> u32 {
        self.den
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    #[inline]
    pub const fn is_one(self) -> bool {
        self.num == self.den
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Exact comparison against `x`, read as the dyadic rational it encodes.
    /// `None` only for NaN.
    pub fn cmp_f64(self, x: f64) -> Option<Ordering> {
        if x.is_nan() {
            return None;
        }
        if x <= 0.0 {
            return Some(if x < 0.0 || self.num > 0 { Ordering::Greater } else { Ordering::Equal });
        }
        let bits = x.to_bits();
        let exp = ((bits >> 52) & 0x7ff) as i32;
        let frac = bits & ((1u64 << 52) - 1);
        // x = mant * 2^pow
        let (mant, pow) = if exp == 0 { (frac, -1074) } else { (frac | (1u64 << 52), exp - 1075) };
        if exp == 0x7ff || pow >= 0 {
            // infinity, or at least 2^52: beyond any u32 ratio
            return Some(Ordering::Less);
        }
        let shift = (-pow) as u32;
        if shift >= 96 {
            // x < 2^-43, below every non-zero num/den
            return Some(if self.num > 0 { Ordering::Greater } else { Ordering::Less });
        }
        let lhs = (self.num as u128) << shift;
        let rhs = mant as u128 * self.den as u128;
        Some(lhs.cmp(&rhs))
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as u64 * other.den as u64).cmp(&(other.num as u64 * self.den as u64))
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<f64> for Fraction {
    fn eq(&self, other: &f64) -> bool {
        self.cmp_f64(*other) == Some(Ordering::Equal)
    }
}

impl PartialOrd<f64> for Fraction {
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.cmp_f64(*other)
    }
}

impl From<Fraction> for f64 {
    fn from(f: Fraction) -> f64 {
        f.to_f64()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
