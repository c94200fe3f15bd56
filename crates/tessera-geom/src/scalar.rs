//! Coordinate scalar abstraction.

use std::fmt::{Debug, Display};
use std::ops::{Add, Mul, Sub};

use tessera_core::Wire;

/// A coordinate component: the integer (`i64`) or real (`f64`) variant.
///
/// Integer coordinates index cells of a lattice and are what halo plans
/// are built from; real coordinates describe continuous agent positions.
pub trait Scalar:
    Copy
    + Debug
    + Display
    + PartialEq
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Wire
    + Send
    + Sync
    + 'static
{
    /// Additive identity.
    const ZERO: Self;

    /// Multiplicative identity.
    const ONE: Self;

    /// Lossy conversion for distance computations.
    fn to_f64(self) -> f64;

    /// Half of a non-negative extent, rounded down for integers.
    fn half(self) -> Self;

    /// The largest representable value strictly below `self`.
    ///
    /// Used to clamp a point into a half-open range `[lo, hi)`.
    fn step_below(self) -> Self;

    /// The smaller of two values.
    fn min_of(a: Self, b: Self) -> Self {
        if b < a {
            b
        } else {
            a
        }
    }

    /// The larger of two values.
    fn max_of(a: Self, b: Self) -> Self {
        if b > a {
            b
        } else {
            a
        }
    }
}

impl Scalar for i64 {
    const ZERO: Self = 0;
    const ONE: Self = 1;

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn half(self) -> Self {
        self.div_euclid(2)
    }

    fn step_below(self) -> Self {
        self - 1
    }
}

impl Scalar for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    fn to_f64(self) -> f64 {
        self
    }

    fn half(self) -> Self {
        self * 0.5
    }

    fn step_below(self) -> Self {
        if self.is_nan() || self == f64::NEG_INFINITY {
            return self;
        }
        if self == 0.0 {
            return -f64::from_bits(1);
        }
        let bits = self.to_bits();
        if self > 0.0 {
            f64::from_bits(bits - 1)
        } else {
            f64::from_bits(bits + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_half_rounds_down() {
        assert_eq!(7i64.half(), 3);
        assert_eq!(8i64.half(), 4);
    }

    #[test]
    fn step_below_is_strictly_smaller() {
        assert_eq!(5i64.step_below(), 4);
        for v in [1.0f64, -1.0, 0.0, 1e-300, 12345.678] {
            let below = v.step_below();
            assert!(below < v, "{below} !< {v}");
        }
    }

    #[test]
    fn min_max_of() {
        assert_eq!(i64::min_of(3, -2), -2);
        assert_eq!(f64::max_of(0.5, 2.5), 2.5);
    }
}
