//! Vector kernel shared by the float and integer domains
//!
//! glam provides storage and arithmetic (add, subtract, dot); this trait adds
//! the handful of operations the simulation leans on with consistent edge cases.

use glam::{DVec2, I64Vec2, IVec2, Vec2};
use rand::Rng;

/// 2D vector operations over `Vec2`, `DVec2`, `IVec2` and `I64Vec2`
pub trait Vector2: Copy + PartialEq {
    /// Component type
    type Scalar: Copy + PartialOrd;
    /// Floating type used for lengths
    type Real: Copy;
    /// Floating vector type used for midpoints
    type RealVector;

    fn magnitude_squared(self) -> Self::Scalar;
    fn magnitude(self) -> Self::Real;
    /// Unit vector; the zero vector maps to itself
    fn unit(self) -> Self;
    /// Rescale to `magnitude`. A zero vector is returned unchanged; a zero target yields zero.
    fn with_magnitude(self, magnitude: Self::Real) -> Self;
    fn midpoint(self, other: Self) -> Self::RealVector;
    /// True if each component of `other` is within `margin` of this one
    fn are_within(self, other: Self, margin: Self::Scalar) -> bool;
}

macro_rules! impl_float_vector {
    ($vec:ty, $scalar:ty) => {
        impl Vector2 for $vec {
            type Scalar = $scalar;
            type Real = $scalar;
            type RealVector = $vec;

            #[inline]
            fn magnitude_squared(self) -> $scalar {
                self.length_squared()
            }

            #[inline]
            fn magnitude(self) -> $scalar {
                self.length()
            }

            #[inline]
            fn unit(self) -> Self {
                self.normalize_or_zero()
            }

            fn with_magnitude(self, magnitude: $scalar) -> Self {
                if magnitude == 0.0 {
                    return Self::ZERO;
                }
                let current = self.length();
                if current == 0.0 {
                    self
                } else {
                    self * (magnitude / current)
                }
            }

            #[inline]
            fn midpoint(self, other: Self) -> $vec {
                (self + other) * 0.5
            }

            #[inline]
            fn are_within(self, other: Self, margin: $scalar) -> bool {
                (self.x - other.x).abs() <= margin && (self.y - other.y).abs() <= margin
            }
        }
    };
}

macro_rules! impl_int_vector {
    ($vec:ty, $scalar:ty, $real_vec:ty, $real:ty) => {
        impl Vector2 for $vec {
            type Scalar = $scalar;
            type Real = $real;
            type RealVector = $real_vec;

            #[inline]
            fn magnitude_squared(self) -> $scalar {
                self.x * self.x + self.y * self.y
            }

            #[inline]
            fn magnitude(self) -> $real {
                (self.magnitude_squared() as $real).sqrt()
            }

            fn unit(self) -> Self {
                let length = self.magnitude();
                if length == 0.0 {
                    return Self::ZERO;
                }
                Self::new(
                    (self.x as $real / length) as $scalar,
                    (self.y as $real / length) as $scalar,
                )
            }

            fn with_magnitude(self, magnitude: $real) -> Self {
                if magnitude == 0.0 {
                    return Self::ZERO;
                }
                let current = self.magnitude();
                if current == 0.0 {
                    return self;
                }
                let scale = magnitude / current;
                Self::new(
                    (self.x as $real * scale) as $scalar,
                    (self.y as $real * scale) as $scalar,
                )
            }

            #[inline]
            fn midpoint(self, other: Self) -> $real_vec {
                <$real_vec>::new(
                    (self.x as $real + other.x as $real) * 0.5,
                    (self.y as $real + other.y as $real) * 0.5,
                )
            }

            #[inline]
            fn are_within(self, other: Self, margin: $scalar) -> bool {
                (self.x - other.x).abs() <= margin && (self.y - other.y).abs() <= margin
            }
        }
    };
}

impl_float_vector!(Vec2, f32);
impl_float_vector!(DVec2, f64);
impl_int_vector!(IVec2, i32, Vec2, f32);
impl_int_vector!(I64Vec2, i64, DVec2, f64);

/// Linear interpolation between two scalars
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Centre-biased uniform in [0, 1): `p/2 + p²/2` for uniform `p`
#[inline]
pub fn eased_unit<R: Rng>(rng: &mut R) -> f32 {
    let p: f32 = rng.random();
    0.5 * p + 0.5 * p * p
}

/// Pick an index by cumulative weight. `roll` must lie in [0, total weight).
///
/// Walks the weights subtracting each from the roll until it drops below zero.
/// Falls back to the last index if rounding leaves the roll unconsumed.
pub fn weighted_index<I>(weights: I, roll: f32) -> Option<usize>
where
    I: IntoIterator<Item = f32>,
{
    let mut remaining = roll;
    let mut last = None;
    for (index, weight) in weights.into_iter().enumerate() {
        remaining -= weight;
        if remaining < 0.0 {
            return Some(index);
        }
        last = Some(index);
    }
    last
}

/// Uniform random point inside a circle of `radius` centred on the origin
pub fn point_in_circle<R: Rng>(rng: &mut R, radius: f32) -> Vec2 {
    let theta = std::f32::consts::TAU * rng.random::<f32>();
    let u = rng.random::<f32>() + rng.random::<f32>();
    let r = if u > 1.0 { 2.0 - u } else { u };
    Vec2::new(r * theta.cos(), r * theta.sin()) * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_unit_of_zero_is_zero() {
        assert_eq!(Vec2::ZERO.unit(), Vec2::ZERO);
        assert_eq!(DVec2::ZERO.unit(), DVec2::ZERO);
        assert_eq!(IVec2::ZERO.unit(), IVec2::ZERO);
        assert_eq!(I64Vec2::ZERO.unit(), I64Vec2::ZERO);
    }

    #[test]
    fn test_with_magnitude_edge_cases() {
        assert_eq!(Vec2::ZERO.with_magnitude(3.0), Vec2::ZERO);
        assert_eq!(Vec2::new(3.0, 4.0).with_magnitude(0.0), Vec2::ZERO);
        let v = Vec2::new(3.0, 4.0).with_magnitude(10.0);
        assert!((v - Vec2::new(6.0, 8.0)).length() < 1e-5);
        assert_eq!(IVec2::new(3, 4).with_magnitude(10.0), IVec2::new(6, 8));
    }

    #[test]
    fn test_int_vector_basics() {
        let v = IVec2::new(3, 4);
        assert_eq!(v.magnitude_squared(), 25);
        assert_eq!(v.magnitude(), 5.0);
        assert_eq!(v.midpoint(IVec2::new(0, 1)), Vec2::new(1.5, 2.5));
        assert!(v.are_within(IVec2::new(4, 5), 1));
        assert!(!v.are_within(IVec2::new(5, 4), 1));
    }

    #[test]
    fn test_weighted_index() {
        let weights = [1.0, 3.0, 1.0];
        assert_eq!(weighted_index(weights, 0.5), Some(0));
        assert_eq!(weighted_index(weights, 1.0), Some(1));
        assert_eq!(weighted_index(weights, 3.9), Some(1));
        assert_eq!(weighted_index(weights, 4.2), Some(2));
        assert_eq!(weighted_index(weights, 99.0), Some(2));
        assert_eq!(weighted_index(std::iter::empty(), 0.0), None);
    }

    #[test]
    fn test_point_in_circle_bounds() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..500 {
            assert!(point_in_circle(&mut rng, 3.0).length() <= 3.0 + 1e-4);
        }
    }

    proptest! {
        #[test]
        fn unit_vector_has_length_one(x in -1.0e4f32..1.0e4, y in -1.0e4f32..1.0e4) {
            let v = Vec2::new(x, y);
            prop_assume!(v.length() > 1e-3);
            prop_assert!((v.unit().magnitude() - 1.0).abs() < 1e-4);
        }

        #[test]
        fn unit_vector_has_length_one_f64(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
            let v = DVec2::new(x, y);
            prop_assume!(v.length() > 1e-6);
            prop_assert!((v.unit().magnitude() - 1.0).abs() < 1e-9);
        }
    }
}
