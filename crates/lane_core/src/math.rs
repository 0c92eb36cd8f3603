//! Fixed-point math utilities for deterministic simulation.
//!
//! All simulation quantities (positions, time, health, damage) use
//! fixed-point arithmetic so that two runs fed the same inputs produce
//! bit-identical state on every platform.

use fixed::types::{I32F32, I64F64};
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Double-width type for squared distances, which do not fit in [`Fixed`].
type Wide = I64F64;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate (the lane axis).
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for `Option<Fixed>`.
pub mod option_fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize an optional fixed-point number.
    pub fn serialize<S>(value: &Option<Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(Fixed::to_bits).serialize(serializer)
    }

    /// Deserialize an optional fixed-point number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Fixed>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<i64>::deserialize(deserializer)?;
        Ok(opt.map(Fixed::from_bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    fn wide_distance_squared(self, other: Self) -> Wide {
        let dx = Wide::from_num(self.x) - Wide::from_num(other.x);
        let dy = Wide::from_num(self.y) - Wide::from_num(other.y);
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`] for points more than about 46,000 apart.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        Fixed::saturating_from_num(self.wide_distance_squared(other))
    }

    /// Euclidean distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Whether `other` lies within `radius` of this point (inclusive).
    #[must_use]
    pub fn within(self, other: Self, radius: Fixed) -> bool {
        let radius = Wide::from_num(radius);
        self.wide_distance_squared(other) <= radius.saturating_mul(radius)
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Step toward `target` by at most `max_step`, landing exactly on it
    /// when it is closer than that.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        if max_step <= Fixed::ZERO {
            return self;
        }
        if self.within(target, max_step) {
            return target;
        }
        self + (target - self).normalize().scale(max_step)
    }

    /// Step along the x axis only, toward `target_x`, never overshooting it.
    #[must_use]
    pub fn move_towards_x(self, target_x: Fixed, max_step: Fixed) -> Self {
        if max_step <= Fixed::ZERO {
            return self;
        }
        let dx = target_x - self.x;
        let x = if dx.abs() <= max_step {
            target_x
        } else {
            self.x + max_step * dx.signum()
        };
        Self::new(x, self.y)
    }
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: i32, y: i32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    #[test]
    fn test_vec2_distance_squared() {
        // 3² + 4² = 25
        assert_eq!(v(3, 0).distance_squared(v(0, 4)), Fixed::from_num(25));
    }

    #[test]
    fn test_vec2_distance() {
        let d = v(3, 0).distance(v(0, 4));
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((d - Fixed::from_num(5)).abs() < epsilon, "got {d}");
    }

    #[test]
    fn test_within_is_inclusive() {
        assert!(v(0, 0).within(v(1, 0), Fixed::ONE));
        assert!(!v(0, 0).within(v(2, 0), Fixed::ONE));
    }

    #[test]
    fn test_far_points_do_not_overflow() {
        let west = v(-60_000, 0);
        let east = v(60_000, 0);
        assert_eq!(west.distance_squared(east), Fixed::MAX);
        assert!(!west.within(east, Fixed::from_num(100_000)));
        assert!(west.within(east, Fixed::from_num(120_000)));
        assert!(v(0, 0).within(v(3, 4), Fixed::from_num(100_000)));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = v(3, 4).normalize();
        let len_sq = norm.dot(norm);
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((len_sq - Fixed::ONE).abs() < epsilon, "got {len_sq:?}");

        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon, "direction not preserved");
    }

    #[test]
    fn test_move_towards_x_does_not_overshoot() {
        let start = v(0, 2);
        assert_eq!(start.move_towards_x(Fixed::from_num(1), Fixed::from_num(3)), v(1, 2));
        assert_eq!(start.move_towards_x(Fixed::from_num(10), Fixed::from_num(3)), v(3, 2));
        assert_eq!(start.move_towards_x(Fixed::from_num(-10), Fixed::from_num(3)), v(-3, 2));
    }

    #[test]
    fn test_move_towards_lands_on_close_target() {
        assert_eq!(v(0, 0).move_towards(v(1, 1), Fixed::from_num(5)), v(1, 1));
        let moved = v(0, 0).move_towards(v(10, 0), Fixed::from_num(2));
        assert_eq!(moved, v(2, 0));
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }
}
