//! 2D vector math.
//!
//! [`Vector2`] is a plain `Copy` value: every arithmetic operation returns a
//! new vector and leaves its operands untouched. [`Vector2::set`] is the only
//! operation that writes through `&mut self`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Vector2
// ---------------------------------------------------------------------------

/// A 2D vector of `f64` components. Screen convention: `+y` points down.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vector2 {
    /// The zero vector.
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };
    /// The `(1, 1)` vector, used as the identity scale.
    pub const ONE: Vector2 = Vector2 { x: 1.0, y: 1.0 };

    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    pub const fn one() -> Self {
        Self::ONE
    }

    /// Overwrite this vector's fields in place.
    #[inline]
    pub fn set(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    #[inline]
    pub fn add(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    #[inline]
    pub fn sub(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x - other.x, self.y - other.y)
    }

    /// Multiply both components by a scalar.
    #[inline]
    pub fn scale(self, factor: f64) -> Vector2 {
        Vector2::new(self.x * factor, self.y * factor)
    }

    /// Component-wise product.
    #[inline]
    pub fn mul(self, other: Vector2) -> Vector2 {
        Vector2::new(self.x * other.x, self.y * other.y)
    }

    #[inline]
    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn magnitude_squared(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    pub fn magnitude(self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    /// Euclidean distance between two points.
    #[inline]
    pub fn distance(self, other: Vector2) -> f64 {
        self.sub(other).magnitude()
    }

    /// Unit vector in the same direction. Returns [`Vector2::ZERO`] for a
    /// zero-length input instead of dividing by zero.
    pub fn normalize(self) -> Vector2 {
        let len = self.magnitude();
        if len == 0.0 {
            Vector2::ZERO
        } else {
            Vector2::new(self.x / len, self.y / len)
        }
    }

    /// Linear interpolation: `t = 0` gives `self`, `t = 1` gives `other`.
    #[inline]
    pub fn lerp(self, other: Vector2, t: f64) -> Vector2 {
        self.add(other.sub(self).scale(t))
    }

    /// Unit vector pointing along `angle` radians (0 = +x, clockwise on screen).
    #[inline]
    pub fn from_angle(angle: f64) -> Vector2 {
        Vector2::new(angle.cos(), angle.sin())
    }

    /// Whether both components are finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl fmt::Debug for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2({}, {})", self.x, self.y)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::add(self, rhs)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::sub(self, rhs)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        self.scale(rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        *self = Vector2::add(*self, rhs);
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        *self = Vector2::sub(*self, rhs);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_returns_new_values() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, -4.0);
        assert_eq!(a + b, Vector2::new(4.0, -2.0));
        assert_eq!(a - b, Vector2::new(-2.0, 6.0));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));
        // Operands are untouched.
        assert_eq!(a, Vector2::new(1.0, 2.0));
        assert_eq!(b, Vector2::new(3.0, -4.0));
    }

    #[test]
    fn dot_magnitude_distance() {
        let a = Vector2::new(3.0, 4.0);
        assert_eq!(a.magnitude(), 5.0);
        assert_eq!(a.dot(Vector2::new(1.0, 0.0)), 3.0);
        assert_eq!(Vector2::ZERO.distance(a), 5.0);
    }

    #[test]
    fn normalize_zero_is_zero() {
        assert_eq!(Vector2::ZERO.normalize(), Vector2::ZERO);
        let n = Vector2::new(0.0, -10.0).normalize();
        assert_eq!(n, Vector2::new(0.0, -1.0));
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut v = Vector2::new(1.0, 1.0);
        v.set(7.0, 8.0);
        assert_eq!(v, Vector2::new(7.0, 8.0));
    }

    #[test]
    fn lerp_endpoints() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(10.0, 20.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vector2::new(5.0, 10.0));
    }
}
