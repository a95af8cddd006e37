//! Position, rotation and scale of an entity.

use serde::{Deserialize, Serialize};

use crate::vector::Vector2;

/// Spatial state of a [`GameObject`](crate::object::GameObject).
///
/// `position` is the entity's center. `rotation` is in radians and only
/// consumed by controllers and renderers; collision is axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector2,
    pub rotation: f64,
    pub scale: Vector2,
}

impl Transform {
    /// Identity transform placed at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Vector2::new(x, y),
            ..Default::default()
        }
    }

    /// Move by `delta`.
    pub fn translate(&mut self, delta: Vector2) {
        self.position = self.position + delta;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector2::ZERO,
            rotation: 0.0,
            scale: Vector2::ONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.position, Vector2::ZERO);
        assert_eq!(t.rotation, 0.0);
        assert_eq!(t.scale, Vector2::ONE);
    }

    #[test]
    fn translate_moves_position() {
        let mut t = Transform::at(1.0, 1.0);
        t.translate(Vector2::new(2.0, -3.0));
        assert_eq!(t.position, Vector2::new(3.0, -2.0));
    }
}
