//! The [`Collider`] component.

use std::collections::BTreeSet;

use ember_ecs::component::{Capability, Component};
use ember_ecs::entity::EntityId;
use ember_ecs::transform::Transform;
use ember_ecs::vector::Vector2;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layers::Layer;
use crate::spatial::Rect;
use crate::EngineError;

/// Shape tag. Only box behavior exists; a circle collides as its bounding
/// box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColliderShape {
    #[default]
    Box,
    Circle,
}

/// Axis-aligned collision volume attached to an entity.
///
/// The layer label is resolved when it is set. A label naming no layer is
/// logged and leaves the collider unresolved, and an unresolved collider
/// takes part in no collisions.
#[derive(Debug, Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Half width and half height before the transform's scale.
    pub half_extents: Vector2,
    /// Center offset from the entity position, before scale.
    pub offset: Vector2,
    /// Triggers report contacts but are never pushed apart.
    pub is_trigger: bool,
    layer_label: String,
    layer: Option<Layer>,
    currently_colliding: BTreeSet<EntityId>,
    previous_collisions: BTreeSet<EntityId>,
}

impl Collider {
    /// A solid box of the given full size on the `default` layer.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            shape: ColliderShape::Box,
            half_extents: Vector2::new(width / 2.0, height / 2.0),
            offset: Vector2::ZERO,
            is_trigger: false,
            layer_label: Layer::Default.name().to_owned(),
            layer: Some(Layer::Default),
            currently_colliding: BTreeSet::new(),
            previous_collisions: BTreeSet::new(),
        }
    }

    /// A circle tag with the given radius.
    pub fn circle(radius: f64) -> Self {
        Self {
            shape: ColliderShape::Circle,
            ..Self::new(radius * 2.0, radius * 2.0)
        }
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.offset = Vector2::new(x, y);
        self
    }

    /// Builder form of [`set_layer`](Self::set_layer); an unknown label is
    /// logged and kept unresolved.
    pub fn with_layer(mut self, label: &str) -> Self {
        let _ = self.set_layer(label);
        self
    }

    pub fn set_layer(&mut self, label: &str) -> Result<Layer, EngineError> {
        self.layer_label = label.to_owned();
        self.layer = Layer::from_name(label);
        self.layer.ok_or_else(|| {
            warn!(layer = label, "collider layer does not exist; collider will not collide");
            EngineError::UnknownLayer {
                name: label.to_owned(),
            }
        })
    }

    pub fn layer(&self) -> Option<Layer> {
        self.layer
    }

    pub fn layer_label(&self) -> &str {
        &self.layer_label
    }

    /// World-space bounds for an owner with `transform`.
    pub fn bounds(&self, transform: &Transform) -> Rect {
        let scale = Vector2::new(transform.scale.x.abs(), transform.scale.y.abs());
        let center = transform.position + self.offset.mul(transform.scale);
        Rect::from_center(center, self.half_extents.mul(scale))
    }

    /// Entities touching this collider during the last physics tick.
    pub fn currently_colliding(&self) -> &BTreeSet<EntityId> {
        &self.currently_colliding
    }

    /// Entities touching this collider the tick before.
    pub fn previous_collisions(&self) -> &BTreeSet<EntityId> {
        &self.previous_collisions
    }

    pub fn is_touching(&self, other: EntityId) -> bool {
        self.currently_colliding.contains(&other)
    }

    /// Entities that stopped touching this collider on the last tick.
    pub fn exited(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.previous_collisions
            .difference(&self.currently_colliding)
            .copied()
    }

    /// Roll the touching sets at the start of a physics tick.
    pub(crate) fn begin_tick(&mut self) {
        self.previous_collisions = std::mem::take(&mut self.currently_colliding);
    }

    pub(crate) fn mark_touching(&mut self, other: EntityId) {
        self.currently_colliding.insert(other);
    }
}

impl Component for Collider {
    fn type_name(&self) -> &'static str {
        "Collider"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Collider]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_follow_transform_scale_and_offset() {
        let collider = Collider::new(10.0, 4.0).with_offset(1.0, 0.0);
        let mut transform = Transform::at(100.0, 50.0);
        transform.scale = Vector2::new(2.0, -1.0);

        let b = collider.bounds(&transform);
        assert_eq!(b.center(), Vector2::new(102.0, 50.0));
        assert_eq!(b.width(), 20.0);
        assert_eq!(b.height(), 4.0);
    }

    #[test]
    fn circle_is_its_bounding_box() {
        let c = Collider::circle(3.0);
        assert_eq!(c.shape, ColliderShape::Circle);
        assert_eq!(c.bounds(&Transform::default()), Rect::new(-3.0, -3.0, 6.0, 6.0));
    }

    #[test]
    fn unknown_layer_stays_unresolved() {
        let mut c = Collider::new(1.0, 1.0);
        assert_eq!(c.set_layer("Player").unwrap(), Layer::Player);
        assert!(c.set_layer("lava").is_err());
        assert_eq!(c.layer(), None);
        assert_eq!(c.layer_label(), "lava");
    }

    #[test]
    fn exited_is_previous_minus_current() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        let mut c = Collider::new(1.0, 1.0);
        c.mark_touching(a);
        c.mark_touching(b);
        c.begin_tick();
        c.mark_touching(b);

        assert!(c.is_touching(b));
        assert!(!c.is_touching(a));
        assert_eq!(c.exited().collect::<Vec<_>>(), vec![a]);
    }
}
