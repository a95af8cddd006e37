//! The [`Component`] trait and its lookup keys.
//!
//! Components are polymorphic units of behavior attached to a
//! [`GameObject`](crate::object::GameObject). They can be looked up two ways:
//!
//! - by concrete Rust type (`get_component::<Collider>()`), and
//! - by [`Capability`], a small closed set of cross-cutting roles such as
//!   "is a collider" or "is a controller". A component advertises the
//!   capabilities it fulfils; any number of concrete types may share one.
//!
//! Both lookups share a single cache keyed by [`ComponentKey`].

use std::any::{Any, TypeId};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::CommandBuffer;
use crate::entity::EntityId;
use crate::input::InputState;
use crate::transform::Transform;

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// Cross-cutting roles a component can fulfil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Participates in collision detection.
    Collider,
    /// Turns input into movement.
    Controller,
    /// Produces data for the render collaborator.
    Visual,
    /// Drives named behavior states.
    StateMachine,
    /// Tile grid data.
    Tilemap,
    /// Sound emitter data for the audio collaborator.
    Audio,
    /// Free-form gameplay behavior.
    Script,
}

// ---------------------------------------------------------------------------
// ComponentKey
// ---------------------------------------------------------------------------

/// Cache key: either an exact Rust type or a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKey {
    Type(TypeId),
    Capability(Capability),
}

impl ComponentKey {
    pub fn of<T: Component>() -> Self {
        ComponentKey::Type(TypeId::of::<T>())
    }

    /// Whether `component` satisfies this key.
    pub fn matches(&self, component: &dyn Component) -> bool {
        match self {
            ComponentKey::Type(id) => component.as_any().type_id() == *id,
            ComponentKey::Capability(cap) => component.capabilities().contains(cap),
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentError
// ---------------------------------------------------------------------------

/// A fault raised from inside a component hook.
///
/// The dispatcher logs it with the component's type and the entity name and
/// carries on with the remaining components.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ComponentError {
    pub message: String,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type returned by every component hook.
pub type ComponentResult = Result<(), ComponentError>;

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

/// What a component learns about the other side of a collision.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    /// The entity collided with.
    pub other: EntityId,
    /// Name of the other entity.
    pub other_name: String,
    /// Layer label of the other collider.
    pub other_layer: String,
    /// Whether either collider in the pair is a trigger.
    pub is_trigger: bool,
}

// ---------------------------------------------------------------------------
// ComponentContext
// ---------------------------------------------------------------------------

/// Everything a component may touch while one of its hooks runs.
pub struct ComponentContext<'a> {
    /// The owning entity.
    pub entity: EntityId,
    /// The owning entity's name.
    pub name: &'a str,
    /// The owning entity's transform.
    pub transform: &'a mut Transform,
    /// Input device view.
    pub input: &'a dyn InputState,
    /// Outbox for mutations that reach beyond this entity.
    pub commands: &'a mut CommandBuffer,
}

impl fmt::Debug for ComponentContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("entity", &self.entity)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// Upcast helper so `dyn Component` can be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of behavior attached to one entity.
///
/// Every hook has a no-op default. Lifecycle order is `awake` (at attach),
/// `start` (once the entity is in a started scene), then per fixed step
/// `update` and, after every entity has updated, `late_update`. `on_destroy`
/// runs when the component is removed or its entity destroyed.
#[allow(unused_variables)]
pub trait Component: AsAny {
    /// Name used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capabilities this component fulfils. Must be constant for the
    /// component's lifetime; the lookup cache depends on it.
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    fn awake(&mut self, ctx: &mut ComponentContext<'_>) -> ComponentResult {
        Ok(())
    }

    fn start(&mut self, ctx: &mut ComponentContext<'_>) -> ComponentResult {
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) -> ComponentResult {
        Ok(())
    }

    fn late_update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) -> ComponentResult {
        Ok(())
    }

    fn on_destroy(&mut self, ctx: &mut ComponentContext<'_>) -> ComponentResult {
        Ok(())
    }

    fn on_message(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        name: &str,
        data: &serde_json::Value,
    ) -> ComponentResult {
        Ok(())
    }

    /// First tick of an overlap.
    fn on_collision_enter(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        collision: &Collision,
    ) -> ComponentResult {
        Ok(())
    }

    /// Every tick the overlap holds, including the first.
    fn on_collision(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        collision: &Collision,
    ) -> ComponentResult {
        Ok(())
    }

    /// First tick after the overlap ended.
    fn on_collision_exit(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        collision: &Collision,
    ) -> ComponentResult {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;
    impl Component for Plain {}

    struct Hitbox;
    impl Component for Hitbox {
        fn capabilities(&self) -> &'static [Capability] {
            &[Capability::Collider]
        }
    }

    #[test]
    fn type_key_matches_only_exact_type() {
        let plain: Box<dyn Component> = Box::new(Plain);
        let hitbox: Box<dyn Component> = Box::new(Hitbox);
        let key = ComponentKey::of::<Plain>();
        assert!(key.matches(plain.as_ref()));
        assert!(!key.matches(hitbox.as_ref()));
    }

    #[test]
    fn capability_key_matches_advertised_roles() {
        let hitbox: Box<dyn Component> = Box::new(Hitbox);
        assert!(ComponentKey::Capability(Capability::Collider).matches(hitbox.as_ref()));
        assert!(!ComponentKey::Capability(Capability::Visual).matches(hitbox.as_ref()));
    }

    #[test]
    fn default_type_name_is_concrete() {
        let hitbox: Box<dyn Component> = Box::new(Hitbox);
        assert!(hitbox.type_name().ends_with("Hitbox"));
    }
}
