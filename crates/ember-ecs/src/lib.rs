//! Ember ECS -- entity/component container model for the Ember 2D engine.
//!
//! A [`GameObject`](object::GameObject) owns a transform and an ordered list
//! of polymorphic [`Component`](component::Component)s. Components are looked
//! up by concrete type or by [`Capability`](component::Capability), dispatched
//! through a fixed lifecycle (awake, start, update, late update, destroy), and
//! talk to the rest of the scene through a FIFO
//! [`CommandBuffer`](command::CommandBuffer).
//!
//! # Quick Start
//!
//! ```
//! use ember_ecs::prelude::*;
//!
//! struct Spin { speed: f64 }
//!
//! impl Component for Spin {
//!     fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) -> ComponentResult {
//!         ctx.transform.rotation += self.speed * dt;
//!         Ok(())
//!     }
//! }
//!
//! let mut hero = GameObject::new("hero");
//! hero.add_component(Spin { speed: 2.0 });
//! hero.start();
//! hero.update(0.5, &NoInput);
//!
//! assert_eq!(hero.transform.rotation, 1.0);
//! assert!(hero.has_component::<Spin>());
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod component;
pub mod entity;
pub mod input;
pub mod object;
pub mod transform;
pub mod vector;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by entity/component operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EcsError {
    /// No entity with this id is registered where it was looked up.
    #[error("entity {entity} does not exist")]
    UnknownEntity { entity: entity::EntityId },

    /// The entity's owning-scene back-reference is already set.
    #[error("entity {entity} already belongs to {scene}")]
    AlreadyAttached {
        entity: entity::EntityId,
        scene: entity::SceneId,
    },

    /// The entity carries no component matching the request.
    #[error("entity {entity} has no component '{component}'")]
    ComponentNotFound {
        entity: entity::EntityId,
        component: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{CommandBuffer, SceneCommand};
    pub use crate::component::{
        AsAny, Capability, Collision, Component, ComponentContext, ComponentError, ComponentKey,
        ComponentResult,
    };
    pub use crate::entity::{ComponentId, EntityId, SceneId};
    pub use crate::input::{InputState, KeyboardState, NoInput};
    pub use crate::object::{CollisionPhase, GameObject};
    pub use crate::transform::Transform;
    pub use crate::vector::Vector2;
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
