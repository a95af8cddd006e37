//! Fluent entity construction.
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! let mut scene = Scene::new("demo", &EngineConfig::default());
//! let hero = scene
//!     .spawn("hero")
//!     .at(100.0, 50.0)
//!     .with_visual(Visual::rect(16.0, 24.0, Color::WHITE))
//!     .with_collider(Collider::new(16.0, 24.0).with_layer("player"))
//!     .with_controller(PlayerController::platformer())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(scene.find_by_name("hero"), Some(hero));
//! ```

use ember_ecs::component::Component;
use ember_ecs::entity::EntityId;
use ember_ecs::object::GameObject;
use ember_ecs::vector::Vector2;

use crate::audio::AudioSource;
use crate::collider::Collider;
use crate::controller::PlayerController;
use crate::scene::Scene;
use crate::state_machine::StateMachine;
use crate::tilemap::Tilemap;
use crate::visual::Visual;
use crate::EngineError;

/// Collects a transform and components, then registers the entity with
/// [`build`](Self::build). Dropping the builder without building discards
/// the entity.
#[must_use = "the entity is only registered by build()"]
pub struct EntityBuilder<'s> {
    scene: &'s mut Scene,
    object: GameObject,
}

impl<'s> EntityBuilder<'s> {
    pub(crate) fn new(scene: &'s mut Scene, name: &str) -> Self {
        Self {
            scene,
            object: GameObject::new(name),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.object.transform.position = Vector2::new(x, y);
        self
    }

    pub fn rotation(mut self, radians: f64) -> Self {
        self.object.transform.rotation = radians;
        self
    }

    pub fn scale(mut self, x: f64, y: f64) -> Self {
        self.object.transform.scale = Vector2::new(x, y);
        self
    }

    pub fn with_visual(self, visual: Visual) -> Self {
        self.with_component(visual)
    }

    pub fn with_collider(self, collider: Collider) -> Self {
        self.with_component(collider)
    }

    pub fn with_controller(self, controller: PlayerController) -> Self {
        self.with_component(controller)
    }

    pub fn with_state_machine(self, machine: StateMachine) -> Self {
        self.with_component(machine)
    }

    pub fn with_tilemap(self, tilemap: Tilemap) -> Self {
        self.with_component(tilemap)
    }

    pub fn with_audio(self, source: AudioSource) -> Self {
        self.with_component(source)
    }

    /// Attach any component. `awake` fires now.
    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.object.add_component(component);
        self
    }

    /// Register the entity deactivated.
    pub fn inactive(mut self) -> Self {
        self.object.set_active(false);
        self
    }

    /// Hand the entity to the scene.
    pub fn build(self) -> Result<EntityId, EngineError> {
        self.scene.add_entity(self.object)
    }
}
