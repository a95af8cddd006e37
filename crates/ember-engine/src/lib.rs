//! Ember Engine -- fixed-timestep simulation kernel for 2D games.
//!
//! This crate builds on [`ember_ecs`] to provide the simulation driver: a
//! fixed-timestep [`GameLoop`](tick::GameLoop), scenes that own entities in an
//! arena, AABB collision with a quad-tree broad-phase and a persistent
//! enter/stay/exit pair state machine, layer-based collision filtering, and a
//! configurable [`PlayerController`](controller::PlayerController).
//!
//! # Quick Start
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! let scene = engine.create_scene("level-1").unwrap();
//! scene
//!     .spawn("floor")
//!     .at(0.0, 100.0)
//!     .with_collider(Collider::new(400.0, 20.0).with_layer("platform"))
//!     .build()
//!     .unwrap();
//! engine.load_scene("level-1").unwrap();
//!
//! engine.run_steps(10);
//! assert_eq!(engine.tick_count(), 10);
//! ```

#![deny(unsafe_code)]

pub mod audio;
pub mod builder;
pub mod collider;
pub mod config;
pub mod controller;
pub mod engine;
pub mod layers;
pub mod physics;
pub mod scene;
pub mod snapshot;
pub mod spatial;
pub mod state_machine;
pub mod tick;
pub mod tilemap;
pub mod visual;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use ember_ecs;

use ember_ecs::EcsError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Configuration errors raised by the engine surface.
///
/// Every operation that returns one of these has already logged it and left
/// engine state untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no scene named '{name}'")]
    UnknownScene { name: String },

    #[error("a scene named '{name}' is already registered")]
    DuplicateScene { name: String },

    #[error("unknown collision layer '{name}'")]
    UnknownLayer { name: String },

    #[error("collision layer index {index} is out of range")]
    UnknownLayerIndex { index: usize },

    #[error("state machine has no state '{state}'")]
    UnknownState { state: String },

    #[error("entity {entity} is already owned by this scene")]
    EntityAlreadyOwned { entity: ember_ecs::entity::EntityId },

    #[error("no scene is loaded")]
    NoActiveScene,

    #[error("snapshot hash mismatch: recorded {recorded}, computed {computed}")]
    SnapshotMismatch { recorded: String, computed: String },

    #[error("invalid config: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("failed to parse config: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Meant for binaries and demos; the library itself never installs one.
/// Calling it twice is harmless.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Re-export everything from the ECS prelude.
    pub use ember_ecs::prelude::*;

    pub use crate::audio::AudioSource;
    pub use crate::builder::EntityBuilder;
    pub use crate::collider::{Collider, ColliderShape};
    pub use crate::config::{EngineConfig, InputEdges};
    pub use crate::controller::{
        Boundary, BoundaryMode, KeyBindings, Movement, MovementType, PlayerController,
        PlayerState,
    };
    pub use crate::engine::Engine;
    pub use crate::layers::{Layer, LayerMatrix, LayerRef, LayerRule};
    pub use crate::physics::{CollisionEvent, CollisionWorld, Contact, PairKey, StepStats};
    pub use crate::scene::{Scene, TimerId};
    pub use crate::snapshot::{EntitySnapshot, SceneSnapshot};
    pub use crate::spatial::{QuadTree, Rect};
    pub use crate::state_machine::{State, StateMachine};
    pub use crate::tick::{FrameReport, GameLoop, LoopState, TickDiagnostics};
    pub use crate::tilemap::Tilemap;
    pub use crate::visual::{
        Appearance, Color, NullSink, RenderFrame, RenderItem, RenderSink, Visual,
    };
    pub use crate::EngineError;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        let err = EngineError::UnknownLayer {
            name: "lava".to_owned(),
        };
        assert_eq!(err.to_string(), "unknown collision layer 'lava'");

        let err = EngineError::DuplicateScene {
            name: "menu".to_owned(),
        };
        assert_eq!(err.to_string(), "a scene named 'menu' is already registered");
    }

    #[test]
    fn ecs_errors_convert() {
        let entity = ember_ecs::entity::EntityId::from_raw(9);
        let inner = EcsError::UnknownEntity { entity };
        let err: EngineError = inner.into();
        assert_eq!(err.to_string(), "entity #9 does not exist");
    }
}
