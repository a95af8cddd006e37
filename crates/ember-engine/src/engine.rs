//! The host-facing engine object.
//!
//! [`Engine`] ties the pieces together: it owns the [`GameLoop`], the scene
//! registry, the [`LayerMatrix`] and the keyboard collaborator. A host feeds
//! it key events and clock readings; everything else happens inside
//! [`Engine::frame`]:
//!
//! ```
//! use ember_engine::prelude::*;
//! use ember_engine::visual::RenderFrame;
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! engine.create_scene("menu").unwrap();
//! engine.load_scene("menu").unwrap();
//! engine.start(0.0);
//!
//! let mut frames = 0;
//! let mut sink = |_: &RenderFrame| frames += 1;
//! let report = engine.frame(0.06, &mut sink);
//!
//! assert_eq!(report.steps, 3);
//! assert_eq!(frames, 1);
//! ```

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use ember_ecs::input::KeyboardState;
use tracing::{debug, warn};

use crate::config::{EngineConfig, InputEdges};
use crate::layers::{LayerMatrix, LayerRef};
use crate::scene::Scene;
use crate::tick::{FrameReport, GameLoop, LoopState};
use crate::visual::{RenderFrame, RenderSink};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    game_loop: GameLoop,
    scenes: BTreeMap<String, Scene>,
    active: Option<String>,
    layers: LayerMatrix,
    input: KeyboardState,
}

impl Engine {
    /// Build an engine from `config`. Layer rule overrides that name unknown
    /// layers are logged and skipped.
    ///
    /// # Panics
    ///
    /// Panics if `config.fixed_dt` is not positive and finite (see
    /// [`GameLoop::new`]). Use [`EngineConfig::validate`] first for
    /// untrusted configs.
    pub fn new(config: EngineConfig) -> Self {
        let mut layers = LayerMatrix::with_defaults();
        let rejected = layers.apply_rules(&config.layer_rules);
        if !rejected.is_empty() {
            warn!(count = rejected.len(), "some configured layer rules were ignored");
        }
        Self {
            game_loop: GameLoop::from_config(&config),
            config,
            scenes: BTreeMap::new(),
            active: None,
            layers,
            input: KeyboardState::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -- loop control -------------------------------------------------------

    pub fn start(&mut self, now: f64) {
        self.game_loop.start(now);
    }

    pub fn stop(&mut self) {
        self.game_loop.stop();
    }

    pub fn pause(&mut self) {
        self.game_loop.pause();
    }

    pub fn resume(&mut self, now: f64) {
        self.game_loop.resume(now);
    }

    pub fn state(&self) -> LoopState {
        self.game_loop.state()
    }

    pub fn game_loop(&self) -> &GameLoop {
        &self.game_loop
    }

    /// One host callback: run the due fixed steps on the active scene, then
    /// render once. A stopped engine does nothing; a paused one renders
    /// without stepping.
    pub fn frame(&mut self, now: f64, sink: &mut dyn RenderSink) -> FrameReport {
        if self.game_loop.state() == LoopState::Stopped {
            return FrameReport::default();
        }

        let per_step = self.config.input_edges == InputEdges::PerStep;
        let Self {
            game_loop,
            scenes,
            active,
            layers,
            input,
            ..
        } = self;
        let mut scene = active.as_deref().and_then(|name| scenes.get_mut(name));

        let report = game_loop.frame(now, |dt| {
            if let Some(scene) = scene.as_deref_mut() {
                scene.fixed_update(dt, &*input, layers);
            }
            if per_step {
                input.advance();
            }
        });
        if !per_step {
            input.advance();
        }

        let frame = match scene {
            Some(scene) => scene.render_frame(report.alpha),
            None => RenderFrame::new(game_loop.tick_count(), report.alpha, Vec::new()),
        };
        sink.render(&frame);
        report
    }

    /// Run one fixed step on the active scene immediately, regardless of
    /// loop state, then advance input edges.
    pub fn step(&mut self) {
        let Self {
            game_loop,
            scenes,
            active,
            layers,
            input,
            ..
        } = self;
        let scene = active.as_deref().and_then(|name| scenes.get_mut(name));
        game_loop.step_once(|dt| {
            if let Some(scene) = scene {
                scene.fixed_update(dt, &*input, layers);
            }
        });
        input.advance();
    }

    pub fn run_steps(&mut self, count: u64) {
        for _ in 0..count {
            self.step();
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.game_loop.tick_count()
    }

    pub fn sim_time(&self) -> f64 {
        self.game_loop.sim_time()
    }

    // -- scenes -------------------------------------------------------------

    /// Register an empty scene and return it for population.
    pub fn create_scene(&mut self, name: &str) -> Result<&mut Scene, EngineError> {
        match self.scenes.entry(name.to_owned()) {
            Entry::Occupied(_) => {
                warn!(scene = name, "scene already registered");
                Err(EngineError::DuplicateScene {
                    name: name.to_owned(),
                })
            }
            Entry::Vacant(slot) => {
                debug!(scene = name, "scene created");
                Ok(slot.insert(Scene::new(name, &self.config)))
            }
        }
    }

    /// Register a scene built elsewhere.
    pub fn add_scene(&mut self, scene: Scene) -> Result<(), EngineError> {
        let name = scene.name().to_owned();
        match self.scenes.entry(name) {
            Entry::Occupied(slot) => {
                warn!(scene = %slot.key(), "scene already registered");
                Err(EngineError::DuplicateScene {
                    name: slot.key().clone(),
                })
            }
            Entry::Vacant(slot) => {
                slot.insert(scene);
                Ok(())
            }
        }
    }

    /// Unregister a scene and hand it back. Removing the active scene leaves
    /// no scene loaded.
    pub fn remove_scene(&mut self, name: &str) -> Result<Scene, EngineError> {
        let Some(scene) = self.scenes.remove(name) else {
            warn!(scene = name, "remove of unknown scene ignored");
            return Err(EngineError::UnknownScene {
                name: name.to_owned(),
            });
        };
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Ok(scene)
    }

    /// Unregister a scene and tear it down (timers, pairs, entities).
    pub fn destroy_scene(&mut self, name: &str) -> Result<(), EngineError> {
        let mut scene = self.remove_scene(name)?;
        scene.destroy();
        Ok(())
    }

    /// Make `name` the scene that steps and renders, starting it if needed.
    /// The previously active scene is left as it was.
    pub fn load_scene(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(scene) = self.scenes.get_mut(name) else {
            warn!(scene = name, "load of unknown scene ignored");
            return Err(EngineError::UnknownScene {
                name: name.to_owned(),
            });
        };
        scene.start();
        self.active = Some(name.to_owned());
        debug!(scene = name, "scene loaded");
        Ok(())
    }

    pub fn active_scene_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.active.as_deref().and_then(|name| self.scenes.get(name))
    }

    pub fn active_scene_mut(&mut self) -> Option<&mut Scene> {
        let name = self.active.as_deref()?;
        self.scenes.get_mut(name)
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Registered scene names, sorted.
    pub fn scene_names(&self) -> Vec<&str> {
        self.scenes.keys().map(String::as_str).collect()
    }

    /// Digest of the active scene's state.
    pub fn state_hash(&self) -> Result<String, EngineError> {
        self.active_scene()
            .map(Scene::state_hash)
            .ok_or(EngineError::NoActiveScene)
    }

    // -- collision rules ----------------------------------------------------

    pub fn set_collision_rule(
        &mut self,
        a: impl Into<LayerRef>,
        b: impl Into<LayerRef>,
        allowed: bool,
    ) -> Result<(), EngineError> {
        self.layers.set_rule(a, b, allowed)
    }

    pub fn can_collide(&self, a: impl Into<LayerRef>, b: impl Into<LayerRef>) -> bool {
        self.layers.can_collide_ref(a, b)
    }

    pub fn layers(&self) -> &LayerMatrix {
        &self.layers
    }

    // -- input / debug ------------------------------------------------------

    pub fn input(&self) -> &KeyboardState {
        &self.input
    }

    /// Feed host key events here.
    pub fn input_mut(&mut self) -> &mut KeyboardState {
        &mut self.input
    }

    /// Toggle per-tick collision diagnostics on every scene.
    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
        for scene in self.scenes.values_mut() {
            scene.set_debug(debug);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
