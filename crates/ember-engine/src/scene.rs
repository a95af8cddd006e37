//! Scenes: the entity arena for one level.
//!
//! A [`Scene`] owns its [`GameObject`]s by value, in insertion order, and
//! drives them through a fixed simulation step:
//!
//! 1. Timers advance; due callbacks queue commands.
//! 2. Every active entity runs `update`.
//! 3. Every active entity runs `late_update`.
//! 4. The [`CollisionWorld`] runs broad-phase, narrow-phase, pair state,
//!    resolution and ground sensing.
//! 5. Collision events are delivered to both sides.
//!
//! After each of phases 1, 2, 3 and 5, queued [`SceneCommand`]s are applied
//! in FIFO order (commands queued while applying go to the back of the
//! queue). Components never touch other entities directly.

use std::collections::VecDeque;
use std::fmt;

use ember_ecs::command::{CommandBuffer, SceneCommand};
use ember_ecs::component::{Capability, Component};
use ember_ecs::entity::{EntityId, SceneId};
use ember_ecs::input::InputState;
use ember_ecs::object::GameObject;
use ember_ecs::EcsError;
use tracing::{debug, warn};

use crate::audio::{AudioRequest, AudioSource};
use crate::builder::EntityBuilder;
use crate::collider::Collider;
use crate::config::EngineConfig;
use crate::layers::LayerMatrix;
use crate::physics::{CollisionEvent, CollisionWorld};
use crate::spatial::Rect;
use crate::tilemap::Tilemap;
use crate::visual::{RenderFrame, RenderItem, Visual};
use crate::EngineError;

/// Upper bound on commands applied in one flush. Guards against components
/// that answer every message with another message.
const MAX_COMMANDS_PER_FLUSH: usize = 10_000;

/// Slack when comparing a timer's remaining time against zero, so a delay
/// that is a whole number of non-dyadic steps still fires on time.
const TIMER_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

type TimerFn = Box<dyn FnMut(&mut CommandBuffer)>;

struct Timer {
    id: TimerId,
    interval: f64,
    remaining: f64,
    repeat: bool,
    callback: TimerFn,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

pub struct Scene {
    id: SceneId,
    name: String,
    objects: Vec<GameObject>,
    physics: CollisionWorld,
    timers: Vec<Timer>,
    next_timer: u64,
    started: bool,
    tick: u64,
    last_events: Vec<CollisionEvent>,
    /// Requests from sources that were destroyed before the host drained
    /// them.
    orphaned_audio: Vec<(EntityId, AudioRequest)>,
    debug: bool,
}

impl Scene {
    pub fn new(name: &str, config: &EngineConfig) -> Self {
        Self {
            id: SceneId::generate(),
            name: name.to_owned(),
            objects: Vec::new(),
            physics: CollisionWorld::new(config),
            timers: Vec::new(),
            next_timer: 0,
            started: false,
            tick: 0,
            last_events: Vec::new(),
            orphaned_audio: Vec::new(),
            debug: config.debug,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed steps this scene has simulated.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
        self.physics.set_debug(debug);
    }

    pub fn physics(&self) -> &CollisionWorld {
        &self.physics
    }

    /// Events produced by the most recent physics step.
    pub fn last_events(&self) -> &[CollisionEvent] {
        &self.last_events
    }

    // -- entities -----------------------------------------------------------

    /// Start building an entity that registers into this scene on
    /// [`build`](EntityBuilder::build).
    pub fn spawn(&mut self, name: &str) -> EntityBuilder<'_> {
        EntityBuilder::new(self, name)
    }

    /// Take ownership of `object`. If the scene has started, the entity
    /// starts immediately.
    ///
    /// An entity whose id is already here, or that already belongs to a
    /// scene, is rejected and dropped.
    pub fn add_entity(&mut self, mut object: GameObject) -> Result<EntityId, EngineError> {
        let id = object.id();
        if self.contains(id) {
            warn!(entity = %id, scene = %self.name, "entity already in scene; add ignored");
            return Err(EngineError::EntityAlreadyOwned { entity: id });
        }
        object.attach_to_scene(self.id)?;
        debug!(entity = %id, name = object.name(), scene = %self.name, "entity added");
        let start_now = self.started;
        self.objects.push(object);
        if start_now {
            if let Some(obj) = self.objects.last_mut() {
                obj.start();
            }
            self.flush_commands();
        }
        Ok(id)
    }

    /// Destroy an entity now: fire its `on_destroy` hooks, drop it, and apply
    /// whatever its components queued while going.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<(), EngineError> {
        let mut queue = VecDeque::new();
        if !self.destroy_into(id, &mut queue) {
            warn!(entity = %id, scene = %self.name, "destroy of unknown entity ignored");
            return Err(EcsError::UnknownEntity { entity: id }.into());
        }
        self.apply_queue(queue);
        Ok(())
    }

    fn destroy_into(&mut self, id: EntityId, queue: &mut VecDeque<SceneCommand>) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let mut object = self.objects.remove(index);
        for mut component in object.destroy() {
            if let Some(source) = (*component).as_any_mut().downcast_mut::<AudioSource>() {
                self.orphaned_audio
                    .extend(source.take_requests().into_iter().map(|r| (id, r)));
            }
        }
        queue.extend(object.take_commands());
        true
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.objects.iter().position(|o| o.id() == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|o| o.id() == id)
    }

    /// All entities in insertion order, active or not.
    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.objects.iter().map(GameObject::id).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // -- queries ------------------------------------------------------------

    /// First entity with this name.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.objects.iter().find(|o| o.name() == name).map(GameObject::id)
    }

    /// Active entities carrying an enabled `T`.
    pub fn find_entities_with_component<T: Component>(&self) -> Vec<EntityId> {
        self.objects
            .iter()
            .filter(|o| o.is_active() && o.enabled_component::<T>().is_some())
            .map(GameObject::id)
            .collect()
    }

    /// Active entities carrying an enabled component with `cap`.
    pub fn find_entities_with_capability(&self, cap: Capability) -> Vec<EntityId> {
        self.objects
            .iter()
            .filter(|o| {
                o.is_active()
                    && o.find_capability(cap)
                        .is_some_and(|cid| o.is_component_enabled(cid))
            })
            .map(GameObject::id)
            .collect()
    }

    /// Active collidable entities whose bounds intersect `region`.
    pub fn query_region(&self, region: &Rect) -> Vec<EntityId> {
        self.physics.query_region(&self.objects, region)
    }

    /// Spawn one static platform collider per solid tile of the tilemap on
    /// `owner`.
    pub fn add_tilemap_colliders(&mut self, owner: EntityId) -> Result<Vec<EntityId>, EngineError> {
        let rects = {
            let obj = self
                .get(owner)
                .ok_or(EcsError::UnknownEntity { entity: owner })?;
            let map = obj
                .get_component::<Tilemap>()
                .ok_or_else(|| EcsError::ComponentNotFound {
                    entity: owner,
                    component: "Tilemap".to_owned(),
                })?;
            map.solid_rects(&obj.transform)
        };
        let name = format!("{}-tile", self.get(owner).map_or("", GameObject::name));
        rects
            .into_iter()
            .map(|rect| {
                let center = rect.center();
                self.spawn(&name)
                    .at(center.x, center.y)
                    .with_collider(
                        Collider::new(rect.width(), rect.height()).with_layer("platform"),
                    )
                    .build()
            })
            .collect()
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start every entity. Runs once; later calls are no-ops.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        for obj in &mut self.objects {
            obj.start();
        }
        self.flush_commands();
        debug!(scene = %self.name, entities = self.objects.len(), "scene started");
    }

    /// Advance the scene by one fixed step of `dt` seconds.
    pub fn fixed_update(&mut self, dt: f64, input: &dyn InputState, layers: &LayerMatrix) {
        if !self.started {
            self.start();
        }

        self.advance_timers(dt);

        for obj in &mut self.objects {
            obj.update(dt, input);
        }
        self.flush_commands();

        for obj in &mut self.objects {
            obj.late_update(dt, input);
        }
        self.flush_commands();

        let events = self.physics.step(&mut self.objects, layers);
        self.deliver(&events, input);
        self.last_events = events;
        self.flush_commands();

        self.tick += 1;
    }

    /// Deliver each event to whichever of its two sides is still present.
    fn deliver(&mut self, events: &[CollisionEvent], input: &dyn InputState) {
        for event in events {
            for side in [event.a.entity, event.b.entity] {
                let Some(collision) = event.seen_by(side) else {
                    continue;
                };
                if let Some(obj) = self.get_mut(side) {
                    obj.dispatch_collision(event.phase, &collision, input);
                }
            }
        }
    }

    /// Tear the scene down: cancel timers, forget collision pairs, destroy
    /// every entity. Commands queued during teardown are discarded.
    pub fn destroy(&mut self) {
        self.timers.clear();
        self.physics.clear();
        self.last_events.clear();
        let ids = self.entity_ids();
        let mut discarded = VecDeque::new();
        for id in ids {
            self.destroy_into(id, &mut discarded);
        }
        self.started = false;
        debug!(scene = %self.name, dropped_commands = discarded.len(), "scene destroyed");
    }

    // -- messaging ----------------------------------------------------------

    /// Deliver a message to one entity now.
    pub fn send_message(
        &mut self,
        target: EntityId,
        name: &str,
        data: serde_json::Value,
    ) -> Result<(), EngineError> {
        if !self.contains(target) {
            warn!(entity = %target, message = name, "message to unknown entity dropped");
            return Err(EcsError::UnknownEntity { entity: target }.into());
        }
        self.apply_queue(VecDeque::from([SceneCommand::SendMessage {
            target,
            name: name.to_owned(),
            data,
        }]));
        Ok(())
    }

    /// Deliver a message to every active entity now.
    pub fn broadcast(&mut self, name: &str, data: serde_json::Value) {
        self.apply_queue(VecDeque::from([SceneCommand::Broadcast {
            name: name.to_owned(),
            data,
        }]));
    }

    fn flush_commands(&mut self) {
        self.apply_queue(VecDeque::new());
    }

    /// Apply `queue` plus everything sitting in entity outboxes, FIFO, until
    /// nothing is left.
    fn apply_queue(&mut self, mut queue: VecDeque<SceneCommand>) {
        for obj in &mut self.objects {
            queue.extend(obj.take_commands());
        }

        let mut applied = 0;
        while let Some(command) = queue.pop_front() {
            if applied == MAX_COMMANDS_PER_FLUSH {
                warn!(
                    scene = %self.name,
                    dropped = queue.len() + 1,
                    "command flush limit reached; dropping the rest"
                );
                for obj in &mut self.objects {
                    obj.take_commands();
                }
                return;
            }
            applied += 1;

            match command {
                SceneCommand::SendMessage { target, name, data } => match self.get_mut(target) {
                    Some(obj) => {
                        obj.send_message(&name, &data);
                        queue.extend(obj.take_commands());
                    }
                    None => warn!(entity = %target, message = %name, "message to unknown entity dropped"),
                },
                SceneCommand::Broadcast { name, data } => {
                    for obj in self.objects.iter_mut().filter(|o| o.is_active()) {
                        obj.send_message(&name, &data);
                        queue.extend(obj.take_commands());
                    }
                }
                SceneCommand::Destroy(target) => {
                    if !self.destroy_into(target, &mut queue) {
                        warn!(entity = %target, "destroy of unknown entity ignored");
                    }
                }
                SceneCommand::SetActive(target, active) => match self.get_mut(target) {
                    Some(obj) => obj.set_active(active),
                    None => warn!(entity = %target, active, "set_active on unknown entity ignored"),
                },
            }
        }
    }

    // -- timers -------------------------------------------------------------

    /// Run `callback` after `delay` seconds of simulated time, and every
    /// `delay` seconds after that if `repeat` is set. Timers advance inside
    /// the fixed step, so they are as deterministic as the rest of the
    /// simulation.
    pub fn add_timer<F>(&mut self, delay: f64, repeat: bool, callback: F) -> TimerId
    where
        F: FnMut(&mut CommandBuffer) + 'static,
    {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.timers.push(Timer {
            id,
            interval: delay,
            remaining: delay,
            repeat,
            callback: Box::new(callback),
        });
        id
    }

    /// Returns `false` if the timer already fired (one-shot) or never
    /// existed.
    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    fn advance_timers(&mut self, dt: f64) {
        if self.timers.is_empty() {
            return;
        }
        let mut buffer = CommandBuffer::new();
        for timer in &mut self.timers {
            timer.remaining -= dt;
            if timer.remaining <= TIMER_EPSILON {
                (timer.callback)(&mut buffer);
                if timer.repeat {
                    timer.remaining += timer.interval;
                }
            }
        }
        self.timers
            .retain(|t| t.repeat || t.remaining > TIMER_EPSILON);
        self.apply_queue(buffer.drain().into());
    }

    // -- collaborators ------------------------------------------------------

    /// Flatten active entities for the renderer.
    pub fn render_frame(&self, alpha: f64) -> RenderFrame {
        let items = self
            .objects
            .iter()
            .filter(|o| o.is_active())
            .map(|o| RenderItem {
                entity: o.id(),
                name: o.name().to_owned(),
                transform: o.transform,
                visual: o.enabled_component::<Visual>().cloned(),
            })
            .collect();
        RenderFrame::new(self.tick, alpha, items)
    }

    /// Drain every queued audio request, tagged with the entity that made
    /// it. Requests from destroyed entities come first.
    pub fn take_audio_requests(&mut self) -> Vec<(EntityId, AudioRequest)> {
        let mut requests = std::mem::take(&mut self.orphaned_audio);
        for obj in &mut self.objects {
            let id = obj.id();
            if let Some(source) = obj.get_component_mut::<AudioSource>() {
                requests.extend(source.take_requests().into_iter().map(|r| (id, r)));
            }
        }
        requests
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("entities", &self.objects.len())
            .field("timers", &self.timers.len())
            .field("started", &self.started)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
