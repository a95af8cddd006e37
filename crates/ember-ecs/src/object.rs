//! The entity container: a named transform plus an ordered list of
//! polymorphic components.
//!
//! # Lookup cache
//!
//! Lookups go through a cache mapping [`ComponentKey`] to the handles of every
//! matching component, in attachment order. The cache is purely an
//! optimisation and obeys three rules:
//!
//! 1. A component is registered under its concrete type the moment it is
//!    attached, and appended to every existing capability bucket it matches.
//! 2. A lookup miss scans all components and stores the complete match list.
//! 3. Removal purges the handle from *every* bucket, since one component can
//!    be cached under its concrete type and under several capabilities.
//!
//! Together these guarantee a bucket is always complete and never stale, so
//! `get_component::<Collider>()` and `get_capability(Capability::Collider)`
//! return the same instance and neither can see it after removal.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::command::{CommandBuffer, SceneCommand};
use crate::component::{
    Capability, Collision, Component, ComponentContext, ComponentKey, ComponentResult,
};
use crate::entity::{ComponentId, EntityId, SceneId};
use crate::input::{InputState, NoInput};
use crate::transform::Transform;
use crate::EcsError;

// ---------------------------------------------------------------------------
// CollisionPhase
// ---------------------------------------------------------------------------

/// Which collision hook to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionPhase {
    Enter,
    Stay,
    Exit,
}

// ---------------------------------------------------------------------------
// ComponentSlot
// ---------------------------------------------------------------------------

struct ComponentSlot {
    component: Box<dyn Component>,
    enabled: bool,
    started: bool,
}

// ---------------------------------------------------------------------------
// GameObject
// ---------------------------------------------------------------------------

/// An entity: identity, transform, lifecycle flags and owned components.
///
/// A `GameObject` is built detached, gets components attached (each attach
/// fires `awake`), and is then handed to a scene, which owns it by value.
/// Components are owned by value too, so a component can never have two
/// owners: attaching moves it in and removal hands it back.
pub struct GameObject {
    id: EntityId,
    name: String,
    /// Spatial state, freely writable by the host and by physics.
    pub transform: Transform,
    active: bool,
    started: bool,
    scene: Option<SceneId>,
    /// Attachment order.
    order: Vec<ComponentId>,
    slots: HashMap<ComponentId, ComponentSlot>,
    next_component: u32,
    lookup: RefCell<HashMap<ComponentKey, Vec<ComponentId>>>,
    outbox: CommandBuffer,
}

impl GameObject {
    /// Create a detached, active entity with a freshly generated id.
    pub fn new(name: &str) -> Self {
        Self::with_id(EntityId::generate(), name)
    }

    /// Create a detached entity with a known id (snapshot restoration).
    pub fn with_id(id: EntityId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            transform: Transform::default(),
            active: true,
            started: false,
            scene: None,
            order: Vec::new(),
            slots: HashMap::new(),
            next_component: 0,
            lookup: RefCell::new(HashMap::new()),
            outbox: CommandBuffer::new(),
        }
    }

    // -- identity / flags ---------------------------------------------------

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Whether [`start`](Self::start) has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// The owning scene, if attached.
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Record the owning scene. The back-reference can be set only once;
    /// a second attach is rejected and logged.
    pub fn attach_to_scene(&mut self, scene: SceneId) -> Result<(), EcsError> {
        if let Some(existing) = self.scene {
            warn!(
                entity = %self.id,
                name = %self.name,
                owner = %existing,
                requested = %scene,
                "entity already belongs to a scene; attach ignored"
            );
            return Err(EcsError::AlreadyAttached {
                entity: self.id,
                scene: existing,
            });
        }
        self.scene = Some(scene);
        Ok(())
    }

    // -- attach -------------------------------------------------------------

    /// Attach a component. Fires `awake` immediately, and `start` too when
    /// this entity has already started inside a scene.
    pub fn add_component<C: Component>(&mut self, component: C) -> ComponentId {
        self.add_boxed(Box::new(component))
    }

    /// Attach an already-boxed component.
    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> ComponentId {
        let cid = ComponentId(self.next_component);
        self.next_component += 1;

        {
            let lookup = self.lookup.get_mut();
            let concrete = ComponentKey::Type((*component).as_any().type_id());
            lookup.entry(concrete).or_default().push(cid);
            for &cap in component.capabilities() {
                if let Some(bucket) = lookup.get_mut(&ComponentKey::Capability(cap)) {
                    bucket.push(cid);
                }
            }
        }

        debug!(entity = %self.id, component = component.type_name(), "component attached");
        self.order.push(cid);
        self.slots.insert(
            cid,
            ComponentSlot {
                component,
                enabled: true,
                started: false,
            },
        );

        let start_now = self.started && self.scene.is_some();
        self.run_hook(cid, "awake", |c, ctx| c.awake(ctx));
        if start_now {
            self.start_component(cid);
        }
        cid
    }

    // -- lookup -------------------------------------------------------------

    /// First component matching `key`, in attachment order.
    pub fn find_key(&self, key: ComponentKey) -> Option<ComponentId> {
        let cached = self
            .lookup
            .borrow()
            .get(&key)
            .map(|bucket| bucket.first().copied());
        if let Some(hit) = cached {
            return hit;
        }
        let matches = self.scan(key);
        let first = matches.first().copied();
        self.lookup.borrow_mut().insert(key, matches);
        first
    }

    /// Every component matching `key`, in attachment order.
    pub fn find_all_key(&self, key: ComponentKey) -> Vec<ComponentId> {
        let cached = self.lookup.borrow().get(&key).cloned();
        if let Some(bucket) = cached {
            return bucket;
        }
        let matches = self.scan(key);
        self.lookup.borrow_mut().insert(key, matches.clone());
        matches
    }

    fn scan(&self, key: ComponentKey) -> Vec<ComponentId> {
        self.order
            .iter()
            .copied()
            .filter(|cid| {
                self.slots
                    .get(cid)
                    .is_some_and(|slot| key.matches(slot.component.as_ref()))
            })
            .collect()
    }

    /// Handle of the first component of concrete type `T`.
    pub fn find<T: Component>(&self) -> Option<ComponentId> {
        self.find_key(ComponentKey::of::<T>())
    }

    /// Handle of the first component fulfilling `cap`.
    pub fn find_capability(&self, cap: Capability) -> Option<ComponentId> {
        self.find_key(ComponentKey::Capability(cap))
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.find::<T>().is_some()
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.find_capability(cap).is_some()
    }

    pub fn get_component<T: Component>(&self) -> Option<&T> {
        let cid = self.find::<T>()?;
        self.slots
            .get(&cid)
            .and_then(|slot| (*slot.component).as_any().downcast_ref::<T>())
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        let cid = self.find::<T>()?;
        self.slots
            .get_mut(&cid)
            .and_then(|slot| (*slot.component).as_any_mut().downcast_mut::<T>())
    }

    /// All components of concrete type `T`, in attachment order.
    pub fn get_components<T: Component>(&self) -> Vec<&T> {
        self.find_all_key(ComponentKey::of::<T>())
            .into_iter()
            .filter_map(|cid| self.slots.get(&cid))
            .filter_map(|slot| (*slot.component).as_any().downcast_ref::<T>())
            .collect()
    }

    pub fn get_capability(&self, cap: Capability) -> Option<&dyn Component> {
        let cid = self.find_capability(cap)?;
        self.component(cid)
    }

    pub fn get_capability_mut(&mut self, cap: Capability) -> Option<&mut (dyn Component + 'static)> {
        let cid = self.find_capability(cap)?;
        self.component_mut(cid)
    }

    pub fn component(&self, cid: ComponentId) -> Option<&dyn Component> {
        self.slots.get(&cid).map(|slot| slot.component.as_ref())
    }

    pub fn component_mut(&mut self, cid: ComponentId) -> Option<&mut (dyn Component + 'static)> {
        self.slots.get_mut(&cid).map(|slot| slot.component.as_mut())
    }

    /// Handles in attachment order.
    pub fn component_ids(&self) -> &[ComponentId] {
        &self.order
    }

    pub fn component_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_component_enabled(&self, cid: ComponentId) -> bool {
        self.slots.get(&cid).is_some_and(|slot| slot.enabled)
    }

    /// Enable or disable a component. Disabled components receive no hooks
    /// and are ignored by physics. Returns `false` for an unknown handle.
    pub fn set_component_enabled(&mut self, cid: ComponentId, enabled: bool) -> bool {
        match self.slots.get_mut(&cid) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// The first `T`, but only if it is enabled.
    pub fn enabled_component<T: Component>(&self) -> Option<&T> {
        let cid = self.find::<T>()?;
        if !self.is_component_enabled(cid) {
            return None;
        }
        self.get_component::<T>()
    }

    /// Whether `cid` appears anywhere in the lookup cache.
    pub fn is_cached(&self, cid: ComponentId) -> bool {
        self.lookup
            .borrow()
            .values()
            .any(|bucket| bucket.contains(&cid))
    }

    // -- removal ------------------------------------------------------------

    /// Remove the first component of type `T`, firing its `on_destroy`.
    pub fn remove_component<T: Component>(&mut self) -> Option<Box<dyn Component>> {
        let cid = self.find::<T>()?;
        self.remove_component_by_id(cid)
    }

    /// Remove the first component fulfilling `cap`, firing its `on_destroy`.
    pub fn remove_capability(&mut self, cap: Capability) -> Option<Box<dyn Component>> {
        let cid = self.find_capability(cap)?;
        self.remove_component_by_id(cid)
    }

    /// Remove a component by handle. The returned box is detached and may be
    /// attached elsewhere.
    pub fn remove_component_by_id(&mut self, cid: ComponentId) -> Option<Box<dyn Component>> {
        if !self.slots.contains_key(&cid) {
            return None;
        }
        self.run_hook_any(cid, "on_destroy", |c, ctx| c.on_destroy(ctx));

        let slot = self.slots.remove(&cid)?;
        self.order.retain(|c| *c != cid);
        for bucket in self.lookup.get_mut().values_mut() {
            bucket.retain(|c| *c != cid);
        }
        debug!(entity = %self.id, component = slot.component.type_name(), "component removed");
        Some(slot.component)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start every component that has not started yet.
    pub fn start(&mut self) {
        self.started = true;
        let ids = self.order.clone();
        for cid in ids {
            self.start_component(cid);
        }
    }

    fn start_component(&mut self, cid: ComponentId) {
        let should_start = self
            .slots
            .get(&cid)
            .is_some_and(|slot| slot.enabled && !slot.started);
        if !should_start {
            return;
        }
        if let Some(slot) = self.slots.get_mut(&cid) {
            slot.started = true;
        }
        self.run_hook(cid, "start", |c, ctx| c.start(ctx));
    }

    /// Run `update` on every enabled component in attachment order.
    pub fn update(&mut self, dt: f64, input: &dyn InputState) {
        if !self.active {
            return;
        }
        self.dispatch(input, "update", |c, ctx| c.update(ctx, dt));
    }

    /// Run `late_update` on every enabled component in attachment order.
    pub fn late_update(&mut self, dt: f64, input: &dyn InputState) {
        if !self.active {
            return;
        }
        self.dispatch(input, "late_update", |c, ctx| c.late_update(ctx, dt));
    }

    /// Deliver a message to every enabled component. A failing handler is
    /// logged and the remaining components still receive the message.
    pub fn send_message(&mut self, name: &str, data: &serde_json::Value) {
        self.dispatch(&NoInput, "on_message", |c, ctx| c.on_message(ctx, name, data));
    }

    /// Fire one collision hook on every enabled component.
    pub fn dispatch_collision(
        &mut self,
        phase: CollisionPhase,
        collision: &Collision,
        input: &dyn InputState,
    ) {
        match phase {
            CollisionPhase::Enter => self.dispatch(input, "on_collision_enter", |c, ctx| {
                c.on_collision_enter(ctx, collision)
            }),
            CollisionPhase::Stay => {
                self.dispatch(input, "on_collision", |c, ctx| c.on_collision(ctx, collision))
            }
            CollisionPhase::Exit => self.dispatch(input, "on_collision_exit", |c, ctx| {
                c.on_collision_exit(ctx, collision)
            }),
        }
    }

    /// Fire `on_destroy` on every component, detach from the scene and hand
    /// the components back in attachment order.
    pub fn destroy(&mut self) -> Vec<Box<dyn Component>> {
        let ids = std::mem::take(&mut self.order);
        for cid in &ids {
            self.run_hook_any(*cid, "on_destroy", |c, ctx| c.on_destroy(ctx));
        }
        let components = ids
            .iter()
            .filter_map(|cid| self.slots.remove(cid))
            .map(|slot| slot.component)
            .collect();
        self.slots.clear();
        self.lookup.get_mut().clear();
        self.scene = None;
        self.active = false;
        debug!(entity = %self.id, name = %self.name, "entity destroyed");
        components
    }

    // -- outbox -------------------------------------------------------------

    /// Drain commands queued by this entity's components.
    pub fn take_commands(&mut self) -> Vec<SceneCommand> {
        self.outbox.drain()
    }

    pub fn has_pending_commands(&self) -> bool {
        !self.outbox.is_empty()
    }

    // -- dispatch helpers ---------------------------------------------------

    fn dispatch<F>(&mut self, input: &dyn InputState, phase: &'static str, mut hook: F)
    where
        F: FnMut(&mut (dyn Component + 'static), &mut ComponentContext<'_>) -> ComponentResult,
    {
        let Self {
            id,
            name,
            transform,
            order,
            slots,
            outbox,
            ..
        } = self;
        for cid in order.iter() {
            let Some(slot) = slots.get_mut(cid) else {
                continue;
            };
            if !slot.enabled {
                continue;
            }
            let mut ctx = ComponentContext {
                entity: *id,
                name: name.as_str(),
                transform: &mut *transform,
                input,
                commands: &mut *outbox,
            };
            if let Err(e) = hook(slot.component.as_mut(), &mut ctx) {
                warn!(
                    entity = %id,
                    name = %name,
                    component = slot.component.type_name(),
                    phase,
                    error = %e,
                    "component hook failed"
                );
            }
        }
    }

    /// Run a hook on one enabled component.
    fn run_hook<F>(&mut self, cid: ComponentId, phase: &'static str, hook: F)
    where
        F: FnOnce(&mut (dyn Component + 'static), &mut ComponentContext<'_>) -> ComponentResult,
    {
        if self.is_component_enabled(cid) {
            self.run_hook_any(cid, phase, hook);
        }
    }

    /// Run a hook on one component regardless of its enabled flag.
    fn run_hook_any<F>(&mut self, cid: ComponentId, phase: &'static str, hook: F)
    where
        F: FnOnce(&mut (dyn Component + 'static), &mut ComponentContext<'_>) -> ComponentResult,
    {
        let Self {
            id,
            name,
            transform,
            slots,
            outbox,
            ..
        } = self;
        let Some(slot) = slots.get_mut(&cid) else {
            return;
        };
        let mut ctx = ComponentContext {
            entity: *id,
            name: name.as_str(),
            transform,
            input: &NoInput,
            commands: outbox,
        };
        if let Err(e) = hook(slot.component.as_mut(), &mut ctx) {
            warn!(
                entity = %id,
                name = %name,
                component = slot.component.type_name(),
                phase,
                error = %e,
                "component hook failed"
            );
        }
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components: Vec<&str> = self
            .order
            .iter()
            .filter_map(|cid| self.slots.get(cid))
            .map(|slot| slot.component.type_name())
            .collect();
        f.debug_struct("GameObject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("transform", &self.transform)
            .field("active", &self.active)
            .field("started", &self.started)
            .field("scene", &self.scene)
            .field("components", &components)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
