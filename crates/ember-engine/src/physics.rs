//! AABB collision: broad-phase, narrow-phase, pair state and resolution.
//!
//! [`CollisionWorld::step`] runs once per fixed step, after every entity has
//! updated:
//!
//! 1. Collect active entities with an enabled, layer-resolved [`Collider`].
//! 2. Rebuild the [`QuadTree`] from their bounds.
//! 3. For each body, query the tree with its bounds. Each candidate must pass
//!    the [`LayerMatrix`] gate; each unordered pair is examined once.
//! 4. Narrow-phase on the bodies' current bounds (earlier corrections in the
//!    same tick are visible). Touching edges count as contact.
//! 5. A contact without a pair entry emits `Enter` and creates the entry.
//!    Every contact emits `Stay` and, for two solid colliders, is resolved.
//!    An examined pair that no longer touches emits `Exit` and is removed.
//! 6. Pair entries not examined this tick (an entity was deactivated,
//!    destroyed, filtered out, or moved far away) are swept and also emit
//!    `Exit`.
//! 7. Every body with a [`PlayerController`] has the ground under it sensed.
//!
//! Pair entries live in a `BTreeMap` keyed by [`PairKey`], so event order is
//! a deterministic function of the scene's entity order and ids.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use ember_ecs::component::Collision;
use ember_ecs::entity::EntityId;
use ember_ecs::object::{CollisionPhase, GameObject};
use ember_ecs::vector::Vector2;
use tracing::trace;

use crate::collider::Collider;
use crate::config::EngineConfig;
use crate::controller::PlayerController;
use crate::layers::{Layer, LayerMatrix};
use crate::spatial::{QuadTree, Rect};

// ---------------------------------------------------------------------------
// PairKey
// ---------------------------------------------------------------------------

/// Order-independent key of two entities: smaller id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: EntityId,
    second: EntityId,
}

impl PairKey {
    pub fn new(a: EntityId, b: EntityId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> EntityId {
        self.first
    }

    pub fn second(&self) -> EntityId {
        self.second
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.first == entity || self.second == entity
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// One side of a collision, captured when the pair was first seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub entity: EntityId,
    pub name: String,
    pub layer: Layer,
}

/// A pair-state transition (or continuation) produced by a physics tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub phase: CollisionPhase,
    pub a: Contact,
    pub b: Contact,
    /// Either side is a trigger.
    pub is_trigger: bool,
}

impl CollisionEvent {
    pub fn key(&self) -> PairKey {
        PairKey::new(self.a.entity, self.b.entity)
    }

    pub fn involves(&self, entity: EntityId) -> bool {
        self.a.entity == entity || self.b.entity == entity
    }

    /// The event as delivered to `side`'s components.
    pub fn seen_by(&self, side: EntityId) -> Option<Collision> {
        let other = if side == self.a.entity {
            &self.b
        } else if side == self.b.entity {
            &self.a
        } else {
            return None;
        };
        Some(Collision {
            other: other.entity,
            other_name: other.name.clone(),
            other_layer: other.layer.name().to_owned(),
            is_trigger: self.is_trigger,
        })
    }
}

/// Counters from the last [`CollisionWorld::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub bodies: usize,
    pub candidates: usize,
    pub narrow_tests: usize,
    pub contacts: usize,
    pub resolved: usize,
    pub exits: usize,
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct PairState {
    a: Contact,
    b: Contact,
    is_trigger: bool,
}

impl PairState {
    fn event(&self, phase: CollisionPhase) -> CollisionEvent {
        CollisionEvent {
            phase,
            a: self.a.clone(),
            b: self.b.clone(),
            is_trigger: self.is_trigger,
        }
    }
}

/// A collidable entity as seen at the start of a tick.
#[derive(Debug, Clone)]
struct Body {
    index: usize,
    entity: EntityId,
    layer: Layer,
    is_trigger: bool,
    bounds: Rect,
    controller: bool,
}

fn collect_bodies(objects: &[GameObject]) -> Vec<Body> {
    objects
        .iter()
        .enumerate()
        .filter(|(_, obj)| obj.is_active())
        .filter_map(|(index, obj)| {
            let collider = obj.enabled_component::<Collider>()?;
            Some(Body {
                index,
                entity: obj.id(),
                layer: collider.layer()?,
                is_trigger: collider.is_trigger,
                bounds: collider.bounds(&obj.transform),
                controller: obj.enabled_component::<PlayerController>().is_some(),
            })
        })
        .collect()
}

fn build_index(bodies: &[Body], capacity: usize, max_depth: usize) -> QuadTree<usize> {
    let region = bodies
        .iter()
        .map(|b| b.bounds)
        .reduce(|acc, r| acc.union(&r))
        .unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0))
        .expand(1.0);
    let mut tree = QuadTree::new(region, capacity, max_depth);
    for (i, body) in bodies.iter().enumerate() {
        tree.insert(body.bounds, i);
    }
    tree
}

fn current_bounds(objects: &[GameObject], body: &Body) -> Rect {
    let obj = &objects[body.index];
    obj.enabled_component::<Collider>()
        .map_or(body.bounds, |c| c.bounds(&obj.transform))
}

fn contact(objects: &[GameObject], body: &Body) -> Contact {
    Contact {
        entity: body.entity,
        name: objects[body.index].name().to_owned(),
        layer: body.layer,
    }
}

fn mark_touching(obj: &mut GameObject, other: EntityId) {
    if let Some(collider) = obj.get_component_mut::<Collider>() {
        collider.mark_touching(other);
    }
}

/// Whether a ground sensor under a body rests on `surface`. Side contact at
/// the sensor's edge does not count.
fn supports(sensor: &Rect, surface: &Rect) -> bool {
    sensor.min.x < surface.max.x
        && sensor.max.x > surface.min.x
        && sensor.min.y <= surface.max.y
        && sensor.max.y >= surface.min.y
}

// ---------------------------------------------------------------------------
// CollisionWorld
// ---------------------------------------------------------------------------

/// Per-scene collision state: the pair map plus broad-phase and resolution
/// tuning.
#[derive(Debug)]
pub struct CollisionWorld {
    pairs: BTreeMap<PairKey, PairState>,
    capacity: usize,
    max_depth: usize,
    epsilon: f64,
    sensor: f64,
    debug: bool,
    last_stats: StepStats,
}

impl CollisionWorld {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            pairs: BTreeMap::new(),
            capacity: config.quadtree_capacity,
            max_depth: config.quadtree_max_depth,
            epsilon: config.resolution_epsilon,
            sensor: config.ground_sensor,
            debug: config.debug,
            last_stats: StepStats::default(),
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Number of live pair entries.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_paired(&self, a: EntityId, b: EntityId) -> bool {
        self.pairs.contains_key(&PairKey::new(a, b))
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    /// Forget every pair without emitting events (scene teardown).
    pub fn clear(&mut self) {
        self.pairs.clear();
        self.last_stats = StepStats::default();
    }

    /// Ids of collidable entities whose bounds intersect `region`, in
    /// entity order.
    pub fn query_region(&self, objects: &[GameObject], region: &Rect) -> Vec<EntityId> {
        let bodies = collect_bodies(objects);
        let tree = build_index(&bodies, self.capacity, self.max_depth);
        let mut hits = tree.retrieve(region);
        hits.sort_unstable();
        hits.into_iter().map(|i| bodies[i].entity).collect()
    }

    /// Run one physics tick over `objects` and return the pair events in
    /// the order they occurred. The caller dispatches them.
    pub fn step(&mut self, objects: &mut [GameObject], layers: &LayerMatrix) -> Vec<CollisionEvent> {
        for obj in objects.iter_mut().filter(|o| o.is_active()) {
            if let Some(collider) = obj.get_component_mut::<Collider>() {
                collider.begin_tick();
            }
        }

        let bodies = collect_bodies(objects);
        let tree = build_index(&bodies, self.capacity, self.max_depth);
        let mut stats = StepStats {
            bodies: bodies.len(),
            ..StepStats::default()
        };
        let mut events = Vec::new();
        let mut examined: BTreeSet<PairKey> = BTreeSet::new();
        let mut touched: BTreeSet<PairKey> = BTreeSet::new();

        for (ai, a) in bodies.iter().enumerate() {
            let mut candidates = tree.retrieve(&a.bounds);
            candidates.sort_unstable();
            stats.candidates += candidates.len();

            for bi in candidates {
                if bi == ai {
                    continue;
                }
                let b = &bodies[bi];
                if !layers.can_collide(a.layer, b.layer) {
                    continue;
                }
                let key = PairKey::new(a.entity, b.entity);
                if !examined.insert(key) {
                    continue;
                }
                stats.narrow_tests += 1;

                let (ra, rb) = (current_bounds(objects, a), current_bounds(objects, b));
                if ra.intersects(&rb) {
                    stats.contacts += 1;
                    touched.insert(key);
                    mark_touching(&mut objects[a.index], b.entity);
                    mark_touching(&mut objects[b.index], a.entity);

                    let is_trigger = a.is_trigger || b.is_trigger;
                    let state = match self.pairs.entry(key) {
                        Entry::Occupied(entry) => {
                            // Trigger flags may change mid-contact.
                            let state = entry.into_mut();
                            state.is_trigger = is_trigger;
                            state
                        }
                        Entry::Vacant(entry) => {
                            let state = PairState {
                                a: contact(objects, a),
                                b: contact(objects, b),
                                is_trigger,
                            };
                            events.push(state.event(CollisionPhase::Enter));
                            entry.insert(state)
                        }
                    };
                    events.push(state.event(CollisionPhase::Stay));

                    if !is_trigger && self.resolve(objects, a, b, &ra, &rb) {
                        stats.resolved += 1;
                    }
                } else if let Some(mut state) = self.pairs.remove(&key) {
                    state.is_trigger = a.is_trigger || b.is_trigger;
                    stats.exits += 1;
                    events.push(state.event(CollisionPhase::Exit));
                }
            }
        }

        let stale: Vec<PairKey> = self
            .pairs
            .keys()
            .filter(|key| !touched.contains(key))
            .copied()
            .collect();
        let trigger_of = |id: EntityId| {
            bodies
                .iter()
                .find(|b| b.entity == id)
                .map(|b| b.is_trigger)
        };
        for key in stale {
            if let Some(mut state) = self.pairs.remove(&key) {
                // A side that left the scene keeps the flag it last had.
                if let (Some(a), Some(b)) = (trigger_of(key.first()), trigger_of(key.second())) {
                    state.is_trigger = a || b;
                }
                stats.exits += 1;
                events.push(state.event(CollisionPhase::Exit));
            }
        }

        self.sense_ground(objects, &bodies, layers);

        if self.debug {
            trace!(
                bodies = stats.bodies,
                candidates = stats.candidates,
                narrow_tests = stats.narrow_tests,
                contacts = stats.contacts,
                resolved = stats.resolved,
                exits = stats.exits,
                pairs = self.pairs.len(),
                "physics tick"
            );
        }
        self.last_stats = stats;
        events
    }

    /// Push two solid bodies apart along the axis of least penetration.
    /// Returns whether a correction was applied.
    fn resolve(&self, objects: &mut [GameObject], a: &Body, b: &Body, ra: &Rect, rb: &Rect) -> bool {
        let (ox, oy) = (ra.overlap_x(rb), ra.overlap_y(rb));
        if ox.min(oy) <= self.epsilon {
            return false;
        }

        // Full correction that moves `a` out of `b`.
        let (ca, cb) = (ra.center(), rb.center());
        let push = if ox < oy {
            Vector2::new(if ca.x < cb.x { -ox } else { ox }, 0.0)
        } else {
            Vector2::new(0.0, if ca.y < cb.y { -oy } else { oy })
        };

        match (a.layer, b.layer) {
            (Layer::Player, Layer::Platform) => land_on_platform(&mut objects[a.index], push),
            (Layer::Platform, Layer::Player) => land_on_platform(&mut objects[b.index], -push),
            _ => {
                let half = push * 0.5;
                objects[a.index].transform.position += half;
                objects[b.index].transform.position -= half;
            }
        }
        true
    }

    fn sense_ground(&self, objects: &mut [GameObject], bodies: &[Body], layers: &LayerMatrix) {
        let surfaces: Vec<(EntityId, Rect)> = bodies
            .iter()
            .filter(|b| b.layer == Layer::Platform && !b.is_trigger)
            .map(|b| (b.entity, current_bounds(objects, b)))
            .collect();

        for body in bodies.iter().filter(|b| b.controller) {
            let feet = current_bounds(objects, body);
            let sensor = Rect::from_min_max(
                Vector2::new(feet.min.x, feet.max.y),
                Vector2::new(feet.max.x, feet.max.y + self.sensor),
            );
            let support = if layers.can_collide(body.layer, Layer::Platform) {
                surfaces
                    .iter()
                    .filter(|(id, surface)| *id != body.entity && supports(&sensor, surface))
                    .map(|(_, surface)| surface.min.y)
                    .reduce(f64::min)
            } else {
                None
            };

            let obj = &mut objects[body.index];
            let Some(controller) = obj.get_component_mut::<PlayerController>() else {
                continue;
            };
            controller.set_grounded(support.is_some());
            let settling = controller.velocity().y >= 0.0;
            if let Some(top) = support.filter(|top| settling && feet.max.y < *top) {
                obj.transform.position.y += settle_gap(feet.max.y, top);
            }
        }
    }
}

/// Distance that moves feet at `feet` onto a surface whose top is `top`,
/// plus a few ulps so the inclusive overlap test sees the contact after
/// rounding.
fn settle_gap(feet: f64, top: f64) -> f64 {
    (top - feet) + 4.0 * f64::EPSILON * top.abs().max(1.0)
}

/// The platform does not move; the player takes the whole correction and
/// stops falling when pushed up.
fn land_on_platform(player: &mut GameObject, push: Vector2) {
    player.transform.position += push;
    if push.y < 0.0 {
        if let Some(controller) = player.get_component_mut::<PlayerController>() {
            if controller.velocity().y > 0.0 {
                controller.velocity_mut().y = 0.0;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, x: f64, y: f64, w: f64, h: f64, layer: &str) -> GameObject {
        let mut obj = GameObject::new(name);
        obj.transform.position = Vector2::new(x, y);
        obj.add_component(Collider::new(w, h).with_layer(layer));
        obj
    }

    fn phases(events: &[CollisionEvent]) -> Vec<CollisionPhase> {
        events.iter().map(|e| e.phase).collect()
    }

    fn world() -> CollisionWorld {
        CollisionWorld::new(&EngineConfig::default())
    }

    // -- 1. Pair keys -------------------------------------------------------

    #[test]
    fn pair_key_is_order_independent() {
        let a = EntityId::generate();
        let b = EntityId::generate();
        assert_eq!(PairKey::new(a, b), PairKey::new(b, a));
        assert_eq!(PairKey::new(b, a).first(), a);
        assert!(PairKey::new(a, b).contains(b));
    }

    // -- 2. Pair state machine ----------------------------------------------

    #[test]
    fn enter_stay_exit_sequence() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 5.0, 0.0, 10.0, 10.0, "default"),
        ];
        objects[1].get_component_mut::<Collider>().unwrap().is_trigger = true;
        let layers = LayerMatrix::with_defaults();
        let mut physics = world();

        let first = physics.step(&mut objects, &layers);
        assert_eq!(phases(&first), vec![CollisionPhase::Enter, CollisionPhase::Stay]);
        let second = physics.step(&mut objects, &layers);
        assert_eq!(phases(&second), vec![CollisionPhase::Stay]);

        objects[1].transform.position.x = 100.0;
        let third = physics.step(&mut objects, &layers);
        assert_eq!(phases(&third), vec![CollisionPhase::Exit]);
        assert_eq!(physics.pair_count(), 0);
        assert!(physics.step(&mut objects, &layers).is_empty());
    }

    #[test]
    fn trigger_flag_follows_the_collider_mid_contact() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 9.0, 0.0, 10.0, 10.0, "default"),
        ];
        let layers = LayerMatrix::with_defaults();
        let mut physics = world();

        let first = physics.step(&mut objects, &layers);
        assert!(first.iter().all(|e| !e.is_trigger));

        objects[1].get_component_mut::<Collider>().unwrap().is_trigger = true;
        let second = physics.step(&mut objects, &layers);
        assert_eq!(phases(&second), vec![CollisionPhase::Stay]);
        assert!(second[0].is_trigger);

        objects[1].get_component_mut::<Collider>().unwrap().is_trigger = false;
        objects[1].transform.position.x = 100.0;
        let third = physics.step(&mut objects, &layers);
        assert_eq!(phases(&third), vec![CollisionPhase::Exit]);
        assert!(!third[0].is_trigger);
    }

    #[test]
    fn deactivated_entity_is_swept_with_exit() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default").tap_trigger(),
            body("b", 5.0, 0.0, 10.0, 10.0, "default"),
        ];
        let layers = LayerMatrix::with_defaults();
        let mut physics = world();
        physics.step(&mut objects, &layers);

        objects[0].set_active(false);
        let events = physics.step(&mut objects, &layers);
        assert_eq!(phases(&events), vec![CollisionPhase::Exit]);
        assert!(events[0].involves(objects[0].id()));
        assert_eq!(physics.pair_count(), 0);
    }

    #[test]
    fn touching_sets_track_contacts() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default").tap_trigger(),
            body("b", 5.0, 0.0, 10.0, 10.0, "default"),
        ];
        let (a, b) = (objects[0].id(), objects[1].id());
        let layers = LayerMatrix::with_defaults();
        let mut physics = world();
        physics.step(&mut objects, &layers);
        assert!(objects[0].get_component::<Collider>().unwrap().is_touching(b));

        objects[1].transform.position.y = 500.0;
        physics.step(&mut objects, &layers);
        let collider = objects[1].get_component::<Collider>().unwrap();
        assert!(!collider.is_touching(a));
        assert_eq!(collider.exited().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn seen_by_swaps_sides() {
        let mut objects = vec![
            body("hero", 0.0, 0.0, 10.0, 10.0, "player"),
            body("coin", 0.0, 0.0, 4.0, 4.0, "collectible").tap_trigger(),
        ];
        let (hero, coin) = (objects[0].id(), objects[1].id());
        let events = world().step(&mut objects, &LayerMatrix::with_defaults());
        let for_hero = events[0].seen_by(hero).unwrap();
        assert_eq!(for_hero.other, coin);
        assert_eq!(for_hero.other_name, "coin");
        assert_eq!(for_hero.other_layer, "collectible");
        assert!(for_hero.is_trigger);
        assert_eq!(events[0].seen_by(coin).unwrap().other, hero);
        assert!(events[0].seen_by(EntityId::generate()).is_none());
    }

    // -- 3. Filtering -------------------------------------------------------

    #[test]
    fn forbidden_layers_never_collide() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "collectible"),
            body("b", 5.0, 0.0, 10.0, 10.0, "enemy"),
        ];
        let mut physics = world();
        let events = physics.step(&mut objects, &LayerMatrix::with_defaults());
        assert!(events.is_empty());
        assert_eq!(objects[0].transform.position.x, 0.0);
        assert_eq!(physics.last_stats().narrow_tests, 0);
    }

    #[test]
    fn unresolved_layer_never_collides() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "lava"),
            body("b", 5.0, 0.0, 10.0, 10.0, "default"),
        ];
        let events = world().step(&mut objects, &LayerMatrix::with_defaults());
        assert!(events.is_empty());
    }

    #[test]
    fn disabled_collider_is_ignored() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 5.0, 0.0, 10.0, 10.0, "default"),
        ];
        let cid = objects[1].find::<Collider>().unwrap();
        objects[1].set_component_enabled(cid, false);
        assert!(world().step(&mut objects, &LayerMatrix::with_defaults()).is_empty());
    }

    // -- 4. Resolution ------------------------------------------------------

    #[test]
    fn solid_pair_splits_correction_evenly() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 6.0, 1.0, 10.0, 10.0, "default"),
        ];
        let mut physics = world();
        physics.step(&mut objects, &LayerMatrix::with_defaults());
        // Overlap was 4 on x (less than 9 on y).
        assert_eq!(objects[0].transform.position.x, -2.0);
        assert_eq!(objects[1].transform.position.x, 8.0);
        assert_eq!(physics.last_stats().resolved, 1);
    }

    #[test]
    fn shallow_overlap_is_left_alone() {
        let mut objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 8.5, 0.0, 10.0, 10.0, "default"),
        ];
        let events = world().step(&mut objects, &LayerMatrix::with_defaults());
        assert_eq!(phases(&events), vec![CollisionPhase::Enter, CollisionPhase::Stay]);
        assert_eq!(objects[0].transform.position.x, 0.0);
        assert_eq!(objects[1].transform.position.x, 8.5);
    }

    #[test]
    fn platform_is_immovable_for_player() {
        let mut player = body("player", 0.0, 0.0, 10.0, 20.0, "player");
        player.add_component(PlayerController::platformer());
        player
            .get_component_mut::<PlayerController>()
            .unwrap()
            .set_velocity(Vector2::new(0.0, 300.0));
        let mut objects = vec![body("floor", 0.0, 10.0, 100.0, 10.0, "platform"), player];

        world().step(&mut objects, &LayerMatrix::with_defaults());
        assert_eq!(objects[0].transform.position, Vector2::new(0.0, 10.0));
        // Sunk 5 into the floor; pushed up until its bottom rests at y = 5.
        assert_eq!(objects[1].transform.position.y, -5.0);
        let ctrl = objects[1].get_component::<PlayerController>().unwrap();
        assert_eq!(ctrl.velocity().y, 0.0);
        assert!(ctrl.is_grounded());
    }

    // -- 5. Ground sensing and queries --------------------------------------

    #[test]
    fn ground_sensor_ignores_side_contact_and_air() {
        let mut player = body("player", 0.0, 0.0, 10.0, 10.0, "player");
        player.add_component(PlayerController::platformer());
        let mut objects = vec![player, body("wall", 10.0, 0.0, 10.0, 10.0, "platform")];
        world().step(&mut objects, &LayerMatrix::with_defaults());
        assert!(!objects[0].get_component::<PlayerController>().unwrap().is_grounded());
    }

    #[test]
    fn hovering_player_settles_onto_the_platform() {
        let mut player = body("player", 0.0, 0.0, 10.0, 10.0, "player");
        player.add_component(PlayerController::platformer());
        // Feet at y = 5, floor top at y = 5.5: inside the 1 px reach.
        let mut objects = vec![player, body("floor", 0.0, 10.5, 100.0, 10.0, "platform")];
        let layers = LayerMatrix::with_defaults();
        let mut physics = world();

        let events = physics.step(&mut objects, &layers);
        assert!(events.is_empty());
        assert!(objects[0].get_component::<PlayerController>().unwrap().is_grounded());
        let feet = objects[0].get_component::<Collider>().unwrap().bounds(&objects[0].transform);
        assert!(feet.max.y >= 5.5 && feet.max.y - 5.5 < 1e-9);

        let events = physics.step(&mut objects, &layers);
        assert_eq!(phases(&events), vec![CollisionPhase::Enter, CollisionPhase::Stay]);
        assert!(physics.is_paired(objects[0].id(), objects[1].id()));
    }

    #[test]
    fn rising_player_is_not_pulled_down() {
        let mut player = body("player", 0.0, 0.0, 10.0, 10.0, "player");
        player.add_component(PlayerController::platformer());
        player
            .get_component_mut::<PlayerController>()
            .unwrap()
            .set_velocity(Vector2::new(0.0, -100.0));
        let mut objects = vec![player, body("floor", 0.0, 10.5, 100.0, 10.0, "platform")];
        world().step(&mut objects, &LayerMatrix::with_defaults());
        assert_eq!(objects[0].transform.position.y, 0.0);
    }

    #[test]
    fn region_query_returns_intersecting_bodies() {
        let objects = vec![
            body("a", 0.0, 0.0, 10.0, 10.0, "default"),
            body("b", 50.0, 50.0, 10.0, 10.0, "default"),
            body("c", 100.0, 0.0, 10.0, 10.0, "default"),
        ];
        let hits = world().query_region(&objects, &Rect::new(40.0, 40.0, 100.0, 100.0));
        assert_eq!(hits, vec![objects[1].id()]);
    }

    trait TapTrigger {
        fn tap_trigger(self) -> Self;
    }

    impl TapTrigger for GameObject {
        fn tap_trigger(mut self) -> Self {
            if let Some(c) = self.get_component_mut::<Collider>() {
                c.is_trigger = true;
            }
            self
        }
    }
}
