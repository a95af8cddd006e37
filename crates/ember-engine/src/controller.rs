//! The [`PlayerController`] component.
//!
//! One controller type covers every genre. A [`Movement`] variant selects the
//! input strategy and carries that strategy's tuning; the strategy turns the
//! input collaborator's key state into a velocity, and a shared integration
//! stage moves the entity and applies the optional [`Boundary`].
//!
//! Grounding is not computed here. The collision engine senses under the
//! controller's collider after resolution and reports the result through
//! [`PlayerController::set_grounded`].

use std::fmt;

use ember_ecs::component::{Capability, Component, ComponentContext, ComponentResult};
use ember_ecs::input::InputState;
use ember_ecs::transform::Transform;
use ember_ecs::vector::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::spatial::Rect;

/// Speeds below this read as standing still.
const MOVE_EPSILON: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Key bindings
// ---------------------------------------------------------------------------

/// Physical key codes per action. Any key in a list triggers the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub up: Vec<String>,
    pub down: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    /// Jump for platformers, lift for flyers, drift for racers.
    pub jump: Vec<String>,
}

fn keys(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| (*c).to_owned()).collect()
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            up: keys(&["ArrowUp", "KeyW"]),
            down: keys(&["ArrowDown", "KeyS"]),
            left: keys(&["ArrowLeft", "KeyA"]),
            right: keys(&["ArrowRight", "KeyD"]),
            jump: keys(&["Space"]),
        }
    }
}

impl KeyBindings {
    /// Held direction as `-1/0/1` per axis (`+y` is down).
    pub fn axis(&self, input: &dyn InputState) -> Vector2 {
        let held = |codes: &[String]| if input.any_down(codes) { 1.0 } else { 0.0 };
        Vector2::new(
            held(&self.right) - held(&self.left),
            held(&self.down) - held(&self.up),
        )
    }
}

// ---------------------------------------------------------------------------
// Movement strategies
// ---------------------------------------------------------------------------

/// Strategy tag without its tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    TopDown,
    Platformer,
    Racing,
    SideScroller,
    Flying,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopDownSettings {
    pub speed: f64,
    /// Allow diagonals. Without it, horizontal input wins.
    pub eight_way: bool,
}

impl Default for TopDownSettings {
    fn default() -> Self {
        Self {
            speed: 200.0,
            eight_way: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformerSettings {
    pub speed: f64,
    pub gravity: f64,
    pub jump_force: f64,
    pub max_fall_speed: f64,
    /// Seconds after leaving the ground during which a jump is still honored.
    pub coyote_time: f64,
    /// Seconds a jump press is remembered before landing.
    pub jump_buffer: f64,
}

impl Default for PlatformerSettings {
    fn default() -> Self {
        Self {
            speed: 200.0,
            gravity: 980.0,
            jump_force: 450.0,
            max_fall_speed: 800.0,
            coyote_time: 0.1,
            jump_buffer: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RacingSettings {
    pub acceleration: f64,
    pub braking: f64,
    pub max_speed: f64,
    pub max_reverse_speed: f64,
    /// Radians per second at full speed.
    pub turn_speed: f64,
    /// Deceleration with neither throttle nor brake held.
    pub friction: f64,
    /// Fraction of the heading velocity adopted per step while drifting.
    pub drift_grip: f64,
}

impl Default for RacingSettings {
    fn default() -> Self {
        Self {
            acceleration: 300.0,
            braking: 600.0,
            max_speed: 400.0,
            max_reverse_speed: 120.0,
            turn_speed: 3.0,
            friction: 150.0,
            drift_grip: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideScrollerSettings {
    pub speed: f64,
    /// Velocity added every step regardless of input.
    pub auto_scroll: Vector2,
}

impl Default for SideScrollerSettings {
    fn default() -> Self {
        Self {
            speed: 200.0,
            auto_scroll: Vector2::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyingSettings {
    pub speed: f64,
    pub gravity: f64,
    /// Upward acceleration while the jump or up key is held.
    pub lift: f64,
    pub max_fall_speed: f64,
    pub max_rise_speed: f64,
}

impl Default for FlyingSettings {
    fn default() -> Self {
        Self {
            speed: 200.0,
            gravity: 400.0,
            lift: 900.0,
            max_fall_speed: 400.0,
            max_rise_speed: 300.0,
        }
    }
}

/// The movement strategy and its tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Movement {
    TopDown(TopDownSettings),
    Platformer(PlatformerSettings),
    Racing(RacingSettings),
    SideScroller(SideScrollerSettings),
    Flying(FlyingSettings),
}

impl Movement {
    /// The strategy with default tuning.
    pub fn defaults(kind: MovementType) -> Self {
        match kind {
            MovementType::TopDown => Movement::TopDown(TopDownSettings::default()),
            MovementType::Platformer => Movement::Platformer(PlatformerSettings::default()),
            MovementType::Racing => Movement::Racing(RacingSettings::default()),
            MovementType::SideScroller => Movement::SideScroller(SideScrollerSettings::default()),
            MovementType::Flying => Movement::Flying(FlyingSettings::default()),
        }
    }

    pub fn movement_type(&self) -> MovementType {
        match self {
            Movement::TopDown(_) => MovementType::TopDown,
            Movement::Platformer(_) => MovementType::Platformer,
            Movement::Racing(_) => MovementType::Racing,
            Movement::SideScroller(_) => MovementType::SideScroller,
            Movement::Flying(_) => MovementType::Flying,
        }
    }

    /// Strategies that fall and can land.
    pub fn has_gravity(&self) -> bool {
        matches!(self, Movement::Platformer(_) | Movement::Flying(_))
    }
}

// ---------------------------------------------------------------------------
// Boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryMode {
    /// Stop at the edge and zero the velocity component pushing outward.
    Clamp,
    /// Teleport to the opposite edge.
    Wrap,
}

/// Region the entity position is kept within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub region: Rect,
    pub mode: BoundaryMode,
}

impl Boundary {
    pub fn clamp(region: Rect) -> Self {
        Self {
            region,
            mode: BoundaryMode::Clamp,
        }
    }

    pub fn wrap(region: Rect) -> Self {
        Self {
            region,
            mode: BoundaryMode::Wrap,
        }
    }

    pub fn apply(&self, position: &mut Vector2, velocity: &mut Vector2) {
        let (min, max) = (self.region.min, self.region.max);
        match self.mode {
            BoundaryMode::Clamp => {
                if position.x < min.x {
                    position.x = min.x;
                    velocity.x = velocity.x.max(0.0);
                } else if position.x > max.x {
                    position.x = max.x;
                    velocity.x = velocity.x.min(0.0);
                }
                if position.y < min.y {
                    position.y = min.y;
                    velocity.y = velocity.y.max(0.0);
                } else if position.y > max.y {
                    position.y = max.y;
                    velocity.y = velocity.y.min(0.0);
                }
            }
            BoundaryMode::Wrap => {
                if position.x < min.x {
                    position.x = max.x;
                } else if position.x > max.x {
                    position.x = min.x;
                }
                if position.y < min.y {
                    position.y = max.y;
                } else if position.y > max.y {
                    position.y = min.y;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// Coarse state derived from velocity and grounding after every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    #[default]
    Idle,
    Moving,
    Jumping,
    Falling,
    Dead,
}

type StateObserver = Box<dyn FnMut(PlayerState, PlayerState)>;

// ---------------------------------------------------------------------------
// PlayerController
// ---------------------------------------------------------------------------

/// Input-driven movement, health and lives for one entity.
pub struct PlayerController {
    movement: Movement,
    pub bindings: KeyBindings,
    pub boundary: Option<Boundary>,
    velocity: Vector2,
    grounded: bool,
    time_since_grounded: f64,
    jump_request_age: Option<f64>,
    jumped: bool,
    forward_speed: f64,
    max_health: u32,
    health: u32,
    lives: u32,
    /// Seconds of immunity after taking damage.
    pub invulnerability_time: f64,
    invulnerable_for: f64,
    spawn_point: Option<Vector2>,
    respawn_pending: bool,
    state: PlayerState,
    observer: Option<StateObserver>,
}

impl PlayerController {
    pub fn new(movement: Movement) -> Self {
        Self {
            movement,
            bindings: KeyBindings::default(),
            boundary: None,
            velocity: Vector2::ZERO,
            grounded: false,
            time_since_grounded: f64::INFINITY,
            jump_request_age: None,
            jumped: false,
            forward_speed: 0.0,
            max_health: 100,
            health: 100,
            lives: 3,
            invulnerability_time: 1.0,
            invulnerable_for: 0.0,
            spawn_point: None,
            respawn_pending: false,
            state: PlayerState::Idle,
            observer: None,
        }
    }

    pub fn of_type(kind: MovementType) -> Self {
        Self::new(Movement::defaults(kind))
    }

    pub fn top_down() -> Self {
        Self::of_type(MovementType::TopDown)
    }

    pub fn platformer() -> Self {
        Self::of_type(MovementType::Platformer)
    }

    pub fn racing() -> Self {
        Self::of_type(MovementType::Racing)
    }

    pub fn side_scroller() -> Self {
        Self::of_type(MovementType::SideScroller)
    }

    pub fn flying() -> Self {
        Self::of_type(MovementType::Flying)
    }

    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Full health, extra lives included in `lives`.
    pub fn with_health(mut self, max_health: u32, lives: u32) -> Self {
        self.max_health = max_health.max(1);
        self.health = self.max_health;
        self.lives = lives.max(1);
        self
    }

    /// Where the entity reappears after losing a life.
    pub fn with_spawn_point(mut self, spawn: Vector2) -> Self {
        self.spawn_point = Some(spawn);
        self
    }

    /// Register a callback fired with `(old, new)` on every state change.
    pub fn on_state_change(mut self, observer: impl FnMut(PlayerState, PlayerState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    // -- accessors ----------------------------------------------------------

    pub fn movement(&self) -> &Movement {
        &self.movement
    }

    pub fn movement_mut(&mut self) -> &mut Movement {
        &mut self.movement
    }

    pub fn movement_type(&self) -> MovementType {
        self.movement.movement_type()
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    pub fn velocity_mut(&mut self) -> &mut Vector2 {
        &mut self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vector2) {
        self.velocity = velocity;
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Report the ground sensor result. Landing stops a falling body.
    pub fn set_grounded(&mut self, grounded: bool) {
        if grounded && !self.grounded {
            debug!(velocity_y = self.velocity.y, "controller landed");
        }
        self.grounded = grounded;
        if grounded && self.movement.has_gravity() && self.velocity.y > 0.0 {
            self.velocity.y = 0.0;
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_for > 0.0
    }

    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Dead
    }

    // -- health -------------------------------------------------------------

    /// Apply damage. Ignored while dead or invulnerable; returns whether it
    /// landed. Running out of health costs a life and refills health; losing
    /// the last life kills the controller.
    pub fn damage(&mut self, amount: u32) -> bool {
        if self.is_dead() || self.is_invulnerable() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.lives = self.lives.saturating_sub(1);
            if self.lives == 0 {
                self.velocity = Vector2::ZERO;
                self.set_state(PlayerState::Dead);
                return true;
            }
            self.health = self.max_health;
            self.respawn_pending = true;
        }
        self.invulnerable_for = self.invulnerability_time;
        true
    }

    pub fn heal(&mut self, amount: u32) {
        if !self.is_dead() {
            self.health = self.health.saturating_add(amount).min(self.max_health);
        }
    }

    // -- strategies ---------------------------------------------------------

    fn move_top_down(&mut self, s: &TopDownSettings, input: &dyn InputState) {
        let mut dir = self.bindings.axis(input);
        if !s.eight_way && dir.x != 0.0 {
            dir.y = 0.0;
        }
        self.velocity = dir.normalize() * s.speed;
    }

    fn move_platformer(&mut self, s: &PlatformerSettings, input: &dyn InputState, dt: f64) {
        self.velocity.x = self.bindings.axis(input).x * s.speed;

        if self.grounded {
            self.time_since_grounded = 0.0;
            self.jumped = false;
        } else {
            self.time_since_grounded += dt;
        }

        if input.any_pressed(&self.bindings.jump) {
            self.jump_request_age = Some(0.0);
        } else if let Some(age) = self.jump_request_age.as_mut() {
            *age += dt;
        }
        if self.jump_request_age.is_some_and(|age| age > s.jump_buffer) {
            self.jump_request_age = None;
        }

        if self.grounded {
            self.velocity.y = self.velocity.y.min(0.0);
        } else {
            self.velocity.y = (self.velocity.y + s.gravity * dt).min(s.max_fall_speed);
        }

        let in_coyote = self.grounded || self.time_since_grounded <= s.coyote_time;
        if self.jump_request_age.is_some() && in_coyote && !self.jumped {
            self.velocity.y = -s.jump_force;
            self.jumped = true;
            self.grounded = false;
            self.jump_request_age = None;
        }
    }

    fn move_racing(&mut self, s: &RacingSettings, input: &dyn InputState, transform: &mut Transform, dt: f64) {
        let throttle = input.any_down(&self.bindings.up);
        let brake = input.any_down(&self.bindings.down);
        let steer = self.bindings.axis(input).x;

        if throttle {
            self.forward_speed += s.acceleration * dt;
        } else if brake {
            self.forward_speed -= s.braking * dt;
        } else if self.forward_speed > 0.0 {
            self.forward_speed = (self.forward_speed - s.friction * dt).max(0.0);
        } else {
            self.forward_speed = (self.forward_speed + s.friction * dt).min(0.0);
        }
        self.forward_speed = self.forward_speed.clamp(-s.max_reverse_speed, s.max_speed);

        // Steering scales with speed and reverses when backing up.
        let grip = (self.forward_speed.abs() / s.max_speed).min(1.0) * self.forward_speed.signum();
        transform.rotation += steer * s.turn_speed * grip * dt;

        let heading = Vector2::from_angle(transform.rotation) * self.forward_speed;
        self.velocity = if input.any_down(&self.bindings.jump) {
            self.velocity.lerp(heading, s.drift_grip)
        } else {
            heading
        };
    }

    fn move_side_scroller(&mut self, s: &SideScrollerSettings, input: &dyn InputState) {
        self.velocity = self.bindings.axis(input).normalize() * s.speed + s.auto_scroll;
    }

    fn move_flying(&mut self, s: &FlyingSettings, input: &dyn InputState, dt: f64) {
        self.velocity.x = self.bindings.axis(input).x * s.speed;
        let mut vy = self.velocity.y + s.gravity * dt;
        if input.any_down(&self.bindings.jump) || input.any_down(&self.bindings.up) {
            vy -= s.lift * dt;
        }
        if self.grounded {
            vy = vy.min(0.0);
        }
        self.velocity.y = vy.clamp(-s.max_rise_speed, s.max_fall_speed);
    }

    // -- shared stages ------------------------------------------------------

    fn integrate(&mut self, transform: &mut Transform, dt: f64) {
        transform.position += self.velocity * dt;
        if let Some(boundary) = self.boundary {
            boundary.apply(&mut transform.position, &mut self.velocity);
        }
    }

    fn derive_state(&self) -> PlayerState {
        if self.movement.has_gravity() && !self.grounded {
            if self.velocity.y < 0.0 {
                PlayerState::Jumping
            } else {
                PlayerState::Falling
            }
        } else if self.velocity.magnitude() > MOVE_EPSILON {
            PlayerState::Moving
        } else {
            PlayerState::Idle
        }
    }

    fn set_state(&mut self, next: PlayerState) {
        if next == self.state {
            return;
        }
        let previous = std::mem::replace(&mut self.state, next);
        debug!(from = ?previous, to = ?next, "player state changed");
        if let Some(observer) = self.observer.as_mut() {
            observer(previous, next);
        }
    }
}

impl Component for PlayerController {
    fn type_name(&self) -> &'static str {
        "PlayerController"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Controller]
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) -> ComponentResult {
        if self.is_dead() {
            self.velocity = Vector2::ZERO;
            return Ok(());
        }
        if self.respawn_pending {
            self.respawn_pending = false;
            self.velocity = Vector2::ZERO;
            if let Some(spawn) = self.spawn_point {
                ctx.transform.position = spawn;
            }
        }
        self.invulnerable_for = (self.invulnerable_for - dt).max(0.0);

        let input = ctx.input;
        match self.movement {
            Movement::TopDown(s) => self.move_top_down(&s, input),
            Movement::Platformer(s) => self.move_platformer(&s, input, dt),
            Movement::Racing(s) => self.move_racing(&s, input, ctx.transform, dt),
            Movement::SideScroller(s) => self.move_side_scroller(&s, input),
            Movement::Flying(s) => self.move_flying(&s, input, dt),
        }

        self.integrate(ctx.transform, dt);
        let next = self.derive_state();
        self.set_state(next);
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        name: &str,
        data: &serde_json::Value,
    ) -> ComponentResult {
        let amount = || {
            data.get("amount")
                .and_then(serde_json::Value::as_u64)
                .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX))
        };
        match name {
            "damage" => {
                self.damage(amount());
            }
            "heal" => self.heal(amount()),
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Debug for PlayerController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerController")
            .field("movement", &self.movement)
            .field("velocity", &self.velocity)
            .field("grounded", &self.grounded)
            .field("state", &self.state)
            .field("health", &self.health)
            .field("lives", &self.lives)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ecs::command::CommandBuffer;
    use ember_ecs::entity::EntityId;
    use ember_ecs::input::{KeyboardState, NoInput};
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f64 = 1.0 / 64.0;

    fn step(ctrl: &mut PlayerController, transform: &mut Transform, input: &dyn InputState) {
        let mut commands = CommandBuffer::new();
        let mut ctx = ComponentContext {
            entity: EntityId::generate(),
            name: "player",
            transform,
            input,
            commands: &mut commands,
        };
        ctrl.update(&mut ctx, DT).unwrap();
    }

    fn keys_down(codes: &[&str]) -> KeyboardState {
        let mut kb = KeyboardState::new();
        for code in codes {
            kb.key_down(code);
        }
        kb
    }

    // -- 1. Top-down --------------------------------------------------------

    #[test]
    fn top_down_diagonal_is_normalized() {
        let mut ctrl = PlayerController::top_down();
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &keys_down(&["ArrowRight", "ArrowDown"]));
        assert!((ctrl.velocity().magnitude() - 200.0).abs() < 1e-9);
        assert!(t.position.x > 0.0 && t.position.y > 0.0);
        assert_eq!(ctrl.state(), PlayerState::Moving);
    }

    #[test]
    fn four_way_prefers_horizontal() {
        let mut ctrl = PlayerController::new(Movement::TopDown(TopDownSettings {
            speed: 100.0,
            eight_way: false,
        }));
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &keys_down(&["KeyA", "KeyW"]));
        assert_eq!(ctrl.velocity(), Vector2::new(-100.0, 0.0));
    }

    #[test]
    fn clamp_boundary_stops_at_wall() {
        let mut ctrl = PlayerController::top_down()
            .with_boundary(Boundary::clamp(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let mut t = Transform::at(99.0, 50.0);
        step(&mut ctrl, &mut t, &keys_down(&["ArrowRight"]));
        assert_eq!(t.position.x, 100.0);
        assert_eq!(ctrl.velocity().x, 0.0);
    }

    #[test]
    fn wrap_boundary_teleports() {
        let mut ctrl = PlayerController::top_down()
            .with_boundary(Boundary::wrap(Rect::new(0.0, 0.0, 100.0, 100.0)));
        let mut t = Transform::at(1.0, 50.0);
        step(&mut ctrl, &mut t, &keys_down(&["ArrowLeft"]));
        assert_eq!(t.position.x, 100.0);
        assert_eq!(ctrl.velocity().x, -200.0);
    }

    // -- 2. Platformer ------------------------------------------------------

    #[test]
    fn platformer_falls_under_gravity() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &NoInput);
        assert_eq!(ctrl.velocity().y, 980.0 * DT);
        assert_eq!(ctrl.state(), PlayerState::Falling);
    }

    #[test]
    fn jump_from_ground() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        ctrl.set_grounded(true);
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        assert_eq!(ctrl.velocity().y, -450.0);
        assert!(!ctrl.is_grounded());
        assert_eq!(ctrl.state(), PlayerState::Jumping);
    }

    #[test]
    fn no_jump_in_midair_after_coyote_window() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        ctrl.set_grounded(true);
        step(&mut ctrl, &mut t, &NoInput);
        ctrl.set_grounded(false);
        // 0.1 s coyote window is 6.4 steps of 1/64 s.
        for _ in 0..8 {
            step(&mut ctrl, &mut t, &NoInput);
        }
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        assert!(ctrl.velocity().y > 0.0);
    }

    #[test]
    fn coyote_jump_just_after_leaving_ground() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        ctrl.set_grounded(true);
        step(&mut ctrl, &mut t, &NoInput);
        ctrl.set_grounded(false);
        step(&mut ctrl, &mut t, &NoInput);
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        assert_eq!(ctrl.velocity().y, -450.0);
    }

    #[test]
    fn buffered_jump_fires_on_landing() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        let mut kb = keys_down(&["Space"]);
        step(&mut ctrl, &mut t, &kb);
        // Still airborne: the press is remembered.
        assert!(ctrl.velocity().y > 0.0);
        kb.advance();
        step(&mut ctrl, &mut t, &kb);
        ctrl.set_grounded(true);
        step(&mut ctrl, &mut t, &kb);
        assert_eq!(ctrl.velocity().y, -450.0);
    }

    #[test]
    fn only_one_jump_per_grounding() {
        let mut ctrl = PlayerController::platformer();
        let mut t = Transform::default();
        ctrl.set_grounded(true);
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        let after_jump = ctrl.velocity().y;
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        assert!(ctrl.velocity().y > after_jump);
    }

    #[test]
    fn landing_zeroes_fall_speed() {
        let mut ctrl = PlayerController::platformer();
        ctrl.set_velocity(Vector2::new(0.0, 300.0));
        ctrl.set_grounded(true);
        assert_eq!(ctrl.velocity().y, 0.0);
    }

    // -- 3. Other strategies ------------------------------------------------

    #[test]
    fn racing_accelerates_along_heading_then_coasts() {
        let mut ctrl = PlayerController::racing();
        let mut t = Transform::default();
        let gas = keys_down(&["ArrowUp"]);
        for _ in 0..4 {
            step(&mut ctrl, &mut t, &gas);
        }
        let v = ctrl.velocity();
        assert!(v.x > 0.0);
        assert!(v.y.abs() < 1e-9);

        for _ in 0..200 {
            step(&mut ctrl, &mut t, &NoInput);
        }
        assert_eq!(ctrl.velocity(), Vector2::ZERO);
    }

    #[test]
    fn racing_steers_only_while_moving() {
        let mut ctrl = PlayerController::racing();
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &keys_down(&["ArrowRight"]));
        assert_eq!(t.rotation, 0.0);
        step(&mut ctrl, &mut t, &keys_down(&["ArrowUp", "ArrowRight"]));
        assert!(t.rotation > 0.0);
    }

    #[test]
    fn side_scroller_adds_auto_scroll() {
        let mut ctrl = PlayerController::new(Movement::SideScroller(SideScrollerSettings {
            speed: 100.0,
            auto_scroll: Vector2::new(50.0, 0.0),
        }));
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &NoInput);
        assert_eq!(ctrl.velocity(), Vector2::new(50.0, 0.0));
    }

    #[test]
    fn flying_lift_overcomes_gravity() {
        let mut ctrl = PlayerController::flying();
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &keys_down(&["Space"]));
        assert!(ctrl.velocity().y < 0.0);
        step(&mut ctrl, &mut t, &NoInput);
        step(&mut ctrl, &mut t, &NoInput);
        assert!(ctrl.velocity().y > 0.0);
    }

    // -- 4. Health and state observer ---------------------------------------

    #[test]
    fn damage_respects_invulnerability_and_lives() {
        let mut ctrl = PlayerController::top_down()
            .with_health(10, 2)
            .with_spawn_point(Vector2::new(5.0, 5.0));
        assert!(ctrl.damage(4));
        assert!(!ctrl.damage(4), "still invulnerable");
        assert_eq!(ctrl.health(), 6);

        ctrl.invulnerability_time = 0.0;
        let mut t = Transform::at(80.0, 80.0);
        // Let the one-second window run out.
        for _ in 0..70 {
            step(&mut ctrl, &mut t, &NoInput);
        }
        assert!(!ctrl.is_invulnerable());
        assert!(ctrl.damage(6));
        assert_eq!(ctrl.lives(), 1);
        assert_eq!(ctrl.health(), 10);

        step(&mut ctrl, &mut t, &NoInput);
        assert_eq!(t.position, Vector2::new(5.0, 5.0));

        assert!(ctrl.damage(10));
        assert!(ctrl.is_dead());
        assert!(!ctrl.damage(1));
    }

    #[test]
    fn damage_and_heal_messages() {
        let mut ctrl = PlayerController::top_down().with_health(10, 1);
        let mut t = Transform::default();
        let mut commands = CommandBuffer::new();
        let mut ctx = ComponentContext {
            entity: EntityId::generate(),
            name: "player",
            transform: &mut t,
            input: &NoInput,
            commands: &mut commands,
        };
        ctrl.on_message(&mut ctx, "damage", &serde_json::json!({"amount": 7}))
            .unwrap();
        assert_eq!(ctrl.health(), 3);
        ctrl.on_message(&mut ctx, "heal", &serde_json::json!({"amount": 100}))
            .unwrap();
        assert_eq!(ctrl.health(), 10);
    }

    #[test]
    fn observer_sees_transitions() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut ctrl = PlayerController::top_down()
            .on_state_change(move |old, new| sink.borrow_mut().push((old, new)));
        let mut t = Transform::default();
        step(&mut ctrl, &mut t, &keys_down(&["KeyD"]));
        step(&mut ctrl, &mut t, &keys_down(&["KeyD"]));
        step(&mut ctrl, &mut t, &NoInput);
        assert_eq!(
            *seen.borrow(),
            vec![
                (PlayerState::Idle, PlayerState::Moving),
                (PlayerState::Moving, PlayerState::Idle),
            ]
        );
    }
}
