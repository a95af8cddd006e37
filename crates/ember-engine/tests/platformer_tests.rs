//! Platformer movement against real platforms: landing, coyote time and
//! jump buffering, driven through `Engine::step` with keyboard input.

use ember_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FLOOR_TOP: f64 = 90.0;
const HALF: f64 = 8.0;

/// An engine with a 400x20 floor whose top edge sits at y = 90 and a 16x16
/// platformer hero centred at `(0, hero_y)`.
fn level(hero_y: f64) -> (Engine, EntityId, EntityId) {
    let mut engine = Engine::new(EngineConfig::default());
    let scene = engine.create_scene("level").unwrap();
    let floor = scene
        .spawn("floor")
        .at(0.0, 100.0)
        .with_collider(Collider::new(400.0, 20.0).with_layer("platform"))
        .build()
        .unwrap();
    let hero = scene
        .spawn("hero")
        .at(0.0, hero_y)
        .with_collider(Collider::new(16.0, 16.0).with_layer("player"))
        .with_controller(PlayerController::platformer())
        .build()
        .unwrap();
    engine.load_scene("level").unwrap();
    (engine, hero, floor)
}

fn controller(engine: &Engine, hero: EntityId) -> &PlayerController {
    engine
        .active_scene()
        .and_then(|s| s.get(hero))
        .and_then(|o| o.get_component::<PlayerController>())
        .unwrap()
}

fn bottom(engine: &Engine, hero: EntityId) -> f64 {
    engine.active_scene().unwrap().get(hero).unwrap().transform.position.y + HALF
}

fn jump_force() -> f64 {
    match Movement::defaults(MovementType::Platformer) {
        Movement::Platformer(s) => s.jump_force,
        other => panic!("unexpected movement {other:?}"),
    }
}

/// Stand the hero on the floor, then slide the floor out from under it.
fn stand_then_drop_floor() -> (Engine, EntityId) {
    let (mut engine, hero, floor) = level(FLOOR_TOP - HALF);
    engine.run_steps(5);
    assert!(controller(&engine, hero).is_grounded());
    let scene = engine.active_scene_mut().unwrap();
    scene.get_mut(floor).unwrap().transform.position.x = 10_000.0;
    (engine, hero)
}

fn press_jump_and_step(engine: &mut Engine) {
    engine.input_mut().key_down("Space");
    engine.step();
    engine.input_mut().key_up("Space");
}

// ---------------------------------------------------------------------------
// Landing
// ---------------------------------------------------------------------------

#[test]
fn falling_hero_lands_and_rests_on_the_floor() {
    let (mut engine, hero, _) = level(0.0);
    engine.run_steps(120);

    let c = controller(&engine, hero);
    assert!(c.is_grounded());
    assert_eq!(c.velocity().y, 0.0);
    assert_eq!(c.state(), PlayerState::Idle);

    let feet = bottom(&engine, hero);
    let tolerance = engine.config().resolution_epsilon;
    assert!(
        feet >= FLOOR_TOP - 1e-9 && feet <= FLOOR_TOP + tolerance + 1e-9,
        "feet at {feet}"
    );
}

#[test]
fn landed_hero_touches_the_floor() {
    let (mut engine, hero, floor) = level(0.0);
    engine.run_steps(120);

    let scene = engine.active_scene().unwrap();
    assert!(scene.physics().is_paired(hero, floor));
    assert!(bottom(&engine, hero) >= FLOOR_TOP);
    let touching = scene
        .get(hero)
        .and_then(|o| o.get_component::<Collider>())
        .unwrap()
        .currently_colliding();
    assert!(touching.contains(&floor));
}

#[test]
fn hero_stays_put_once_landed() {
    let (mut engine, hero, _) = level(0.0);
    engine.run_steps(120);
    let rested = bottom(&engine, hero);
    engine.run_steps(60);
    assert_eq!(bottom(&engine, hero), rested);
}

#[test]
fn falling_hero_reports_falling_state() {
    let (mut engine, hero, _) = level(-200.0);
    engine.run_steps(3);
    let c = controller(&engine, hero);
    assert!(!c.is_grounded());
    assert!(c.velocity().y > 0.0);
    assert_eq!(c.state(), PlayerState::Falling);
}

#[test]
fn grounded_jump_launches_upward() {
    let (mut engine, hero, _) = level(FLOOR_TOP - HALF);
    engine.run_steps(5);
    press_jump_and_step(&mut engine);

    let c = controller(&engine, hero);
    assert_eq!(c.velocity().y, -jump_force());
    assert_eq!(c.state(), PlayerState::Jumping);
}

// ---------------------------------------------------------------------------
// Coyote time
// ---------------------------------------------------------------------------

#[test]
fn jump_inside_coyote_window_is_honored() {
    let (mut engine, hero) = stand_then_drop_floor();
    // One step to notice the missing floor, one step airborne.
    engine.run_steps(2);
    assert!(!controller(&engine, hero).is_grounded());

    press_jump_and_step(&mut engine);
    assert_eq!(controller(&engine, hero).velocity().y, -jump_force());
}

#[test]
fn jump_after_coyote_window_is_ignored() {
    let (mut engine, hero) = stand_then_drop_floor();
    // 0.15 s of free fall at 60 Hz.
    engine.run_steps(10);

    press_jump_and_step(&mut engine);
    for _ in 0..10 {
        assert!(controller(&engine, hero).velocity().y > 0.0);
        engine.step();
    }
}

// ---------------------------------------------------------------------------
// Jump buffer
// ---------------------------------------------------------------------------

#[test]
fn jump_pressed_just_before_landing_fires_on_landing() {
    // Two pixels of air under the hero; pressed while airborne.
    let (mut engine, hero, _) = level(FLOOR_TOP - HALF - 2.0);
    press_jump_and_step(&mut engine);
    assert!(controller(&engine, hero).velocity().y > 0.0);

    let mut jumped = false;
    for _ in 0..8 {
        engine.step();
        if controller(&engine, hero).velocity().y == -jump_force() {
            jumped = true;
            break;
        }
    }
    assert!(jumped, "buffered jump never fired");
}

#[test]
fn no_jump_without_a_press() {
    let (mut engine, hero, _) = level(FLOOR_TOP - HALF - 2.0);
    for _ in 0..30 {
        engine.step();
        assert!(controller(&engine, hero).velocity().y >= 0.0);
    }
    assert!(controller(&engine, hero).is_grounded());
}

#[test]
fn stale_press_expires_before_landing() {
    // Roughly 0.4 s of fall: far longer than the 0.1 s buffer.
    let (mut engine, hero, _) = level(0.0);
    press_jump_and_step(&mut engine);
    for _ in 0..120 {
        engine.step();
        assert!(controller(&engine, hero).velocity().y >= 0.0);
    }
    assert!(controller(&engine, hero).is_grounded());
}

// ---------------------------------------------------------------------------
// Horizontal input
// ---------------------------------------------------------------------------

#[test]
fn held_arrow_walks_the_hero() {
    let (mut engine, hero, _) = level(FLOOR_TOP - HALF);
    engine.run_steps(2);
    engine.input_mut().key_down("ArrowRight");
    engine.run_steps(30);

    let c = controller(&engine, hero);
    assert_eq!(c.state(), PlayerState::Moving);
    let x = engine.active_scene().unwrap().get(hero).unwrap().transform.position.x;
    assert!((x - 100.0).abs() < 1e-6, "walked to {x}");
}
