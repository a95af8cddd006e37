//! Headless platformer run -- a hero walks right, hops a gap and picks up coins.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example headless_platformer -p ember-engine
//!
//! Drives the engine with a synthetic 60 Hz clock, logs collisions and audio
//! requests, and prints the final state hash.

use ember_engine::prelude::*;
use tracing::info;

// ---------------------------------------------------------------------------
// Game components
// ---------------------------------------------------------------------------

/// Removes its entity with a sound when the player touches it.
struct Pickup {
    value: u32,
}

impl Component for Pickup {
    fn on_collision_enter(
        &mut self,
        ctx: &mut ComponentContext<'_>,
        collision: &Collision,
    ) -> ComponentResult {
        if collision.other_layer == "player" {
            info!(coin = ctx.name, by = %collision.other_name, value = self.value, "picked up");
            ctx.commands
                .send_message(ctx.entity, "play_sound", serde_json::Value::Null);
            ctx.commands.destroy(ctx.entity);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

fn build_level(engine: &mut Engine) -> anyhow::Result<EntityId> {
    let scene = engine.create_scene("meadow")?;

    for (name, x, width) in [("ground-a", 100.0, 300.0), ("ground-b", 420.0, 240.0)] {
        scene
            .spawn(name)
            .at(x, 110.0)
            .with_visual(Visual::rect(width, 20.0, Color::BLACK))
            .with_collider(Collider::new(width, 20.0).with_layer("platform"))
            .build()?;
    }

    let hero = scene
        .spawn("hero")
        .at(0.0, 88.0)
        .with_visual(Visual::rect(16.0, 24.0, Color::WHITE).with_z_order(10))
        .with_collider(Collider::new(16.0, 24.0).with_layer("player"))
        .with_controller(PlayerController::platformer())
        .build()?;

    for (i, x) in [80.0, 180.0, 380.0].into_iter().enumerate() {
        scene
            .spawn(&format!("coin-{i}"))
            .at(x, 88.0)
            .with_visual(Visual::rect(8.0, 8.0, Color::MAGENTA))
            .with_collider(Collider::new(8.0, 8.0).with_layer("collectible").trigger())
            .with_audio(AudioSource::new("coin.wav"))
            .with_component(Pickup { value: 10 })
            .build()?;
    }

    engine.load_scene("meadow")?;
    Ok(hero)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    ember_engine::init_logging();

    let mut engine = Engine::new(EngineConfig::default());
    let hero = build_level(&mut engine)?;

    let mut drawn = 0usize;
    let mut sink = |frame: &RenderFrame| drawn += frame.visible().count();

    engine.input_mut().key_down("ArrowRight");
    engine.start(0.0);

    for frame in 1..=180u32 {
        let now = f64::from(frame) / 60.0;
        // Jump just before the gap between the two ground strips.
        if frame == 60 {
            engine.input_mut().key_down("Space");
        } else if frame == 62 {
            engine.input_mut().key_up("Space");
        }
        engine.frame(now, &mut sink);

        if let Some(scene) = engine.active_scene_mut() {
            for (entity, request) in scene.take_audio_requests() {
                info!(%entity, ?request, "audio");
            }
        }
    }

    let scene = engine
        .active_scene()
        .ok_or(EngineError::NoActiveScene)?;
    let coins_left = scene
        .objects()
        .iter()
        .filter(|o| o.name().starts_with("coin-"))
        .count();
    let hero_pos = scene
        .get(hero)
        .map(|o| o.transform.position)
        .unwrap_or_default();

    info!(
        ticks = engine.tick_count(),
        coins_left,
        x = hero_pos.x,
        y = hero_pos.y,
        items_drawn = drawn,
        "run finished"
    );
    println!("state hash: {}", engine.state_hash()?);
    Ok(())
}
