//! Scene snapshots and BLAKE3 state hashing.
//!
//! A [`SceneSnapshot`] records every entity's id, name, active flag and
//! transform, plus a BLAKE3 hex digest. The digest covers an id-free
//! projection (names, flags and transforms in scene order, plus the tick), so
//! two independently built scenes that simulate identically hash
//! identically even though their entity ids differ.
//!
//! ```
//! use ember_engine::prelude::*;
//!
//! let build = || {
//!     let mut scene = Scene::new("run", &EngineConfig::default());
//!     scene.spawn("box").at(0.0, 0.0).build().unwrap();
//!     scene
//! };
//! let (a, b) = (build(), build());
//! assert_eq!(a.state_hash(), b.state_hash());
//! assert_eq!(a.capture_snapshot().hash.len(), 64);
//! ```
//!
//! Components are not captured; restoring writes transforms back onto
//! entities that still exist.

use ember_ecs::entity::EntityId;
use ember_ecs::transform::Transform;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::scene::Scene;
use crate::EngineError;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Raw entity id.
    pub id: u64,
    pub name: String,
    pub active: bool,
    pub transform: Transform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub scene: String,
    pub tick: u64,
    pub entities: Vec<EntitySnapshot>,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the id-free state.
    pub hash: String,
}

impl SceneSnapshot {
    /// Whether `hash` still matches the recorded entities.
    pub fn verify(&self) -> bool {
        compute_hash(self.tick, &self.entities) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

fn compute_hash(tick: u64, entities: &[EntitySnapshot]) -> String {
    #[derive(Serialize)]
    struct HashableEntity<'a> {
        name: &'a str,
        active: bool,
        transform: &'a Transform,
    }

    #[derive(Serialize)]
    struct HashableState<'a> {
        tick: u64,
        entities: Vec<HashableEntity<'a>>,
    }

    let hashable = HashableState {
        tick,
        entities: entities
            .iter()
            .map(|e| HashableEntity {
                name: &e.name,
                active: e.active,
                transform: &e.transform,
            })
            .collect(),
    };

    let json_bytes = serde_json::to_vec(&hashable)
        .expect("scene state should always be JSON-serializable");

    blake3::hash(&json_bytes).to_hex().to_string()
}

// ---------------------------------------------------------------------------
// Scene snapshot methods
// ---------------------------------------------------------------------------

impl Scene {
    pub fn capture_snapshot(&self) -> SceneSnapshot {
        let entities: Vec<EntitySnapshot> = self
            .objects()
            .iter()
            .map(|o| EntitySnapshot {
                id: o.id().to_raw(),
                name: o.name().to_owned(),
                active: o.is_active(),
                transform: o.transform,
            })
            .collect();
        let hash = compute_hash(self.tick_count(), &entities);
        SceneSnapshot {
            scene: self.name().to_owned(),
            tick: self.tick_count(),
            entities,
            hash,
        }
    }

    /// BLAKE3 digest of the current state; equal to
    /// `capture_snapshot().hash`.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }

    /// Write recorded transforms and active flags back by entity id.
    /// Entities missing from this scene are logged and skipped. Returns how
    /// many entities were restored.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SnapshotMismatch`] without touching the scene
    /// if the snapshot's hash does not match its contents.
    pub fn restore_transforms(&mut self, snapshot: &SceneSnapshot) -> Result<usize, EngineError> {
        let computed = compute_hash(snapshot.tick, &snapshot.entities);
        if computed != snapshot.hash {
            warn!(scene = %self.name(), recorded = %snapshot.hash, %computed, "snapshot rejected");
            return Err(EngineError::SnapshotMismatch {
                recorded: snapshot.hash.clone(),
                computed,
            });
        }

        let mut restored = 0;
        for entry in &snapshot.entities {
            let id = EntityId::from_raw(entry.id);
            match self.get_mut(id) {
                Some(obj) => {
                    obj.transform = entry.transform;
                    obj.set_active(entry.active);
                    restored += 1;
                }
                None => warn!(entity = %id, name = %entry.name, "snapshot entity not in scene; skipped"),
            }
        }
        Ok(restored)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::layers::LayerMatrix;
    use ember_ecs::input::NoInput;
    use ember_ecs::vector::Vector2;

    fn scene_with_box() -> (Scene, EntityId) {
        let mut scene = Scene::new("snap", &EngineConfig::default());
        let id = scene.spawn("box").at(1.0, 2.0).build().unwrap();
        (scene, id)
    }

    #[test]
    fn snapshot_captures_entities() {
        let (scene, id) = scene_with_box();
        let snap = scene.capture_snapshot();
        assert_eq!(snap.scene, "snap");
        assert_eq!(snap.entities.len(), 1);
        assert_eq!(snap.entities[0].id, id.to_raw());
        assert_eq!(snap.entities[0].transform.position, Vector2::new(1.0, 2.0));
        assert!(snap.verify());
    }

    #[test]
    fn hash_tracks_state_and_tick() {
        let (mut scene, id) = scene_with_box();
        let before = scene.state_hash();
        scene.get_mut(id).unwrap().transform.position.x = 5.0;
        let moved = scene.state_hash();
        assert_ne!(before, moved);

        scene.fixed_update(1.0 / 64.0, &NoInput, &LayerMatrix::default());
        assert_ne!(moved, scene.state_hash());
    }

    #[test]
    fn restore_rewinds_transforms() {
        let (mut scene, id) = scene_with_box();
        let snap = scene.capture_snapshot();
        let obj = scene.get_mut(id).unwrap();
        obj.transform.position = Vector2::new(50.0, 50.0);
        obj.set_active(false);

        assert_eq!(scene.restore_transforms(&snap).unwrap(), 1);
        let obj = scene.get(id).unwrap();
        assert_eq!(obj.transform.position, Vector2::new(1.0, 2.0));
        assert!(obj.is_active());
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let (mut scene, id) = scene_with_box();
        let mut snap = scene.capture_snapshot();
        snap.entities[0].transform.position.x = 99.0;
        assert!(!snap.verify());
        assert!(matches!(
            scene.restore_transforms(&snap),
            Err(EngineError::SnapshotMismatch { .. })
        ));
        assert_eq!(scene.get(id).unwrap().transform.position.x, 1.0);
    }

    #[test]
    fn unknown_entities_are_skipped() {
        let (scene, _) = scene_with_box();
        let snap = scene.capture_snapshot();
        let (mut other, _) = scene_with_box();
        assert_eq!(other.restore_transforms(&snap).unwrap(), 0);
        // Same projection, different ids.
        assert_eq!(other.state_hash(), snap.hash);
    }
}
