//! Entity, scene and component identifiers.
//!
//! An [`EntityId`] is a 64-bit handle drawn from a process-wide monotonic
//! counter, so two entities never share an id for the lifetime of the
//! process, even across scenes. Ids are never recycled.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A unique entity identifier. Ordering follows creation order, which the
/// collision engine relies on for order-independent pair keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Draw a fresh id from the process-wide counter.
    pub fn generate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64` (e.g. when restoring a snapshot).
    ///
    /// The counter is advanced past `raw` so later [`generate`](Self::generate)
    /// calls cannot collide with the restored id.
    pub fn from_raw(raw: u64) -> Self {
        NEXT_ENTITY_ID.fetch_max(raw.saturating_add(1), Ordering::Relaxed);
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SceneId
// ---------------------------------------------------------------------------

/// Identifier of the scene that owns an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub u32);

impl SceneId {
    /// Draw a fresh id from the process-wide scene counter.
    pub fn generate() -> Self {
        Self(NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ComponentId
// ---------------------------------------------------------------------------

/// Handle to a component attached to a specific [`GameObject`](crate::object::GameObject).
///
/// Only meaningful for the object that issued it. Handles are not reused
/// within an object, so a stale handle never aliases a newer component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_increasing() {
        let ids: Vec<EntityId> = (0..100).map(|_| EntityId::generate()).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn from_raw_advances_counter() {
        let far = EntityId::generate().to_raw() + 1_000;
        let restored = EntityId::from_raw(far);
        let next = EntityId::generate();
        assert!(next > restored, "{next:?} should come after {restored:?}");
    }

    #[test]
    fn raw_roundtrip() {
        let id = EntityId::generate();
        assert_eq!(EntityId::from_raw(id.to_raw()), id);
    }
}
