//! Collision layers and the layer-pair rule table.
//!
//! Every collider carries a layer label resolved against the fixed [`Layer`]
//! set. Before any narrow-phase test the collision engine asks the
//! [`LayerMatrix`] whether the two layers may collide at all. Rules are keyed
//! by `(min index, max index)`, so `can_collide(a, b) == can_collide(b, a)`
//! always holds, and a pair that was never given a rule does not collide.
//!
//! The matrix is owned by the [`Engine`](crate::engine::Engine) and passed by
//! reference into each scene step; there is no process-wide table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// The fixed set of collision layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Default,
    Player,
    Enemy,
    Platform,
    Collectible,
    Projectile,
    Trigger,
    Wall,
}

impl Layer {
    /// Every layer, in index order.
    pub const ALL: [Layer; 8] = [
        Layer::Default,
        Layer::Player,
        Layer::Enemy,
        Layer::Platform,
        Layer::Collectible,
        Layer::Projectile,
        Layer::Trigger,
        Layer::Wall,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Layer> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::Default => "default",
            Layer::Player => "player",
            Layer::Enemy => "enemy",
            Layer::Platform => "platform",
            Layer::Collectible => "collectible",
            Layer::Projectile => "projectile",
            Layer::Trigger => "trigger",
            Layer::Wall => "wall",
        }
    }

    /// Resolve a label, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Layer> {
        Self::ALL
            .iter()
            .copied()
            .find(|layer| layer.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// LayerRef
// ---------------------------------------------------------------------------

/// A layer given by name or numeric index, as hosts and config files supply
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerRef {
    Index(usize),
    Name(String),
}

impl LayerRef {
    pub fn resolve(&self) -> Result<Layer, EngineError> {
        match self {
            LayerRef::Index(index) => {
                Layer::from_index(*index).ok_or(EngineError::UnknownLayerIndex { index: *index })
            }
            LayerRef::Name(name) => Layer::from_name(name).ok_or_else(|| EngineError::UnknownLayer {
                name: name.clone(),
            }),
        }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRef::Index(index) => write!(f, "#{index}"),
            LayerRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<Layer> for LayerRef {
    fn from(layer: Layer) -> Self {
        LayerRef::Index(layer.index())
    }
}

impl From<usize> for LayerRef {
    fn from(index: usize) -> Self {
        LayerRef::Index(index)
    }
}

impl From<&str> for LayerRef {
    fn from(name: &str) -> Self {
        LayerRef::Name(name.to_owned())
    }
}

impl From<String> for LayerRef {
    fn from(name: String) -> Self {
        LayerRef::Name(name)
    }
}

/// One rule override, as carried by [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerRule {
    pub a: LayerRef,
    pub b: LayerRef,
    pub allowed: bool,
}

// ---------------------------------------------------------------------------
// LayerMatrix
// ---------------------------------------------------------------------------

/// Pairs seeded as colliding. `Default` is additionally seeded against every
/// layer, itself included.
const SEEDED_RULES: &[(Layer, Layer)] = &[
    (Layer::Player, Layer::Enemy),
    (Layer::Player, Layer::Platform),
    (Layer::Player, Layer::Collectible),
    (Layer::Player, Layer::Projectile),
    (Layer::Player, Layer::Trigger),
    (Layer::Player, Layer::Wall),
    (Layer::Enemy, Layer::Enemy),
    (Layer::Enemy, Layer::Platform),
    (Layer::Enemy, Layer::Projectile),
    (Layer::Enemy, Layer::Wall),
    (Layer::Projectile, Layer::Platform),
    (Layer::Projectile, Layer::Wall),
    (Layer::Collectible, Layer::Platform),
];

/// Order-independent layer-pair rules. Unlisted pairs are denied.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMatrix {
    rules: BTreeMap<(usize, usize), bool>,
}

impl Default for LayerMatrix {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl LayerMatrix {
    /// A matrix with no rules: nothing collides.
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// A matrix seeded with the default gameplay rules.
    pub fn with_defaults() -> Self {
        let mut matrix = Self::empty();
        for layer in Layer::ALL {
            matrix.set(Layer::Default, layer, true);
        }
        for &(a, b) in SEEDED_RULES {
            matrix.set(a, b, true);
        }
        matrix
    }

    fn key(a: Layer, b: Layer) -> (usize, usize) {
        let (a, b) = (a.index(), b.index());
        (a.min(b), a.max(b))
    }

    /// Store a rule for two resolved layers.
    pub fn set(&mut self, a: Layer, b: Layer, allowed: bool) {
        self.rules.insert(Self::key(a, b), allowed);
    }

    /// Store a rule for layers given by name or index. An unresolvable layer
    /// leaves the matrix unchanged and is logged.
    pub fn set_rule(
        &mut self,
        a: impl Into<LayerRef>,
        b: impl Into<LayerRef>,
        allowed: bool,
    ) -> Result<(), EngineError> {
        let (a, b) = (a.into(), b.into());
        let resolved = a.resolve().and_then(|la| Ok((la, b.resolve()?)));
        match resolved {
            Ok((la, lb)) => {
                self.set(la, lb, allowed);
                Ok(())
            }
            Err(e) => {
                warn!(layer_a = %a, layer_b = %b, error = %e, "collision rule ignored");
                Err(e)
            }
        }
    }

    /// Apply config overrides in order. Rules naming unknown layers are
    /// skipped; the returned errors describe them.
    pub fn apply_rules(&mut self, rules: &[LayerRule]) -> Vec<EngineError> {
        rules
            .iter()
            .filter_map(|rule| {
                self.set_rule(rule.a.clone(), rule.b.clone(), rule.allowed)
                    .err()
            })
            .collect()
    }

    pub fn can_collide(&self, a: Layer, b: Layer) -> bool {
        self.rules.get(&Self::key(a, b)).copied().unwrap_or(false)
    }

    /// [`can_collide`](Self::can_collide) for unresolved labels. A label that
    /// names no layer never collides.
    pub fn can_collide_ref(&self, a: impl Into<LayerRef>, b: impl Into<LayerRef>) -> bool {
        match (a.into().resolve(), b.into().resolve()) {
            (Ok(a), Ok(b)) => self.can_collide(a, b),
            _ => false,
        }
    }

    /// Number of stored rules, including explicit denials.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
