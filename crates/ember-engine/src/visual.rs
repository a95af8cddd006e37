//! Visual data and the render collaborator boundary.
//!
//! The engine draws nothing. After the fixed-step loop drains, the scene is
//! flattened into a [`RenderFrame`] (a pure function of scene state, usable
//! headless) and handed once to the host's [`RenderSink`].

use ember_ecs::component::{Capability, Component};
use ember_ecs::entity::EntityId;
use ember_ecs::transform::Transform;
use ember_ecs::vector::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// RGBA color, each channel `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Color = Color([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Color = Color([0.0, 0.0, 0.0, 1.0]);
    /// Fallback for anything without a color of its own: #CC33CC.
    pub const MAGENTA: Color = Color([0.8, 0.2, 0.8, 1.0]);

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color([r, g, b, a])
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 && digits.len() != 8 {
            return None;
        }
        let channel = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .map(|v| f32::from(v) / 255.0)
        };
        let alpha = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Some(Color([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::MAGENTA
    }
}

// ---------------------------------------------------------------------------
// Visual
// ---------------------------------------------------------------------------

/// How a visual should be drawn once resources are known.
#[derive(Debug, Clone, PartialEq)]
pub enum Appearance {
    Sprite(String),
    Solid(Color),
}

/// Drawable description of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Visual {
    pub color: Color,
    /// Full size before the transform's scale.
    pub size: Vector2,
    /// Asset key of a sprite, if any.
    pub sprite: Option<String>,
    /// Higher draws later.
    pub z_order: i32,
    pub visible: bool,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            color: Color::default(),
            size: Vector2::new(32.0, 32.0),
            sprite: None,
            z_order: 0,
            visible: true,
        }
    }
}

impl Visual {
    /// A solid rectangle.
    pub fn rect(width: f64, height: f64, color: Color) -> Self {
        Self {
            color,
            size: Vector2::new(width, height),
            ..Default::default()
        }
    }

    pub fn with_sprite(mut self, key: &str) -> Self {
        self.sprite = Some(key.to_owned());
        self
    }

    pub fn with_z_order(mut self, z: i32) -> Self {
        self.z_order = z;
        self
    }

    /// Resolve against the host's loaded assets. A sprite that is not loaded
    /// degrades to the solid color.
    pub fn appearance(&self, is_loaded: impl Fn(&str) -> bool) -> Appearance {
        match self.sprite.as_deref() {
            Some(key) if is_loaded(key) => Appearance::Sprite(key.to_owned()),
            _ => Appearance::Solid(self.color),
        }
    }
}

impl Component for Visual {
    fn type_name(&self) -> &'static str {
        "Visual"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Visual]
    }
}

// ---------------------------------------------------------------------------
// RenderFrame
// ---------------------------------------------------------------------------

/// One active entity as the renderer sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    pub entity: EntityId,
    pub name: String,
    pub transform: Transform,
    pub visual: Option<Visual>,
}

impl RenderItem {
    pub fn z_order(&self) -> i32 {
        self.visual.as_ref().map_or(0, |v| v.z_order)
    }
}

/// Everything drawn for one host callback, sorted by z-order (stable, so
/// equal z keeps scene order).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderFrame {
    /// Fixed steps simulated so far.
    pub tick: u64,
    /// Leftover accumulator as a fraction of a step, for hosts that
    /// interpolate.
    pub alpha: f64,
    pub items: Vec<RenderItem>,
}

impl RenderFrame {
    pub fn new(tick: u64, alpha: f64, mut items: Vec<RenderItem>) -> Self {
        items.sort_by_key(RenderItem::z_order);
        Self { tick, alpha, items }
    }

    /// Items with a visible visual.
    pub fn visible(&self) -> impl Iterator<Item = &RenderItem> {
        self.items
            .iter()
            .filter(|item| item.visual.as_ref().is_some_and(|v| v.visible))
    }
}

/// The rendering collaborator. Called once per host callback.
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame);
}

impl<F: FnMut(&RenderFrame)> RenderSink for F {
    fn render(&mut self, frame: &RenderFrame) {
        self(frame)
    }
}

/// Discards every frame (headless runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn render(&mut self, _frame: &RenderFrame) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        assert_eq!(Color::from_hex("#ffffff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("000000ff"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#12345"), None);
        assert_eq!(Color::from_hex("#gg0000"), None);
    }

    #[test]
    fn missing_sprite_degrades_to_color() {
        let visual = Visual::rect(10.0, 10.0, Color::WHITE).with_sprite("hero.png");
        assert_eq!(
            visual.appearance(|key| key == "hero.png"),
            Appearance::Sprite("hero.png".to_owned())
        );
        assert_eq!(visual.appearance(|_| false), Appearance::Solid(Color::WHITE));
    }

    #[test]
    fn frame_sorts_by_z_order_stably() {
        let item = |name: &str, z: Option<i32>| RenderItem {
            entity: EntityId::generate(),
            name: name.to_owned(),
            transform: Transform::default(),
            visual: z.map(|z| Visual::default().with_z_order(z)),
        };
        let frame = RenderFrame::new(
            3,
            0.5,
            vec![item("top", Some(5)), item("a", None), item("back", Some(-1)), item("b", Some(0))],
        );
        let names: Vec<&str> = frame.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["back", "a", "b", "top"]);
        assert_eq!(frame.visible().count(), 3);
    }

    #[test]
    fn closures_are_sinks() {
        let mut frames = 0;
        {
            let mut sink = |_: &RenderFrame| frames += 1;
            sink.render(&RenderFrame::default());
            sink.render(&RenderFrame::default());
        }
        assert_eq!(frames, 2);
    }
}
