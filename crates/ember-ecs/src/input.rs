//! Read-only view of the input device state handed to components.
//!
//! Device polling lives outside the engine. The host forwards key events into
//! a [`KeyboardState`] and the engine advances its edge snapshot; components
//! only ever see the [`InputState`] trait.

use std::collections::HashSet;

// ---------------------------------------------------------------------------
// InputState
// ---------------------------------------------------------------------------

/// Key queries available to components. Key codes are the host's physical
/// key names (`"ArrowLeft"`, `"KeyA"`, `"Space"`, ...).
pub trait InputState {
    /// The key is currently held.
    fn is_key_down(&self, code: &str) -> bool;

    /// The key went down since the last edge advance.
    fn is_key_pressed(&self, code: &str) -> bool;

    /// The key went up since the last edge advance.
    fn is_key_released(&self, _code: &str) -> bool {
        false
    }

    /// Any of `codes` is held.
    fn any_down(&self, codes: &[String]) -> bool {
        codes.iter().any(|c| self.is_key_down(c))
    }

    /// Any of `codes` was pressed since the last edge advance.
    fn any_pressed(&self, codes: &[String]) -> bool {
        codes.iter().any(|c| self.is_key_pressed(c))
    }
}

/// An input device with no keys. Used for contexts outside the simulation
/// step (attach-time hooks, direct message dispatch).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

impl InputState for NoInput {
    fn is_key_down(&self, _code: &str) -> bool {
        false
    }

    fn is_key_pressed(&self, _code: &str) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// KeyboardState
// ---------------------------------------------------------------------------

/// Key-down set plus the snapshot taken at the previous edge advance.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    down: HashSet<String>,
    previous: HashSet<String>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host callback: a key went down.
    pub fn key_down(&mut self, code: &str) {
        self.down.insert(code.to_owned());
    }

    /// Host callback: a key went up.
    pub fn key_up(&mut self, code: &str) {
        self.down.remove(code);
    }

    /// Release every key (e.g. when the page loses focus).
    pub fn clear(&mut self) {
        self.down.clear();
    }

    /// Move the edge snapshot forward. After this call no key reads as
    /// pressed or released until the down set changes again.
    pub fn advance(&mut self) {
        self.previous.clone_from(&self.down);
    }
}

impl InputState for KeyboardState {
    fn is_key_down(&self, code: &str) -> bool {
        self.down.contains(code)
    }

    fn is_key_pressed(&self, code: &str) -> bool {
        self.down.contains(code) && !self.previous.contains(code)
    }

    fn is_key_released(&self, code: &str) -> bool {
        !self.down.contains(code) && self.previous.contains(code)
    }
}
