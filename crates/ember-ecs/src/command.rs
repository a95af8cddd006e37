//! Deferred scene mutations.
//!
//! While a component runs it only has access to its own entity. Anything that
//! touches another entity (messages, destruction, activation) is queued as a
//! [`SceneCommand`] in the entity's [`CommandBuffer`]. The scene drains every
//! buffer after each phase and applies the commands in FIFO order, so a
//! command queued during `update` is visible to `late_update`.
//!
//! # Example
//!
//! ```
//! use ember_ecs::command::{CommandBuffer, SceneCommand};
//! use ember_ecs::entity::EntityId;
//!
//! let target = EntityId::generate();
//! let mut buf = CommandBuffer::new();
//! buf.send_message(target, "damage", serde_json::json!({"amount": 5}));
//! buf.destroy(target);
//!
//! let drained = buf.drain();
//! assert_eq!(drained.len(), 2);
//! assert!(matches!(drained[1], SceneCommand::Destroy(id) if id == target));
//! assert!(buf.is_empty());
//! ```

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// SceneCommand
// ---------------------------------------------------------------------------

/// A queued mutation addressed to the owning scene.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    /// Deliver a message to every enabled component of `target`.
    SendMessage {
        target: EntityId,
        name: String,
        data: serde_json::Value,
    },
    /// Deliver a message to every active entity in the scene.
    Broadcast {
        name: String,
        data: serde_json::Value,
    },
    /// Destroy an entity (fires `on_destroy` on its components).
    Destroy(EntityId),
    /// Activate or deactivate an entity.
    SetActive(EntityId, bool),
}

impl SceneCommand {
    /// The entity this command addresses, if any.
    pub fn target(&self) -> Option<EntityId> {
        match self {
            SceneCommand::SendMessage { target, .. } => Some(*target),
            SceneCommand::Destroy(id) | SceneCommand::SetActive(id, _) => Some(*id),
            SceneCommand::Broadcast { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// FIFO queue of [`SceneCommand`]s.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<SceneCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_message(&mut self, target: EntityId, name: &str, data: serde_json::Value) {
        self.commands.push(SceneCommand::SendMessage {
            target,
            name: name.to_owned(),
            data,
        });
    }

    pub fn broadcast(&mut self, name: &str, data: serde_json::Value) {
        self.commands.push(SceneCommand::Broadcast {
            name: name.to_owned(),
            data,
        });
    }

    pub fn destroy(&mut self, target: EntityId) {
        self.commands.push(SceneCommand::Destroy(target));
    }

    pub fn set_active(&mut self, target: EntityId, active: bool) {
        self.commands.push(SceneCommand::SetActive(target, active));
    }

    /// Queue an already-built command.
    pub fn push(&mut self, command: SceneCommand) {
        self.commands.push(command);
    }

    /// Move every queued command out in FIFO order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Append all commands from `other`, preserving order.
    pub fn append(&mut self, other: &mut CommandBuffer) {
        self.commands.append(&mut other.commands);
    }

    pub fn commands(&self) -> &[SceneCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
