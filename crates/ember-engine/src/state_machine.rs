//! Named-state behavior component.
//!
//! A [`StateMachine`] holds named [`State`]s, each with optional enter,
//! update and exit hooks. The update hook may name the next state. Requests
//! from outside a hook ([`StateMachine::transition`] or a `"transition"`
//! message) are validated immediately and applied at the start of the next
//! update, where the hooks have access to the owning entity.

use std::fmt;

use ember_ecs::component::{Capability, Component, ComponentContext, ComponentResult};
use tracing::{debug, warn};

use crate::EngineError;

type EnterFn = Box<dyn FnMut(&mut ComponentContext<'_>)>;
type UpdateFn = Box<dyn FnMut(&mut ComponentContext<'_>, f64) -> Option<String>>;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// One named state and its hooks.
pub struct State {
    name: String,
    on_enter: Option<EnterFn>,
    on_update: Option<UpdateFn>,
    on_exit: Option<EnterFn>,
}

impl State {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            on_enter: None,
            on_update: None,
            on_exit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_enter(mut self, hook: impl FnMut(&mut ComponentContext<'_>) + 'static) -> Self {
        self.on_enter = Some(Box::new(hook));
        self
    }

    /// Runs every update while active. Returning `Some(name)` switches to
    /// that state.
    pub fn on_update(
        mut self,
        hook: impl FnMut(&mut ComponentContext<'_>, f64) -> Option<String> + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    pub fn on_exit(mut self, hook: impl FnMut(&mut ComponentContext<'_>) + 'static) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State").field("name", &self.name).finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StateMachine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StateMachine {
    states: Vec<State>,
    initial: Option<usize>,
    current: Option<usize>,
    pending: Option<usize>,
    time_in_state: f64,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state. The first state added is the initial one unless
    /// [`with_initial`](Self::with_initial) says otherwise. A state with an
    /// existing name replaces it.
    pub fn with_state(mut self, state: State) -> Self {
        self.add_state(state);
        self
    }

    pub fn add_state(&mut self, state: State) {
        match self.index_of(&state.name) {
            Some(index) => self.states[index] = state,
            None => {
                self.states.push(state);
                if self.initial.is_none() {
                    self.initial = Some(self.states.len() - 1);
                }
            }
        }
    }

    /// Choose the state entered on start. An unknown name is logged and
    /// ignored.
    pub fn with_initial(mut self, name: &str) -> Self {
        match self.index_of(name) {
            Some(index) => self.initial = Some(index),
            None => warn!(state = name, "initial state does not exist; keeping previous"),
        }
        self
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    /// Name of the active state.
    pub fn current(&self) -> Option<&str> {
        self.current.map(|i| self.states[i].name.as_str())
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Seconds since the active state was entered.
    pub fn time_in_state(&self) -> f64 {
        self.time_in_state
    }

    /// Request a switch, applied at the next update. An unknown state is a
    /// logged no-op.
    pub fn transition(&mut self, name: &str) -> Result<(), EngineError> {
        match self.index_of(name) {
            Some(index) => {
                self.pending = Some(index);
                Ok(())
            }
            None => {
                warn!(state = name, "state transition ignored: unknown state");
                Err(EngineError::UnknownState {
                    state: name.to_owned(),
                })
            }
        }
    }

    fn switch_to(&mut self, next: usize, ctx: &mut ComponentContext<'_>) {
        if let Some(prev) = self.current {
            if let Some(exit) = self.states[prev].on_exit.as_mut() {
                exit(ctx);
            }
        }
        debug!(
            entity = %ctx.entity,
            from = self.current().unwrap_or("<none>"),
            to = %self.states[next].name,
            "state transition"
        );
        self.current = Some(next);
        self.time_in_state = 0.0;
        if let Some(enter) = self.states[next].on_enter.as_mut() {
            enter(ctx);
        }
    }
}

impl Component for StateMachine {
    fn type_name(&self) -> &'static str {
        "StateMachine"
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::StateMachine]
    }

    fn start(&mut self, ctx: &mut ComponentContext<'_>) -> ComponentResult {
        if self.current.is_none() {
            if let Some(initial) = self.initial {
                self.switch_to(initial, ctx);
            }
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) -> ComponentResult {
        if let Some(next) = self.pending.take() {
            self.switch_to(next, ctx);
        }
        let Some(current) = self.current else {
            return Ok(());
        };
        self.time_in_state += dt;
        let requested = self.states[current]
            .on_update
            .as_mut()
            .and_then(|update| update(ctx, dt));
        if let Some(name) = requested {
            match self.index_of(&name) {
                Some(next) => self.switch_to(next, ctx),
                None => warn!(
                    entity = %ctx.entity,
                    state = %name,
                    "state transition ignored: unknown state"
                ),
            }
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        _ctx: &mut ComponentContext<'_>,
        name: &str,
        data: &serde_json::Value,
    ) -> ComponentResult {
        if name == "transition" {
            if let Some(state) = data.get("state").and_then(serde_json::Value::as_str) {
                // Unknown states are already logged by `transition`.
                let _ = self.transition(state);
            }
        }
        Ok(())
    }
}
