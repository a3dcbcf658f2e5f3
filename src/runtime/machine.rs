//! The compiled machine and its tick loop.
//!
//! ```text
//!             tick                                   tick
//! Uninitialized ──▶ enter action ──Transition(id)──▶ Active(id) ──▶ state.tick ──┐
//!                     │                                  ▲                        │
//!                     └─ anything else: fatal error      └──── Transition(id) ◀───┘
//!
//! transition(id): current.exit ─▶ state_id = id, action_index = 0 ─▶ new.enter
//! ```
//!
//! A machine is immutable once generated. All per-instance progress is stored
//! on the [`Context`], so one machine can drive any number of contexts, and can
//! be shared between threads as long as each context stays on one thread.

use super::action::{BoxedAction, TickResult};
use super::context::{Context, ErrorCode, StateId};
use super::message_bus::MessageEnvelope;
use super::state::State;
use std::fmt;

pub struct Machine<T> {
    name: String,
    states: Vec<State<T>>,
    enter_action: BoxedAction<T>,
}

impl<T> Machine<T> {
    /// Create a machine whose first tick runs `enter_action`, which must
    /// transition to the initial state.
    pub fn new(name: impl Into<String>, enter_action: BoxedAction<T>) -> Self {
        Self { name: name.into(), states: Vec::new(), enter_action }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a state. Its id is its position.
    pub fn add_state(&mut self, state: State<T>) -> StateId {
        self.states.push(state);
        (self.states.len() - 1) as StateId
    }

    pub fn states(&self) -> &[State<T>] {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> Option<&State<T>> {
        usize::try_from(id).ok().and_then(|idx| self.states.get(idx))
    }

    /// Look a state up by name, ignoring ASCII case.
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name().eq_ignore_ascii_case(name)).map(|idx| idx as StateId)
    }

    /// The state the context is currently in, if it points at one.
    pub fn current_state(&self, context: &Context<T>) -> Option<&State<T>> {
        self.state(context.exec_state().state_id)
    }

    /// Run the machine for one tick against `context`.
    pub fn tick(&self, context: &mut Context<T>) {
        context.reset_error();

        if context.exec_state().is_uninitialized() {
            match self.enter_action.tick(context) {
                TickResult::Transition(destination) => self.transition(context, destination),
                other => {
                    tracing::debug!(machine = %self.name, result = ?other, "enter action did not transition");
                    context.raise_error(ErrorCode::MachineActionMustReturnTransition);
                }
            }
            return;
        }

        let Some(state) = self.current_state(context) else {
            context.raise_error(ErrorCode::CurrentStateDoesNotExist);
            return;
        };
        if let TickResult::Transition(destination) = state.tick(context) {
            self.transition(context, destination);
        }
    }

    /// Deliver a message to the context's current state, bypassing the run
    /// section. A `Transition` answer is carried out before returning.
    pub fn send_message(&self, context: &mut Context<T>, envelope: &mut MessageEnvelope) -> TickResult {
        let Some(state) = self.current_state(context) else {
            return TickResult::Done;
        };
        let result = state.send_message(context, envelope);
        if let TickResult::Transition(destination) = result {
            self.transition(context, destination);
        }
        result
    }

    fn transition(&self, context: &mut Context<T>, destination: usize) {
        if let Some(current) = self.current_state(context) {
            current.exit(context);
        }

        // Indices past `StateId::MAX` cannot name a state either; they stick at the maximum.
        let state_id = StateId::try_from(destination).unwrap_or(StateId::MAX);
        let exec = context.exec_state_mut();
        exec.state_id = state_id;
        exec.action_index = 0;

        match self.state(state_id) {
            Some(next) => {
                tracing::debug!(machine = %self.name, state = %next.name(), "entered state");
                next.enter(context);
            }
            // The context stays on the invalid id until the host resets it.
            None => context.raise_error(ErrorCode::DestinationStateDoesNotExist),
        }
    }
}

impl<T> fmt::Debug for Machine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("states", &self.states)
            .field("enter_action", &"<action>")
            .finish()
    }
}
