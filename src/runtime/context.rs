//! Per-instance execution record.
//!
//! One compiled [`Machine`](super::Machine) is shared by many running
//! instances; each instance is a [`Context`]. The machine only ever reads and
//! writes three things on it: the [`ExecutionState`] cursor, the last error,
//! and the message currently being dispatched. Everything else belongs to the
//! caller through [`Context::data`].

use super::message_bus::MessageEnvelope;
use std::mem;
use thiserror::Error;

/// Index of a compiled state, in declaration order.
pub type StateId = i32;

/// `ExecutionState::state_id` value of a context whose machine has not been entered yet.
pub const UNINITIALIZED: StateId = -1;

/// Where an instance currently is: which state, and which run action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionState {
    pub state_id: StateId,
    /// Cursor into the current state's run section.
    pub action_index: usize,
}

impl ExecutionState {
    pub fn is_uninitialized(&self) -> bool {
        self.state_id == UNINITIALIZED
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self { state_id: UNINITIALIZED, action_index: 0 }
    }
}

/// Runtime errors recorded on a context.
///
/// These never unwind; a host ticking many instances inspects
/// [`Context::last_error`] after each call and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("an @enter action did not return done")]
    EnterActionDidNotReturnDone,
    #[error("an @exit action did not return done")]
    ExitActionDidNotReturnDone,
    #[error("a message handler returned yield or loop")]
    MessageHandlerInvalidResult,
    #[error("the machine's enter action must return a transition")]
    MachineActionMustReturnTransition,
    #[error("the current state does not exist")]
    CurrentStateDoesNotExist,
    #[error("the destination state does not exist")]
    DestinationStateDoesNotExist,
}

impl ErrorCode {
    /// Fatal errors abort the tick and may leave the context stuck until reset.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::MachineActionMustReturnTransition
                | ErrorCode::CurrentStateDoesNotExist
                | ErrorCode::DestinationStateDoesNotExist
        )
    }
}

/// A running instance of a machine.
#[derive(Debug, Clone)]
pub struct Context<T = ()> {
    exec_state: ExecutionState,
    last_error: Option<ErrorCode>,
    message: MessageEnvelope,
    has_message: bool,
    /// Caller-owned payload (blackboard, agent handle, ...).
    pub data: T,
}

impl<T> Context<T> {
    pub fn new(data: T) -> Self {
        Self {
            exec_state: ExecutionState::default(),
            last_error: None,
            message: MessageEnvelope::default(),
            has_message: false,
            data,
        }
    }

    pub fn exec_state(&self) -> &ExecutionState {
        &self.exec_state
    }

    pub fn exec_state_mut(&mut self) -> &mut ExecutionState {
        &mut self.exec_state
    }

    pub fn last_error(&self) -> Option<ErrorCode> {
        self.last_error
    }

    pub fn raise_error(&mut self, code: ErrorCode) {
        tracing::warn!(error = %code, state_id = self.exec_state.state_id, "runtime error raised");
        self.last_error = Some(code);
    }

    pub fn reset_error(&mut self) {
        self.last_error = None;
    }

    /// The message being dispatched, visible to the handler while it ticks.
    pub fn current_message(&self) -> Option<&MessageEnvelope> {
        self.has_message.then_some(&self.message)
    }

    /// Swap `envelope` into the message slot for the length of one handler call.
    pub(crate) fn lend_message(&mut self, envelope: &mut MessageEnvelope) {
        mem::swap(&mut self.message, envelope);
        self.has_message = true;
    }

    /// Swap the lent envelope back out. `envelope` must be the one passed to `lend_message`.
    pub(crate) fn return_message(&mut self, envelope: &mut MessageEnvelope) {
        mem::swap(&mut self.message, envelope);
        self.has_message = false;
    }

    /// Return to the uninitialized position: the next tick re-enters the machine.
    ///
    /// This is how a host recovers an instance left on an invalid state.
    pub fn reset(&mut self) {
        self.exec_state = ExecutionState::default();
        self.last_error = None;
        self.has_message = false;
    }
}

impl<T: Default> Default for Context<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
