//! Compiled states.
//!
//! A [`State`] owns four sections of actions. Only the run section is
//! resumable; enter and exit run to completion inside a transition, and the
//! `@on` handlers are looked up one at a time by message key.
//!
//! Run section semantics, starting at `ExecutionState::action_index`:
//!
//! ```text
//! Done        -> index += 1, keep going in the same tick (Yield when none remain)
//! Yield       -> stop, index unchanged
//! Loop        -> index = 0, Yield
//! Transition  -> stop, bubble up to the machine
//! ```

use super::action::{BoxedAction, TickResult};
use super::context::{Context, ErrorCode};
use super::message_bus::MessageEnvelope;
use std::collections::HashMap;
use std::fmt;

pub struct State<T> {
    name: String,
    pub(crate) run_actions: Vec<BoxedAction<T>>,
    pub(crate) enter_actions: Vec<BoxedAction<T>>,
    pub(crate) exit_actions: Vec<BoxedAction<T>>,
    pub(crate) on_actions: HashMap<String, BoxedAction<T>>,
}

impl<T> State<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_actions: Vec::new(),
            enter_actions: Vec::new(),
            exit_actions: Vec::new(),
            on_actions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_run_action(&mut self, action: BoxedAction<T>) {
        self.run_actions.push(action);
    }

    pub fn add_enter_action(&mut self, action: BoxedAction<T>) {
        self.enter_actions.push(action);
    }

    pub fn add_exit_action(&mut self, action: BoxedAction<T>) {
        self.exit_actions.push(action);
    }

    /// Register the handler for `key`, replacing any previous one.
    pub fn add_on_action(&mut self, key: impl Into<String>, action: BoxedAction<T>) {
        self.on_actions.insert(key.into(), action);
    }

    pub fn run_len(&self) -> usize {
        self.run_actions.len()
    }

    pub fn enter_len(&self) -> usize {
        self.enter_actions.len()
    }

    pub fn exit_len(&self) -> usize {
        self.exit_actions.len()
    }

    /// Message keys with a registered handler, in no particular order.
    pub fn message_keys(&self) -> impl Iterator<Item = &str> {
        self.on_actions.keys().map(String::as_str)
    }

    /// Advance the run section from the context's action index.
    ///
    /// Never returns `Done` or `Loop`: the caller sees either `Yield` or a
    /// `Transition` to perform.
    pub fn tick(&self, context: &mut Context<T>) -> TickResult {
        while let Some(action) = self.run_actions.get(context.exec_state().action_index) {
            let result = action.tick(context);
            tracing::trace!(
                state = %self.name,
                action_index = context.exec_state().action_index,
                ?result,
                "run action ticked"
            );
            match result {
                TickResult::Done => context.exec_state_mut().action_index += 1,
                TickResult::Yield => return TickResult::Yield,
                TickResult::Loop => {
                    context.exec_state_mut().action_index = 0;
                    return TickResult::Yield;
                }
                TickResult::Transition(_) => return result,
            }
        }
        TickResult::Yield
    }

    /// Run every enter action; each one must return `Done`.
    pub fn enter(&self, context: &mut Context<T>) {
        run_to_completion(&self.enter_actions, context, ErrorCode::EnterActionDidNotReturnDone);
    }

    /// Run every exit action; each one must return `Done`.
    pub fn exit(&self, context: &mut Context<T>) {
        run_to_completion(&self.exit_actions, context, ErrorCode::ExitActionDidNotReturnDone);
    }

    /// Tick the handler registered for `envelope.key` once.
    ///
    /// Returns `Done` when there is no handler. A handler answering `Yield` or
    /// `Loop` is treated as `Done` and flagged on the context. The message is
    /// visible through [`Context::current_message`] only while the handler runs.
    pub fn send_message(&self, context: &mut Context<T>, envelope: &mut MessageEnvelope) -> TickResult {
        let Some(action) = self.on_actions.get(&envelope.key) else {
            return TickResult::Done;
        };

        context.lend_message(envelope);
        let result = action.tick(context);
        context.return_message(envelope);

        match result {
            TickResult::Done | TickResult::Transition(_) => result,
            TickResult::Yield | TickResult::Loop => {
                context.raise_error(ErrorCode::MessageHandlerInvalidResult);
                TickResult::Done
            }
        }
    }
}

fn run_to_completion<T>(actions: &[BoxedAction<T>], context: &mut Context<T>, code: ErrorCode) {
    for action in actions {
        if !action.tick(context).is_done() {
            context.raise_error(code);
        }
    }
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.message_keys().collect();
        keys.sort_unstable();
        f.debug_struct("State")
            .field("name", &self.name)
            .field("run_actions", &self.run_actions.len())
            .field("enter_actions", &self.enter_actions.len())
            .field("exit_actions", &self.exit_actions.len())
            .field("on_actions", &keys)
            .finish()
    }
}
