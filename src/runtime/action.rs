//! The action contract.
//!
//! An [`Action`] is the smallest unit of execution. It is built once by the
//! generator from a script line such as `wait ticks: 3` and is then shared by
//! every context that runs the compiled machine, so it may only hold the
//! configuration it was bound with. Anything that changes from tick to tick
//! lives on the [`Context`].
//!
//! Actions talk to their caller exclusively through [`TickResult`]:
//!
//! ```text
//! Done        -> advance to the next action (same tick)
//! Yield       -> stop here, resume at this action next tick
//! Loop        -> restart the run section next tick
//! Transition  -> leave the state (exit, switch, enter)
//! ```

use super::context::Context;

/// Control-flow outcome of ticking an action, a state, or a machine.
///
/// `Transition` carries the index of the destination state. Indices are
/// unsigned, so a transition can never name the uninitialized position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickResult {
    Yield,
    Done,
    Loop,
    Transition(usize),
}

impl TickResult {
    /// Shorthand for `TickResult::Transition(destination.index())`.
    pub fn transition_to(destination: TransitionDestination) -> Self {
        TickResult::Transition(destination.index())
    }

    pub fn is_done(self) -> bool {
        matches!(self, TickResult::Done)
    }
}

/// A resolved transition target bound into an action at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionDestination {
    index: usize,
}

impl TransitionDestination {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// A stateless, parameter-bound unit of execution.
///
/// `T` is the caller's payload type carried on [`Context::data`]. Actions must
/// be `Send + Sync` so a compiled machine can be ticked from several threads,
/// each owning a disjoint context.
pub trait Action<T>: Send + Sync {
    fn tick(&self, context: &mut Context<T>) -> TickResult;
}

impl<T, F> Action<T> for F
where
    F: Fn(&mut Context<T>) -> TickResult + Send + Sync,
{
    fn tick(&self, context: &mut Context<T>) -> TickResult {
        self(context)
    }
}

/// Boxed action as stored in compiled states.
pub type BoxedAction<T> = Box<dyn Action<T>>;
