//! Tick engine.
//!
//! The runtime executes a compiled [`Machine`] against a caller-owned
//! [`Context`], one tick at a time. There is no scheduler and no implicit
//! suspension: an action "suspends" by returning [`TickResult::Yield`], and the
//! instance resumes on the caller's next [`Machine::tick`].
//!
//! ## Responsibilities by module
//!
//! - `action.rs`: the [`Action`] contract and the [`TickResult`] vocabulary.
//! - `context.rs`: per-instance [`ExecutionState`], runtime [`ErrorCode`]s and
//!   the message slot.
//! - `state.rs`: run/enter/exit/on section semantics.
//! - `machine.rs`: first-tick entry, transitions, message dispatch.
//! - `message_bus.rs`: the pooled, fixed-capacity [`MessageBus`].
//!
//! ## Error tiers
//!
//! Runtime errors are values on the context, never panics:
//!
//! - recoverable (enter/exit action not `Done`, message handler yielding):
//!   recorded, the call completes;
//! - fatal (enter action not transitioning, unknown destination): recorded,
//!   the tick aborts, and the context may stay stuck until [`Context::reset`].

#[path = "runtime/action.rs"]
mod action;
#[path = "runtime/context.rs"]
mod context;
#[path = "runtime/machine.rs"]
mod machine;
#[path = "runtime/message_bus.rs"]
mod message_bus;
#[path = "runtime/state.rs"]
mod state;

pub use action::{Action, BoxedAction, TickResult, TransitionDestination};
pub use context::{Context, ErrorCode, ExecutionState, StateId, UNINITIALIZED};
pub use machine::Machine;
pub use message_bus::{BusError, MessageBus, MessageEnvelope};
pub use state::State;
