//! A small language for behavior state machines, and the tick engine that runs them.
//!
//! Scripts are compiled once into an immutable [`Machine`] and then driven
//! against any number of lightweight [`Context`]s, one [`Machine::tick`] at a
//! time:
//!
//! ```text
//! @machine guard -> idle
//!
//! @state idle
//! @run
//!     log 'watching'
//!     yield
//! @on
//!     'seen': -> chase
//!
//! @state chase
//! @enter
//!     log 'after it'
//! @run
//!     yield
//! ```
//!
//! ```
//! use statescript::{ActionRegistry, CompilerOptions, Context, MessageEnvelope, compile};
//!
//! let source = "@machine guard -> idle\n@state idle\n@run\nyield\n@on\n'seen': -> chase\n@state chase";
//! let registry = ActionRegistry::with_builtins(&CompilerOptions::default()).unwrap();
//! let machine = compile(source, &registry).unwrap();
//!
//! let mut guard: Context = Context::default();
//! machine.tick(&mut guard);
//! machine.send_message(&mut guard, &mut MessageEnvelope::new("seen"));
//! assert_eq!(machine.current_state(&guard).map(|s| s.name()), Some("chase"));
//! ```
//!
//! Host behavior is plugged in through the [`ActionRegistry`]: each
//! [`ActionSchema`] declares typed properties and a factory building the
//! [`Action`] for one script line.

#[macro_use]
mod macros;
mod api;
mod builtin;
pub mod compiler;
pub mod runtime;
mod value;

pub use api::{
    CompileDetails, CompileResultVerbose, CompilerOptions, StageTiming, StateSummary, compile, compile_verbose_with,
    compile_with,
};
pub use compiler::{
    ActionRegistry, ActionSchema, BindError, Bindings, CompileError, CompileErrorCode, Compiler, PropertyKind,
    RegistryError,
};
pub use runtime::{
    Action, BoxedAction, BusError, Context, ErrorCode, ExecutionState, Machine, MessageBus, MessageEnvelope, State,
    StateId, TickResult, TransitionDestination, UNINITIALIZED,
};
pub use value::Value;
