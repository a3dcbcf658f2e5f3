//! Built-in actions.
//!
//! ```text
//! name                    properties                  result
//! $trans (alias goto)     target: state   (default)   Transition
//! yield                                               Yield
//! done                                                Done
//! loop                                                Loop
//! log                     message: string (default)   Done
//! ```
//!
//! `$trans` is the configured `CompilerOptions::transition_action`; every
//! `-> state` line compiles to it.

use crate::CompilerOptions;
use crate::compiler::{ActionRegistry, ActionSchema, Bindings, PropertyKind, RegistryError};
use crate::runtime::{BoxedAction, Context, TickResult};

pub(crate) fn register<T: 'static>(
    registry: &mut ActionRegistry<T>,
    options: &CompilerOptions,
) -> Result<(), RegistryError> {
    registry.register(
        ActionSchema::new(options.transition_action.as_str(), |bindings: &Bindings| {
            let destination = bindings.transition("target")?;
            Ok(Box::new(move |_: &mut Context<T>| TickResult::transition_to(destination)) as BoxedAction<T>)
        })
        .alias("goto")
        .default_property("target", PropertyKind::Transition),
    )?;
    registry.register(ActionSchema::from_fn("yield", |_: &mut Context<T>| TickResult::Yield))?;
    registry.register(ActionSchema::from_fn("done", |_: &mut Context<T>| TickResult::Done))?;
    registry.register(ActionSchema::from_fn("loop", |_: &mut Context<T>| TickResult::Loop))?;
    registry.register(
        ActionSchema::new("log", |bindings: &Bindings| {
            let message = bindings.text_or("message", "")?.to_string();
            Ok(Box::new(move |ctx: &mut Context<T>| {
                tracing::info!(state_id = ctx.exec_state().state_id, "{message}");
                TickResult::Done
            }) as BoxedAction<T>)
        })
        .default_property("message", PropertyKind::Str),
    )?;
    Ok(())
}
