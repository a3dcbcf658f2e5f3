use crate::compiler::lexer::Lexer;
use crate::compiler::{self, ActionRegistry, CompileError, CompileRun, Resolver};
use crate::runtime::{Machine, StateId};
use std::time::Duration;

/// Options that affect compilation.
///
/// Both names are reserved in scripts: the transition action is what `-> x`
/// compiles to, and the default parameter marks an unlabeled value until the
/// generator binds it to the action's default property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Action name `-> state` shorthand is rewritten to.
    pub transition_action: String,
    /// Parameter name given to unlabeled values.
    pub default_param: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self { transition_action: "$trans".to_string(), default_param: "$default".to_string() }
    }
}

/// Timing for one compile stage.
#[derive(Debug, Clone, Copy)]
pub struct StageTiming {
    pub stage: &'static str,
    pub duration: Duration,
    /// Items the stage produced: tokens, states, resolved transitions, actions.
    pub produced: usize,
}

/// One row of the compiled state table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSummary {
    pub id: StateId,
    pub name: String,
    pub enter_actions: usize,
    pub run_actions: usize,
    pub exit_actions: usize,
    /// Handled message keys, sorted.
    pub messages: Vec<String>,
}

/// Additional details returned by [`compile_verbose_with`].
#[derive(Debug, Clone)]
pub struct CompileDetails {
    pub total: Duration,
    /// Lex, parse, resolve and generate, in pipeline order.
    pub stages: Vec<StageTiming>,
    pub tokens: usize,
    pub transitions: usize,
    /// Compiled actions, not counting the machine's enter action.
    pub actions: usize,
    pub states: Vec<StateSummary>,
}

/// Result from [`compile_verbose_with`].
#[derive(Debug)]
pub struct CompileResultVerbose<T> {
    pub machine: Machine<T>,
    pub details: CompileDetails,
}

/// Compile `text` against `registry` with default [`CompilerOptions`].
///
/// # Example
/// ```
/// use statescript::{ActionRegistry, CompilerOptions, Context, compile};
///
/// let registry = ActionRegistry::with_builtins(&CompilerOptions::default()).unwrap();
/// let machine = compile("@machine door -> closed\n@state closed\n@run\nyield", &registry).unwrap();
///
/// let mut ctx: Context = Context::default();
/// machine.tick(&mut ctx);
/// assert_eq!(ctx.exec_state().state_id, 0);
/// ```
pub fn compile<T>(text: &str, registry: &ActionRegistry<T>) -> Result<Machine<T>, CompileError> {
    compile_with(text, registry, &CompilerOptions::default())
}

/// Compile `text` with explicit `options`.
///
/// `registry` must have been built with the same options, or `-> x` lines
/// will not find the transition action.
pub fn compile_with<T>(
    text: &str,
    registry: &ActionRegistry<T>,
    options: &CompilerOptions,
) -> Result<Machine<T>, CompileError> {
    run(text, registry, options).map(|run| run.machine)
}

/// Compile `text` and return per-stage timings and a state table as well.
pub fn compile_verbose_with<T>(
    text: &str,
    registry: &ActionRegistry<T>,
    options: &CompilerOptions,
) -> Result<CompileResultVerbose<T>, CompileError> {
    let CompileRun { machine, metrics } = run(text, registry, options)?;

    let stages = [
        ("lex", metrics.lex),
        ("parse", metrics.parse),
        ("resolve", metrics.resolve),
        ("generate", metrics.generate),
    ]
    .into_iter()
    .map(|(stage, m)| StageTiming { stage, duration: m.duration, produced: m.produced })
    .collect();

    let states = machine
        .states()
        .iter()
        .enumerate()
        .map(|(idx, state)| {
            let mut messages: Vec<String> = state.message_keys().map(str::to_string).collect();
            messages.sort();
            StateSummary {
                id: idx as StateId,
                name: state.name().to_string(),
                enter_actions: state.enter_len(),
                run_actions: state.run_len(),
                exit_actions: state.exit_len(),
                messages,
            }
        })
        .collect();

    let details = CompileDetails {
        total: metrics.total,
        stages,
        tokens: metrics.lex.produced,
        transitions: metrics.resolve.produced,
        actions: metrics.generate.produced,
        states,
    };

    Ok(CompileResultVerbose { machine, details })
}

fn run<T>(text: &str, registry: &ActionRegistry<T>, options: &CompilerOptions) -> Result<CompileRun<T>, CompileError> {
    compiler::run_pipeline(&mut Lexer::new(), &mut Resolver::new(), registry, options, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileErrorCode;
    use crate::runtime::Context;

    fn builtins() -> ActionRegistry<()> {
        ActionRegistry::with_builtins(&CompilerOptions::default()).unwrap()
    }

    #[test]
    fn default_reserved_names() {
        let options = CompilerOptions::default();
        assert_eq!(options.transition_action, "$trans");
        assert_eq!(options.default_param, "$default");
    }

    #[test]
    fn compile_and_tick() {
        let machine = compile("@machine m -> a\n@state a\n@run\n-> b\n@state b", &builtins()).unwrap();
        let mut ctx = Context::default();

        machine.tick(&mut ctx);
        assert_eq!(ctx.exec_state().state_id, 0);
        machine.tick(&mut ctx);
        assert_eq!(ctx.exec_state().state_id, 1);
        assert_eq!(ctx.last_error(), None);
    }

    #[test]
    fn lexer_failure_stops_the_compile() {
        let err = compile("@machine m -> a\n@state a\n@bogus", &builtins()).unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::LexerStuck);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn custom_options_need_a_matching_registry() {
        let options = CompilerOptions { transition_action: "jump".into(), default_param: "_".into() };
        let source = "@machine m -> a\n@state a";

        assert_eq!(compile_with(source, &builtins(), &options).unwrap_err().code(), CompileErrorCode::ActionNotFound);

        let registry: ActionRegistry<()> = ActionRegistry::with_builtins(&options).unwrap();
        assert!(compile_with(source, &registry, &options).is_ok());
    }

    #[test]
    fn verbose_details() {
        let source = "@machine m -> idle\n@state idle\n@run\nyield\n-> busy\n@on\n'b': -> busy\n'a': done\n@state busy";
        let out = compile_verbose_with(source, &builtins(), &CompilerOptions::default()).unwrap();
        let details = &out.details;

        let names: Vec<&str> = details.stages.iter().map(|s| s.stage).collect();
        assert_eq!(names, ["lex", "parse", "resolve", "generate"]);
        assert_eq!(details.transitions, 3);
        assert_eq!(details.actions, 4);
        assert_eq!(details.tokens, details.stages[0].produced);
        assert_eq!(details.states.len(), 2);
        assert_eq!(details.states[0].messages, ["a", "b"]);
        assert_eq!(details.states[0].run_actions, 2);
        assert_eq!(details.states[1].id, 1);
        assert_eq!(out.machine.state_count(), 2);
    }
}
