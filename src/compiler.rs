//! Script compiler.
//!
//! Compiling is a straight pipeline; each stage either hands its output to the
//! next or stops the whole compile with a line-numbered [`CompileError`].
//!
//! ```text
//! source text
//!     │  Lexer::scan                  (lexer.rs)
//!     │    - spans into the source, no owned strings
//!     │    - stuck → CompileError::Lex
//!     v
//! [Token]
//!     │  parse                        (parser.rs)
//!     │    - recursive descent, first error wins
//!     │    - `-> x` becomes a call to the reserved transition action
//!     v
//! MachineNode
//!     │  Resolver::resolve            (resolve.rs)
//!     │    - state name → declaration index, ignoring case
//!     v
//! MachineNode (resolved)
//!     │  Generator::generate          (generate.rs)
//!     │    - ActionRegistry lookup + property binding (registry.rs, convert.rs)
//!     v
//! Machine<T>
//! ```
//!
//! ## Responsibilities by module
//!
//! - `lexer.rs`: tokens and the newline-collapsing rules.
//! - `ast.rs`: the syntax tree handed between stages.
//! - `parser.rs`: grammar, reserved-name rewriting, duplicate-section checks.
//! - `resolve.rs`: state numbering and transition target resolution.
//! - `convert.rs`: literal → [`Value`](crate::Value) converters and property kinds.
//! - `registry.rs`: action schemas, bindings, and the registry itself.
//! - `generate.rs`: tree → [`Machine`].
//! - `error.rs`: [`CompileError`] and its stable [`CompileErrorCode`].
//! - `metrics.rs`: per-stage timings.
//!
//! ## Reuse
//!
//! A [`Compiler`] keeps the lexer's token buffer and the resolver's name table
//! between calls, so compiling many scripts in a row does not reallocate them.

#[path = "compiler/ast.rs"]
pub mod ast;
#[path = "compiler/convert.rs"]
mod convert;
#[path = "compiler/error.rs"]
mod error;
#[path = "compiler/generate.rs"]
mod generate;
#[path = "compiler/lexer.rs"]
pub mod lexer;
#[path = "compiler/metrics.rs"]
mod metrics;
#[path = "compiler/parser.rs"]
mod parser;
#[path = "compiler/registry.rs"]
mod registry;
#[path = "compiler/resolve.rs"]
mod resolve;

#[cfg(test)]
#[path = "compiler/tests.rs"]
mod tests;

pub use convert::{BoolConverter, FloatConverter, IntConverter, PropertyKind, StringConverter, ValueConverter};
pub use error::{CompileError, CompileErrorCode};
pub use generate::Generator;
pub use metrics::{CompileMetrics, CompileRun, StageMetrics};
pub use parser::{SectionSet, parse};
pub use registry::{ActionRegistry, ActionSchema, BindError, Binding, Bindings, PropertySpec, RegistryError};
pub use resolve::Resolver;

use crate::CompilerOptions;
use crate::runtime::Machine;
use lexer::Lexer;
use std::time::Instant;

/// Reusable compiler owning its registry and options.
#[derive(Debug)]
pub struct Compiler<T> {
    lexer: Lexer,
    resolver: Resolver,
    registry: ActionRegistry<T>,
    options: CompilerOptions,
}

impl<T> Compiler<T> {
    pub fn new(registry: ActionRegistry<T>, options: CompilerOptions) -> Self {
        Self { lexer: Lexer::new(), resolver: Resolver::new(), registry, options }
    }

    pub fn registry(&self) -> &ActionRegistry<T> {
        &self.registry
    }

    /// Register host actions after construction.
    pub fn registry_mut(&mut self) -> &mut ActionRegistry<T> {
        &mut self.registry
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile(&mut self, text: &str) -> Result<Machine<T>, CompileError> {
        self.compile_with_metrics(text).map(|run| run.machine)
    }

    pub fn compile_with_metrics(&mut self, text: &str) -> Result<CompileRun<T>, CompileError> {
        run_pipeline(&mut self.lexer, &mut self.resolver, &self.registry, &self.options, text)
    }
}

impl<T: 'static> Compiler<T> {
    /// A compiler whose registry holds only the built-in actions.
    pub fn with_builtins(options: CompilerOptions) -> Result<Self, RegistryError> {
        let registry = ActionRegistry::with_builtins(&options)?;
        Ok(Self::new(registry, options))
    }
}

pub(crate) fn run_pipeline<T>(
    lexer: &mut Lexer,
    resolver: &mut Resolver,
    registry: &ActionRegistry<T>,
    options: &CompilerOptions,
    text: &str,
) -> Result<CompileRun<T>, CompileError> {
    let start = Instant::now();
    let mut metrics = CompileMetrics::default();

    let t = Instant::now();
    let token_count = lexer.scan(text).len();
    if let Some(stuck) = lexer.stuck_at() {
        return Err(CompileError::Lex { line: stuck.line });
    }
    metrics.lex = StageMetrics { duration: t.elapsed(), produced: token_count };
    tracing::debug!(tokens = token_count, "lexed");

    let t = Instant::now();
    let mut tree = parse(lexer.tokens(), text, options)?;
    metrics.parse = StageMetrics { duration: t.elapsed(), produced: tree.states.len() };

    let t = Instant::now();
    let resolved = resolver.resolve(&mut tree)?;
    metrics.resolve = StageMetrics { duration: t.elapsed(), produced: resolved };

    let t = Instant::now();
    let machine = Generator::new(registry, options).generate(&tree)?;
    metrics.generate = StageMetrics { duration: t.elapsed(), produced: generate::action_count(&tree) };

    metrics.total = start.elapsed();
    Ok(CompileRun { machine, metrics })
}
