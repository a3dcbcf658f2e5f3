//! Compile metrics.
//!
//! Collected on every compile; cheap enough (a handful of `Instant` reads) that there is
//! no separate uninstrumented path. [`crate::compile_verbose_with`] surfaces
//! them as `CompileDetails`.

use crate::runtime::Machine;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct CompileMetrics {
    /// Wall time for the whole pipeline.
    pub total: Duration,
    /// Tokens produced.
    pub lex: StageMetrics,
    /// States declared.
    pub parse: StageMetrics,
    /// Transition parameters resolved.
    pub resolve: StageMetrics,
    /// Actions built, not counting the machine's enter action.
    pub generate: StageMetrics,
}

/// Timing for one stage and the number of items it produced.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageMetrics {
    pub duration: Duration,
    pub produced: usize,
}

/// Pipeline output bundled with its metrics.
#[derive(Debug)]
pub struct CompileRun<T> {
    pub machine: Machine<T>,
    pub metrics: CompileMetrics,
}
