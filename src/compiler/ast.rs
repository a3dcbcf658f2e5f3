//! Syntax tree.
//!
//! The tree is the hand-off between parser, resolver and generator. Every node
//! records the line it started on so later stages can report diagnostics.
//!
//! ```text
//! MachineNode ── action (initial transition)
//!      └─ StateNode* ── enter / exit / run / on : SectionNode
//!                                                   └─ ActionNode* ── ParamNode*
//! ```

/// How a parameter's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamOperation {
    /// `name: value`, converted to a typed literal by the generator.
    Assign,
    /// `name -> state`, resolved to a state index by the resolver.
    Transition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamNode {
    pub line: usize,
    /// Property name, or the configured default-parameter marker when unlabeled.
    pub name: String,
    pub op: ParamOperation,
    pub value: String,
    /// Set by the resolver on `Transition` params.
    pub resolved: Option<usize>,
}

impl ParamNode {
    pub fn new(line: usize, name: impl Into<String>, op: ParamOperation, value: impl Into<String>) -> Self {
        Self { line, name: name.into(), op, value: value.into(), resolved: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    pub line: usize,
    pub name: String,
    /// Only set inside an `@on` section.
    pub message: Option<String>,
    pub params: Vec<ParamNode>,
}

impl ActionNode {
    pub fn new(line: usize, name: impl Into<String>) -> Self {
        Self { line, name: name.into(), message: None, params: Vec::new() }
    }
}

/// Ordered actions of one section. Order is execution order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectionNode {
    pub line: usize,
    pub actions: Vec<ActionNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    pub line: usize,
    pub name: String,
    pub enter: Option<SectionNode>,
    pub exit: Option<SectionNode>,
    pub run: Option<SectionNode>,
    pub on: Option<SectionNode>,
}

impl StateNode {
    pub fn new(line: usize, name: impl Into<String>) -> Self {
        Self { line, name: name.into(), enter: None, exit: None, run: None, on: None }
    }

    /// Present sections, in enter, exit, run, on order.
    pub fn sections(&self) -> impl Iterator<Item = &SectionNode> {
        [&self.enter, &self.exit, &self.run, &self.on].into_iter().flatten()
    }

    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut SectionNode> {
        [&mut self.enter, &mut self.exit, &mut self.run, &mut self.on].into_iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MachineNode {
    pub line: usize,
    pub name: String,
    /// Must transition to the initial state on the machine's first tick.
    pub action: ActionNode,
    pub states: Vec<StateNode>,
}
