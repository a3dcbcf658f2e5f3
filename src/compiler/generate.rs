//! Machine generation.
//!
//! The last consumer of the syntax tree. Every `ActionNode` becomes one
//! [`BoxedAction`] built by its registry schema; the tree is only read.
//!
//! Parameter binding, per `ParamNode`:
//!
//! ```text
//! name == default marker  -> schema's default property (error if none)
//! otherwise               -> schema property by name  (error if unknown)
//!
//! '->' on a state property   -> Binding::Transition(resolved index)
//! ':'  on a typed property   -> Binding::Value(converted literal)
//! anything else              -> kind mismatch
//! ```

use super::ast::{ActionNode, MachineNode, ParamOperation, SectionNode};
use super::convert::PropertyKind;
use super::error::CompileError;
use super::registry::{ActionRegistry, Binding, Bindings};
use crate::CompilerOptions;
use crate::runtime::{BoxedAction, Machine, State, TransitionDestination};
use std::collections::HashSet;

pub struct Generator<'a, T> {
    registry: &'a ActionRegistry<T>,
    options: &'a CompilerOptions,
}

impl<'a, T> Generator<'a, T> {
    pub fn new(registry: &'a ActionRegistry<T>, options: &'a CompilerOptions) -> Self {
        Self { registry, options }
    }

    /// Build the machine for a resolved tree.
    pub fn generate(&self, tree: &MachineNode) -> Result<Machine<T>, CompileError> {
        let enter_action = self.action(&tree.action)?;
        let mut machine = Machine::new(tree.name.as_str(), enter_action);

        for node in &tree.states {
            let mut state = State::new(node.name.as_str());
            for action in self.section(node.enter.as_ref())? {
                state.add_enter_action(action);
            }
            for action in self.section(node.exit.as_ref())? {
                state.add_exit_action(action);
            }
            for action in self.section(node.run.as_ref())? {
                state.add_run_action(action);
            }
            if let Some(on) = &node.on {
                let mut keys = HashSet::with_capacity(on.actions.len());
                for action_node in &on.actions {
                    let key = action_node.message.as_deref().unwrap_or_default();
                    if !keys.insert(key) {
                        return Err(CompileError::DuplicateMessage { line: action_node.line, key: key.to_string() });
                    }
                    state.add_on_action(key, self.action(action_node)?);
                }
            }
            machine.add_state(state);
        }

        tracing::debug!(machine = %machine.name(), states = machine.state_count(), "generated");
        Ok(machine)
    }

    fn section(&self, section: Option<&SectionNode>) -> Result<Vec<BoxedAction<T>>, CompileError> {
        section.map_or(&[][..], |s| s.actions.as_slice()).iter().map(|node| self.action(node)).collect()
    }

    fn action(&self, node: &ActionNode) -> Result<BoxedAction<T>, CompileError> {
        let schema = self
            .registry
            .resolve(&node.name)
            .ok_or_else(|| CompileError::UnknownAction { line: node.line, name: node.name.clone() })?;

        let mut bindings = Bindings::new();
        for param in &node.params {
            let property = if param.name == self.options.default_param {
                schema
                    .default()
                    .ok_or_else(|| CompileError::NoDefaultProperty { line: param.line, action: node.name.clone() })?
            } else {
                schema.find_property(&param.name).ok_or_else(|| CompileError::UnknownProperty {
                    line: param.line,
                    action: node.name.clone(),
                    property: param.name.clone(),
                })?
            };

            let mismatch = |operator| CompileError::PropertyKindMismatch {
                line: param.line,
                action: node.name.clone(),
                property: property.name.clone(),
                operator,
            };

            let binding = match (param.op, property.kind.converter()) {
                (ParamOperation::Transition, None) => {
                    let index = param.resolved.ok_or_else(|| CompileError::UnresolvedTransition {
                        line: param.line,
                        target: param.value.clone(),
                    })?;
                    Binding::Transition(TransitionDestination::new(index))
                }
                (ParamOperation::Assign, Some(converter)) => {
                    let value = converter.try_convert(&param.value).ok_or_else(|| CompileError::InvalidValue {
                        line: param.line,
                        property: property.name.clone(),
                        value: param.value.clone(),
                    })?;
                    Binding::Value(value)
                }
                (ParamOperation::Transition, Some(_)) => return Err(mismatch("'->'")),
                (ParamOperation::Assign, None) => return Err(mismatch("':'")),
            };
            bindings.bind(&property.name, binding);
        }

        schema.build(&bindings).map_err(|source| CompileError::Bind { line: node.line, action: node.name.clone(), source })
    }
}

/// Number of actions a tree compiles to, not counting the machine's enter action.
pub fn action_count(tree: &MachineNode) -> usize {
    tree.states.iter().flat_map(|s| s.sections()).map(|s| s.actions.len()).sum()
}
