//! Transition target resolution.
//!
//! Two passes over the tree. The first numbers the states in declaration order
//! (that number is the runtime `StateId`) and rejects duplicate names. The
//! second rewrites every `->` parameter, including the machine's initial
//! transition, to the index of the state it names. Lookups ignore ASCII case;
//! names are lowercased on both sides.
//!
//! Assign parameters are left alone for the generator to convert.

use super::ast::{ActionNode, MachineNode, ParamOperation};
use super::error::CompileError;
use std::collections::HashMap;

/// Reusable resolver; the name table is kept between calls.
#[derive(Debug, Default)]
pub struct Resolver {
    names: HashMap<String, usize>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every transition parameter in `tree` in place.
    ///
    /// On error the tree may be partially resolved and must not be generated.
    pub fn resolve(&mut self, tree: &mut MachineNode) -> Result<usize, CompileError> {
        self.names.clear();
        for (index, state) in tree.states.iter().enumerate() {
            if self.names.insert(state.name.to_ascii_lowercase(), index).is_some() {
                return Err(CompileError::DuplicateState { line: state.line, name: state.name.clone() });
            }
        }

        let mut resolved = self.resolve_action(&mut tree.action)?;
        for state in &mut tree.states {
            for section in state.sections_mut() {
                for action in &mut section.actions {
                    resolved += self.resolve_action(action)?;
                }
            }
        }

        tracing::debug!(states = self.names.len(), transitions = resolved, "resolved");
        Ok(resolved)
    }

    fn resolve_action(&self, action: &mut ActionNode) -> Result<usize, CompileError> {
        let mut resolved = 0;
        for param in action.params.iter_mut().filter(|p| p.op == ParamOperation::Transition) {
            let index = self.names.get(&param.value.to_ascii_lowercase()).copied().ok_or_else(|| {
                CompileError::UnresolvedTransition { line: param.line, target: param.value.clone() }
            })?;
            param.resolved = Some(index);
            resolved += 1;
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompilerOptions;
    use crate::compiler::CompileErrorCode;
    use crate::compiler::lexer::Lexer;
    use crate::compiler::parser::parse;

    fn tree(source: &str) -> MachineNode {
        let tokens = Lexer::new().scan(source).to_vec();
        parse(&tokens, source, &CompilerOptions::default()).unwrap()
    }

    #[test]
    fn indices_follow_declaration_order() {
        let mut tree = tree("@machine m -> Third\n@state first\n@state second\n@state third\n@run\n-> FIRST");
        let count = Resolver::new().resolve(&mut tree).unwrap();

        assert_eq!(count, 2);
        assert_eq!(tree.action.params[0].resolved, Some(2));
        assert_eq!(tree.states[2].run.as_ref().unwrap().actions[0].params[0].resolved, Some(0));
    }

    #[test]
    fn every_section_is_visited() {
        let mut tree = tree(
            "@machine m -> a\n@state a\n@enter\ngoto -> b\n@exit\ngoto -> b\n@on\n'x': -> b\n@state b\n@run\nlog hi",
        );
        Resolver::new().resolve(&mut tree).unwrap();

        for section in tree.states[0].sections() {
            assert_eq!(section.actions[0].params[0].resolved, Some(1));
        }
        assert_eq!(tree.states[1].run.as_ref().unwrap().actions[0].params[0].resolved, None);
    }

    #[test]
    fn unknown_target_is_reported_with_its_line() {
        let mut tree = tree("@machine m -> a\n@state a\n@run\nyield\n-> nowhere");
        let err = Resolver::new().resolve(&mut tree).unwrap_err();

        assert_eq!(err.code(), CompileErrorCode::StateNotFoundForTransition);
        assert_eq!(err.line(), Some(5));
    }

    #[test]
    fn machine_transition_must_resolve() {
        let mut tree = tree("@machine m -> missing\n@state a");
        let err = Resolver::new().resolve(&mut tree).unwrap_err();
        assert_eq!(err, CompileError::UnresolvedTransition { line: 1, target: "missing".into() });
    }

    #[test]
    fn duplicate_state_names_ignore_case() {
        let mut tree = tree("@machine m -> a\n@state a\n@state A");
        let err = Resolver::new().resolve(&mut tree).unwrap_err();

        assert_eq!(err.code(), CompileErrorCode::DuplicateState);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn resolver_is_reusable() {
        let mut resolver = Resolver::new();
        resolver.resolve(&mut tree("@machine m -> gone\n@state gone")).unwrap();

        let mut second = tree("@machine m -> gone\n@state other");
        assert!(resolver.resolve(&mut second).is_err());
    }
}
