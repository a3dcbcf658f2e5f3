//! Recursive-descent parser.
//!
//! ```text
//! file      := NEWLINE* machine state*
//! machine   := @machine IDENT action
//! state     := @state IDENT NEWLINE? section*
//! section   := (@enter | @exit | @run | @on) NEWLINE? action*
//! action    := (LITERAL ':')? ( IDENT param* | '->' LITERAL ) NEWLINE
//! param     := IDENT (':' | '->') LITERAL | LITERAL | '->' LITERAL
//! ```
//!
//! `LITERAL` is either a bare word or a quoted value. The parser keeps a single
//! forward cursor with one token of lookahead and stops at the first problem.
//! There is no resynchronization.

use super::ast::{ActionNode, MachineNode, ParamNode, ParamOperation, SectionNode, StateNode};
use super::error::CompileError;
use super::lexer::{Keyword, Operator, Token, TokenKind};
use crate::CompilerOptions;

bitflags::bitflags! {
    /// Sections already seen in the state being parsed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SectionSet: u8 {
        const ENTER = 1 << 0;
        const EXIT  = 1 << 1;
        const RUN   = 1 << 2;
        const ON    = 1 << 3;
    }
}

impl SectionSet {
    fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Enter => Some(SectionSet::ENTER),
            Keyword::Exit => Some(SectionSet::EXIT),
            Keyword::Run => Some(SectionSet::RUN),
            Keyword::On => Some(SectionSet::ON),
            Keyword::Machine | Keyword::State => None,
        }
    }
}

/// Parse a token stream produced from `source` into a machine tree.
pub fn parse(tokens: &[Token], source: &str, options: &CompilerOptions) -> Result<MachineNode, CompileError> {
    let mut parser = Parser { tokens, source, options, pos: 0 };
    let machine = parser.machine()?;
    tracing::debug!(machine = %machine.name, states = machine.states.len(), "parsed");
    Ok(machine)
}

struct Parser<'a> {
    tokens: &'a [Token],
    source: &'a str,
    options: &'a CompilerOptions,
    pos: usize,
}

impl<'a> Parser<'a> {
    // --- Cursor ----------------------------------------------------------------

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn peek_second_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| t.kind)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    /// Line of the next token, or of the last one at end of input.
    fn line(&self) -> usize {
        self.peek().or_else(|| self.tokens.last()).map_or(1, |t| t.line)
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == Some(TokenKind::NewLine) {
            self.pos += 1;
        }
    }

    fn at_action_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::NewLine) | Some(TokenKind::Keyword(_)))
    }

    fn describe_next(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(token) => match token.kind {
                TokenKind::NewLine => "end of line".to_string(),
                TokenKind::Keyword(kw) => kw.as_str().to_string(),
                _ => format!("'{}'", self.text(token)),
            },
        }
    }

    fn expect_literal(&mut self, what: &str) -> Result<&'a Token, CompileError> {
        match self.peek() {
            Some(token) if token.is_literal() => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(CompileError::syntax(self.line(), format!("expected {what}, found {}", self.describe_next()))),
        }
    }

    // --- Grammar ---------------------------------------------------------------

    fn machine(&mut self) -> Result<MachineNode, CompileError> {
        self.skip_newlines();
        let line = self.line();
        if self.peek_kind() != Some(TokenKind::Keyword(Keyword::Machine)) {
            return Err(CompileError::syntax(line, format!("expected @machine, found {}", self.describe_next())));
        }
        self.pos += 1;
        self.skip_newlines();

        let name = match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                self.text(token).to_string()
            }
            _ => return Err(CompileError::syntax(self.line(), "@machine is missing a name")),
        };

        if self.at_action_end() {
            return Err(CompileError::syntax(self.line(), "@machine needs an initial transition, e.g. '-> idle'"));
        }
        let action = self.action(false)?;

        let mut states = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek_kind() {
                None => break,
                Some(TokenKind::Keyword(Keyword::State)) => states.push(self.state()?),
                Some(_) => {
                    return Err(CompileError::syntax(
                        self.line(),
                        format!("expected @state, found {}", self.describe_next()),
                    ));
                }
            }
        }

        Ok(MachineNode { line, name, action, states })
    }

    fn state(&mut self) -> Result<StateNode, CompileError> {
        let line = self.line();
        self.pos += 1;
        self.skip_newlines();

        let name = match self.peek() {
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                self.text(token)
            }
            _ => {
                return Err(CompileError::syntax(
                    self.line(),
                    format!("expected state name after @state, found {}", self.describe_next()),
                ));
            }
        };
        let mut state = StateNode::new(line, name);
        let mut seen = SectionSet::empty();

        loop {
            self.skip_newlines();
            let Some(TokenKind::Keyword(keyword)) = self.peek_kind() else {
                if self.peek().is_none() {
                    break;
                }
                return Err(CompileError::syntax(
                    self.line(),
                    format!("expected a section keyword in state '{}', found {}", state.name, self.describe_next()),
                ));
            };
            let Some(flag) = SectionSet::from_keyword(keyword) else {
                break;
            };

            let section_line = self.line();
            if seen.contains(flag) {
                return Err(CompileError::DuplicateSection {
                    line: section_line,
                    state: state.name.clone(),
                    section: keyword.as_str(),
                });
            }
            seen.insert(flag);
            self.pos += 1;

            let section = self.section(section_line, keyword == Keyword::On)?;
            let slot = match keyword {
                Keyword::Enter => &mut state.enter,
                Keyword::Exit => &mut state.exit,
                Keyword::Run => &mut state.run,
                _ => &mut state.on,
            };
            *slot = Some(section);
        }

        Ok(state)
    }

    fn section(&mut self, line: usize, is_on: bool) -> Result<SectionNode, CompileError> {
        let mut section = SectionNode { line, actions: Vec::new() };
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), None | Some(TokenKind::Keyword(_))) {
                return Ok(section);
            }
            section.actions.push(self.action(is_on)?);
        }
    }

    fn action(&mut self, is_on: bool) -> Result<ActionNode, CompileError> {
        let line = self.line();

        let message = match (self.peek(), self.peek_second_kind()) {
            (Some(token), Some(TokenKind::Operator(Operator::Assign))) if token.is_literal() => {
                if !is_on {
                    return Err(CompileError::syntax(
                        line,
                        format!("message key '{}' is only allowed inside @on", self.text(token)),
                    ));
                }
                self.pos += 2;
                Some(self.text(token).to_string())
            }
            _ => None,
        };
        if is_on && message.is_none() {
            return Err(CompileError::syntax(line, "@on actions must start with a message key, e.g. 'hit': -> hurt"));
        }

        let mut action = match self.peek() {
            Some(token) if token.kind == TokenKind::Operator(Operator::Transition) => {
                self.pos += 1;
                let target = self.expect_literal("a state name after '->'")?;
                let mut node = ActionNode::new(line, self.options.transition_action.as_str());
                node.params.push(ParamNode::new(
                    target.line,
                    self.options.default_param.as_str(),
                    ParamOperation::Transition,
                    self.text(target),
                ));
                node
            }
            Some(token) if token.kind == TokenKind::Identifier => {
                self.pos += 1;
                let mut node = ActionNode::new(line, self.text(token));
                while !self.at_action_end() {
                    node.params.push(self.param()?);
                }
                node
            }
            _ => {
                return Err(CompileError::syntax(line, format!("expected an action, found {}", self.describe_next())));
            }
        };
        action.message = message;

        if !self.at_action_end() {
            return Err(CompileError::syntax(self.line(), format!("unexpected {} after action", self.describe_next())));
        }
        Ok(action)
    }

    fn param(&mut self) -> Result<ParamNode, CompileError> {
        let line = self.line();
        let Some(token) = self.bump() else {
            return Err(CompileError::syntax(line, "expected a parameter, found end of input"));
        };

        match (token.kind, self.peek_kind()) {
            (TokenKind::Operator(Operator::Transition), _) => {
                let target = self.expect_literal("a state name after '->'")?;
                Ok(ParamNode::new(
                    line,
                    self.options.default_param.as_str(),
                    ParamOperation::Transition,
                    self.text(target),
                ))
            }
            (TokenKind::Identifier, Some(TokenKind::Operator(op))) => {
                self.pos += 1;
                let (operation, what) = match op {
                    Operator::Assign => (ParamOperation::Assign, "a value after ':'"),
                    Operator::Transition => (ParamOperation::Transition, "a state name after '->'"),
                };
                let value = self.expect_literal(what)?;
                Ok(ParamNode::new(line, self.text(token), operation, self.text(value)))
            }
            (TokenKind::Value, Some(TokenKind::Operator(Operator::Assign))) => {
                Err(CompileError::syntax(line, format!("property name '{}' must not be quoted", self.text(token))))
            }
            (TokenKind::Identifier | TokenKind::Value, _) => {
                Ok(ParamNode::new(line, self.options.default_param.as_str(), ParamOperation::Assign, self.text(token)))
            }
            (TokenKind::Operator(Operator::Assign), _) => Err(CompileError::syntax(line, "unexpected ':'")),
            (TokenKind::Keyword(_) | TokenKind::NewLine, _) => {
                Err(CompileError::syntax(line, "expected a parameter"))
            }
        }
    }
}
