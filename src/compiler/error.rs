use super::registry::BindError;
use thiserror::Error;

/// Compile failure. The pipeline stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("line {line}: unexpected input")]
    Lex { line: usize },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: section {section} declared twice in state '{state}'")]
    DuplicateSection { line: usize, state: String, section: &'static str },
    #[error("line {line}: state '{name}' is declared more than once")]
    DuplicateState { line: usize, name: String },
    #[error("line {line}: message '{key}' already has a handler in this state")]
    DuplicateMessage { line: usize, key: String },
    #[error("line {line}: no state named '{target}' for transition")]
    UnresolvedTransition { line: usize, target: String },
    #[error("line {line}: no action named '{name}'")]
    UnknownAction { line: usize, name: String },
    #[error("line {line}: action '{action}' has no property '{property}'")]
    UnknownProperty { line: usize, action: String, property: String },
    #[error("line {line}: action '{action}' does not take an unlabeled value")]
    NoDefaultProperty { line: usize, action: String },
    #[error("line {line}: '{value}' is not a valid value for '{property}'")]
    InvalidValue { line: usize, property: String, value: String },
    #[error("line {line}: property '{property}' of '{action}' cannot be bound with {operator}")]
    PropertyKindMismatch { line: usize, action: String, property: String, operator: &'static str },
    #[error("line {line}: cannot build action '{action}': {source}")]
    Bind {
        line: usize,
        action: String,
        #[source]
        source: BindError,
    },
}

/// Stable, data-free classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompileErrorCode {
    LexerStuck,
    SyntaxError,
    DuplicateSection,
    DuplicateState,
    DuplicateMessage,
    StateNotFoundForTransition,
    ActionNotFound,
    PropertyNotFound,
    NoDefaultProperty,
    InvalidValue,
    PropertyKindMismatch,
    ActionBindFailed,
}

impl CompileError {
    pub fn code(&self) -> CompileErrorCode {
        match self {
            CompileError::Lex { .. } => CompileErrorCode::LexerStuck,
            CompileError::Syntax { .. } => CompileErrorCode::SyntaxError,
            CompileError::DuplicateSection { .. } => CompileErrorCode::DuplicateSection,
            CompileError::DuplicateState { .. } => CompileErrorCode::DuplicateState,
            CompileError::DuplicateMessage { .. } => CompileErrorCode::DuplicateMessage,
            CompileError::UnresolvedTransition { .. } => CompileErrorCode::StateNotFoundForTransition,
            CompileError::UnknownAction { .. } => CompileErrorCode::ActionNotFound,
            CompileError::UnknownProperty { .. } => CompileErrorCode::PropertyNotFound,
            CompileError::NoDefaultProperty { .. } => CompileErrorCode::NoDefaultProperty,
            CompileError::InvalidValue { .. } => CompileErrorCode::InvalidValue,
            CompileError::PropertyKindMismatch { .. } => CompileErrorCode::PropertyKindMismatch,
            CompileError::Bind { .. } => CompileErrorCode::ActionBindFailed,
        }
    }

    /// Source line the error was found on. Every variant carries one today.
    pub fn line(&self) -> Option<usize> {
        let line = match self {
            CompileError::Lex { line }
            | CompileError::Syntax { line, .. }
            | CompileError::DuplicateSection { line, .. }
            | CompileError::DuplicateState { line, .. }
            | CompileError::DuplicateMessage { line, .. }
            | CompileError::UnresolvedTransition { line, .. }
            | CompileError::UnknownAction { line, .. }
            | CompileError::UnknownProperty { line, .. }
            | CompileError::NoDefaultProperty { line, .. }
            | CompileError::InvalidValue { line, .. }
            | CompileError::PropertyKindMismatch { line, .. }
            | CompileError::Bind { line, .. } => *line,
        };
        Some(line)
    }

    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        CompileError::Syntax { line, message: message.into() }
    }
}
