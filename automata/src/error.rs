use crate::graph::{Letter, StateId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("unescaped backslash at the end of the pattern")]
    TrailingBackslash,
    #[error("'{0}' can't be escaped")]
    InvalidEscape(char),
    #[error("unbalanced parenthesis")]
    UnbalancedGroup,
    #[error("pattern consists of empty groups only")]
    EmptyPattern,
    #[error("empty group can't precede the rest of its pattern")]
    EmptyGroup,
    #[error("unary operator '{0}' must be the last symbol of its scope")]
    MisplacedUnaryOperator(char),
    #[error("operator '{0}' is missing an operand")]
    MissingOperand(char),
    #[error("symbols aren't connected by any operator")]
    DisconnectedSymbols,
}

/// Malformed input pattern. `position` is the index of the offending
/// character in the pattern (in chars, not bytes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid regex: {kind} (position {position})")]
pub struct SyntaxError {
    kind: SyntaxErrorKind,
    position: usize,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, position: usize) -> Self {
        SyntaxError { kind, position }
    }

    pub fn kind(&self) -> &SyntaxErrorKind {
        &self.kind
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

/// Internal invariant violation. Never expected from a correct pipeline run,
/// so it is propagated up instead of being handled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    #[error("operator '{operator}' has incorrect amount of operands ({actual}, expected {expected})")]
    ArityMismatch {
        operator: char,
        expected: usize,
        actual: usize,
    },
    #[error("empty node found below the root of a syntax tree")]
    MisplacedEmptyNode,
    #[error("the automaton's alphabet doesn't contain letter '{0}'")]
    LetterOutsideAlphabet(Letter),
    #[error("state #{0} doesn't belong to the automaton")]
    UnknownState(StateId),
    #[error("the automaton has no entry state")]
    MissingEntry,
    #[error("passed argument doesn't seem to be a DFA: state #{state} has {count} destinations on '{letter}'")]
    NotDeterministic {
        state: StateId,
        letter: Letter,
        count: usize,
    },
    #[error("couldn't find the entry state in any of the equivalence classes")]
    EntryNotFound,
    #[error("couldn't find state #{0} in any of the equivalence classes")]
    StateNotInClasses(StateId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidSyntax(#[from] SyntaxError),

    #[error(transparent)]
    Logic(#[from] LogicError),
}
