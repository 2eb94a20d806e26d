use thiserror::Error;

use crate::grammar::GrammarKind;

/// An automaton or grammar violated one of its invariants while being built.
/// The invalid value is never returned.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConstructionError {
	#[error("an automaton needs at least one state")]
	NoStates,
	#[error("state {state} is out of range for {states} states")]
	StateOutOfRange { state: usize, states: usize },
	#[error("symbol {symbol} is not in the alphabet")]
	UnknownSymbol { symbol: String },
	#[error("state {state} has no transition on {symbol}")]
	MissingTransition { state: usize, symbol: String },
	#[error("state {state} has more than one transition on {symbol}")]
	ConflictingTransition { state: usize, symbol: String },
	#[error("automata over different alphabets cannot be combined")]
	AlphabetMismatch,
	#[error("start symbol {start:?} is not a variable")]
	StartNotVariable { start: char },
	#[error("{symbol:?} is both a terminal and a variable")]
	OverlappingSymbols { symbol: char },
	#[error("production {production} uses unknown symbol {symbol:?}")]
	UnknownProductionSymbol { production: String, symbol: char },
	#[error("production {production} is not allowed in a {kind:?} grammar")]
	ShapeViolation { kind: GrammarKind, production: String },
	#[error("no unused variable name is left")]
	VariablesExhausted,
}

/// A query-time input contained a symbol outside the alphabet.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("symbol {symbol} at position {position} is not in the alphabet")]
pub struct AlphabetError {
	pub symbol: String,
	pub position: usize,
}

/// Malformed regular-expression text.
/// `position` counts characters, not bytes.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{kind} at position {position}")]
pub struct SyntaxError {
	pub position: usize,
	pub kind: SyntaxErrorKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum SyntaxErrorKind {
	#[error("unbalanced parenthesis")]
	UnbalancedParenthesis,
	#[error("unknown symbol {0:?}")]
	UnknownSymbol(char),
	#[error("missing operand")]
	MissingOperand,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PreconditionError {
	#[error("grammar is not in Chomsky normal form, found {production}")]
	NotChomskyNormalForm { production: String },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum Error {
	#[error(transparent)]
	Construction(#[from] ConstructionError),
	#[error(transparent)]
	Alphabet(#[from] AlphabetError),
	#[error(transparent)]
	Syntax(#[from] SyntaxError),
	#[error(transparent)]
	Precondition(#[from] PreconditionError),
}
