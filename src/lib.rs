//! Finite automata, regular expressions and context-free grammars.
//!
//! Automata are immutable once built: [`dfa::Dfa::minimize`], [`nfa::Nfa::to_dfa`] and
//! every grammar normalization return a new value.

#[macro_use(debug, trace)]
extern crate tracing;

pub mod alphabet;
pub mod cyk;
pub mod dfa;
pub mod error;
pub mod grammar;
pub mod nfa;
pub mod normalize;
pub mod regex;

pub use alphabet::Alphabet;
pub use alphabet::Symbol;
pub use dfa::Dfa;
pub use error::Error;
pub use grammar::Grammar;
pub use grammar::GrammarBuilder;
pub use grammar::GrammarKind;
pub use grammar::Production;
pub use nfa::Nfa;
pub use nfa::NfaBuilder;
pub use normalize::FreshVariables;
pub use regex::Regex;
pub use regex::RegexSyntax;
