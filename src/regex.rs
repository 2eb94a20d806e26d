use nom::Err as NomErr;
use nom::IResult;
use nom::Parser;
use nom::error::ErrorKind as NomErrorKind;
use nom::error::ParseError;

use crate::alphabet::Alphabet;
use crate::alphabet::Symbol;
use crate::dfa::Dfa;
use crate::error::ConstructionError;
use crate::error::SyntaxError;
use crate::error::SyntaxErrorKind;
use crate::nfa::Nfa;

/// Reserved in patterns; never read as alphabet symbols.
const OPERATORS: &str = "()*+";

/// Regular expression over symbols `S`.
///
/// Textual notation, loosest to tightest:
/// `r1 + r2` (union), `r1 r2` (juxtaposition is concatenation), `r1*` (star closure),
/// and `(r1)` for grouping.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Regex<S> {
	EmptyLanguage,
	EmptyString,
	Symbol(S),
	Concatenation(Box<Regex<S>>, Box<Regex<S>>),
	Union(Box<Regex<S>>, Box<Regex<S>>),
	StarClosure(Box<Regex<S>>),
}

/// Markers for the two primitive expressions that are not alphabet symbols.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RegexSyntax {
	pub empty_string: char,
	pub empty_language: char,
}

impl Default for RegexSyntax {
	fn default() -> Self {
		Self {
			empty_string: 'λ',
			empty_language: 'ϕ',
		}
	}
}

impl<S: Symbol> Regex<S> {
	pub fn symbol(symbol: S) -> Self {
		Self::Symbol(symbol)
	}

	pub fn concat(self, other: Self) -> Self {
		Self::Concatenation(Box::new(self), Box::new(other))
	}

	pub fn or(self, other: Self) -> Self {
		Self::Union(Box::new(self), Box::new(other))
	}

	pub fn star(self) -> Self {
		Self::StarClosure(Box::new(self))
	}

	/// Thompson-style construction by structural recursion.
	pub fn to_nfa(&self, alphabet: &Alphabet<S>) -> Result<Nfa<S>, ConstructionError> {
		match self {
			Self::EmptyLanguage => Ok(Nfa::empty_language(alphabet.clone())),
			Self::EmptyString => Ok(Nfa::empty_string(alphabet.clone())),
			Self::Symbol(symbol) => Nfa::symbol(alphabet.clone(), symbol),
			Self::Concatenation(first, second) => {
				Nfa::concatenation(&first.to_nfa(alphabet)?, &second.to_nfa(alphabet)?)
			},
			Self::Union(left, right) => Nfa::union(&left.to_nfa(alphabet)?, &right.to_nfa(alphabet)?),
			Self::StarClosure(item) => Nfa::star_closure(&item.to_nfa(alphabet)?),
		}
	}

	/// Compile, determinize, minimize.
	pub fn to_optimized_dfa(&self, alphabet: &Alphabet<S>) -> Result<Dfa<S>, ConstructionError> {
		Ok(self.to_nfa(alphabet)?.to_dfa().minimize())
	}
}

impl Regex<char> {
	pub fn parse(pattern: &str, alphabet: &Alphabet<char>) -> Result<Self, SyntaxError> {
		Self::parse_with(pattern, alphabet, &RegexSyntax::default())
	}

	pub fn parse_with(pattern: &str, alphabet: &Alphabet<char>, syntax: &RegexSyntax) -> Result<Self, SyntaxError> {
		let parser: RegexParser<'_> = RegexParser { alphabet, syntax };
		match parser.pattern(pattern) {
			Ok((_, regex)) => Ok(regex),
			Err(NomErr::Error(err) | NomErr::Failure(err)) => {
				let consumed: usize = pattern.len() - err.input.len();
				Err(SyntaxError {
					position: pattern[..consumed].chars().count(),
					kind: err.kind,
				})
			},
			Err(NomErr::Incomplete(_)) => Err(SyntaxError {
				position: pattern.chars().count(),
				kind: SyntaxErrorKind::MissingOperand,
			}),
		}
	}
}

impl<S: std::fmt::Display> std::fmt::Display for Regex<S> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.write_at(fmt, 0)
	}
}

impl<S: std::fmt::Display> Regex<S> {
	/// Precedence: union 0, concatenation 1, star 2.
	fn write_at(&self, fmt: &mut std::fmt::Formatter<'_>, outer: u8) -> std::fmt::Result {
		let own: u8 = match self {
			Self::Union(..) => 0,
			Self::Concatenation(..) => 1,
			_ => 2,
		};
		if own < outer {
			fmt.write_str("(")?;
		}
		match self {
			Self::EmptyLanguage => fmt.write_str("ϕ")?,
			Self::EmptyString => fmt.write_str("λ")?,
			Self::Symbol(symbol) => write!(fmt, "{symbol}")?,
			Self::Concatenation(first, second) => {
				first.write_at(fmt, 1)?;
				second.write_at(fmt, 2)?;
			},
			Self::Union(left, right) => {
				left.write_at(fmt, 0)?;
				fmt.write_str("+")?;
				right.write_at(fmt, 1)?;
			},
			Self::StarClosure(item) => {
				item.write_at(fmt, 2)?;
				fmt.write_str("*")?;
			},
		}
		if own < outer {
			fmt.write_str(")")?;
		}
		Ok(())
	}
}

#[derive(Debug)]
struct RegexParsingError<'a> {
	input: &'a str,
	kind: SyntaxErrorKind,
}

impl<'a> ParseError<&'a str> for RegexParsingError<'a> {
	fn from_error_kind(input: &'a str, _: NomErrorKind) -> Self {
		Self {
			input,
			kind: SyntaxErrorKind::MissingOperand,
		}
	}

	fn append(_: &'a str, _: NomErrorKind, other: Self) -> Self {
		other
	}
}

impl<'a> RegexParsingError<'a> {
	fn new(input: &'a str, kind: SyntaxErrorKind) -> Self {
		Self { input, kind }
	}
}

type ParsingResult<'a, T> = IResult<&'a str, T, RegexParsingError<'a>>;

struct RegexParser<'a> {
	alphabet: &'a Alphabet<char>,
	syntax: &'a RegexSyntax,
}

impl RegexParser<'_> {
	fn pattern<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		if input.is_empty() {
			return Ok((input, Regex::EmptyString));
		}

		let (input, regex): (&str, Regex<char>) = self.union(input)?;

		// Everything but a stray closing parenthesis is consumed by `union`.
		if !input.is_empty() {
			return Err(NomErr::Failure(RegexParsingError::new(
				input,
				SyntaxErrorKind::UnbalancedParenthesis,
			)));
		}

		Ok((input, regex))
	}

	fn union<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::combinator::cut;

		let (mut input, mut regex): (&str, Regex<char>) = self.concatenation(input)?;

		loop {
			match parse_char::<'+'>(input) {
				Ok((remaining, _)) => {
					// Cut: a '+' must be followed by an operand.
					let (remaining, right): (&str, Regex<char>) =
						cut(|i: &'i str| self.concatenation(i)).parse(remaining)?;
					input = remaining;
					regex = regex.or(right);
				},
				Err(NomErr::Error(_)) => {
					break;
				},
				Err(err) => {
					return Err(err);
				},
			}
		}

		Ok((input, regex))
	}

	fn concatenation<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::combinator::cut;

		let (mut input, mut regex): (&str, Regex<char>) = cut(|i: &'i str| self.starred(i)).parse(input)?;

		loop {
			match self.starred(input) {
				Ok((remaining, item)) => {
					input = remaining;
					regex = regex.concat(item);
				},
				Err(NomErr::Error(_)) => {
					break;
				},
				Err(err) => {
					return Err(err);
				},
			}
		}

		Ok((input, regex))
	}

	fn starred<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::multi::many0;

		let (input, regex): (&str, Regex<char>) = self.term(input)?;
		let (input, stars): (&str, Vec<char>) = many0(parse_char::<'*'>).parse(input)?;

		Ok((input, stars.iter().fold(regex, |regex, _| regex.star())))
	}

	fn term<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::branch::alt;

		alt((
			|i: &'i str| self.parenthesized(i),
			|i: &'i str| self.literal(i),
			|i: &'i str| self.marker(i),
			diagnostic_unknown_symbol,
		))
		.parse(input)
	}

	fn parenthesized<'i>(&self, open: &'i str) -> ParsingResult<'i, Regex<char>> {
		let (input, _): (&str, char) = parse_char::<'('>(open)?;

		if let Ok((input, _)) = parse_char::<')'>(input) {
			return Ok((input, Regex::EmptyString));
		}

		let (input, regex): (&str, Regex<char>) = match self.union(input) {
			Ok(parsed) => parsed,
			// Input ran out before the group was closed.
			Err(NomErr::Failure(err)) if err.kind == SyntaxErrorKind::MissingOperand && err.input.is_empty() => {
				return Err(NomErr::Failure(RegexParsingError::new(
					open,
					SyntaxErrorKind::UnbalancedParenthesis,
				)));
			},
			Err(err) => {
				return Err(err);
			},
		};

		match parse_char::<')'>(input) {
			Ok((input, _)) => Ok((input, regex)),
			// Point at the parenthesis that was never closed.
			Err(_) => Err(NomErr::Failure(RegexParsingError::new(
				open,
				SyntaxErrorKind::UnbalancedParenthesis,
			))),
		}
	}

	fn literal<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::character::complete::satisfy;

		satisfy(|ch| !OPERATORS.contains(ch) && self.alphabet.contains(&ch))
			.map(Regex::Symbol)
			.parse(input)
	}

	fn marker<'i>(&self, input: &'i str) -> ParsingResult<'i, Regex<char>> {
		use nom::character::complete::anychar;

		let (remaining, ch): (&str, char) = anychar(input)?;

		if ch == self.syntax.empty_string {
			Ok((remaining, Regex::EmptyString))
		} else if ch == self.syntax.empty_language {
			Ok((remaining, Regex::EmptyLanguage))
		} else {
			Err(NomErr::Error(RegexParsingError::new(
				input,
				SyntaxErrorKind::MissingOperand,
			)))
		}
	}
}

fn parse_char<const CHAR: char>(input: &str) -> ParsingResult<'_, char> {
	let mut chars: std::str::Chars = input.chars();

	if let Some(ch) = chars.next() {
		if ch == CHAR {
			return Ok((chars.as_str(), ch));
		}
	}

	Err(NomErr::Error(RegexParsingError::new(
		input,
		SyntaxErrorKind::MissingOperand,
	)))
}

/// Last resort of `term`: an operator or the end of input means the operand is missing
/// (recoverable), anything else is a symbol outside the alphabet (fatal).
fn diagnostic_unknown_symbol(input: &str) -> ParsingResult<'_, Regex<char>> {
	match input.chars().next() {
		Some(ch) if !OPERATORS.contains(ch) => Err(NomErr::Failure(RegexParsingError::new(
			input,
			SyntaxErrorKind::UnknownSymbol(ch),
		))),
		_ => Err(NomErr::Error(RegexParsingError::new(
			input,
			SyntaxErrorKind::MissingOperand,
		))),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::alphabet::test::words;

	fn abc() -> Alphabet<char> {
		Alphabet::new(['a', 'b', 'c'])
	}

	#[test]
	fn compiles_to_nfa() {
		let r: Regex<char> = Regex::parse("c(a+b)*c", &abc()).unwrap();
		let nfa: Nfa<char> = r.to_nfa(&abc()).unwrap();
		for accepted in ["cc", "cabc", "caaabbbc"] {
			assert!(nfa.recognizes(accepted.chars()).unwrap(), "{accepted:?}");
		}
		for rejected in ["ca", "abc", "", "c", "cacc"] {
			assert!(!nfa.recognizes(rejected.chars()).unwrap(), "{rejected:?}");
		}
	}

	#[test]
	fn optimized_dfa_agrees_with_nfa() {
		let r: Regex<char> = Regex::parse("c(a+b)*c", &abc()).unwrap();
		let nfa: Nfa<char> = r.to_nfa(&abc()).unwrap();
		let dfa: Dfa<char> = r.to_optimized_dfa(&abc()).unwrap();
		// start, inside, accepted, dead
		assert_eq!(dfa.num_states(), 4);
		assert!(dfa.is_minimal());
		for word in words(&['a', 'b', 'c'], 5) {
			assert_eq!(
				nfa.recognizes(word.chars()).unwrap(),
				dfa.recognizes(word.chars()).unwrap(),
				"{word:?}"
			);
		}
	}

	#[test]
	fn precedence() {
		let a: Regex<char> = Regex::symbol('a');
		let b: Regex<char> = Regex::symbol('b');
		let c: Regex<char> = Regex::symbol('c');

		assert_eq!(
			Regex::parse("ab+c", &abc()).unwrap(),
			a.clone().concat(b.clone()).or(c.clone())
		);
		assert_eq!(
			Regex::parse("a+bc*", &abc()).unwrap(),
			a.clone().or(b.clone().concat(c.clone().star()))
		);
		assert_eq!(
			Regex::parse("(ab)*", &abc()).unwrap(),
			a.clone().concat(b.clone()).star()
		);
		assert_eq!(Regex::parse("a**", &abc()).unwrap(), a.clone().star().star());
		assert_eq!(
			Regex::parse("abc", &abc()).unwrap(),
			a.clone().concat(b.clone()).concat(c.clone())
		);
	}

	#[test]
	fn primitives() {
		assert_eq!(Regex::parse("", &abc()).unwrap(), Regex::EmptyString);
		assert_eq!(Regex::parse("()", &abc()).unwrap(), Regex::EmptyString);
		assert_eq!(Regex::parse("λ", &abc()).unwrap(), Regex::EmptyString);
		assert_eq!(
			Regex::parse("ϕ+a", &abc()).unwrap(),
			Regex::EmptyLanguage.or(Regex::symbol('a'))
		);

		let syntax: RegexSyntax = RegexSyntax {
			empty_string: 'e',
			empty_language: '0',
		};
		assert_eq!(
			Regex::parse_with("a(e+0)", &abc(), &syntax).unwrap(),
			Regex::symbol('a').concat(Regex::EmptyString.or(Regex::EmptyLanguage))
		);

		let nfa: Nfa<char> = Regex::parse("a+λ", &abc()).unwrap().to_nfa(&abc()).unwrap();
		assert!(nfa.recognizes("".chars()).unwrap());
		assert!(nfa.recognizes("a".chars()).unwrap());
		assert!(!nfa.recognizes("aa".chars()).unwrap());
	}

	#[test]
	fn unbalanced_parentheses() {
		{
			let e: SyntaxError = Regex::parse("c(ab", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::UnbalancedParenthesis);
			assert_eq!(e.position, 1);
		}
		{
			let e: SyntaxError = Regex::parse("ab)c", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::UnbalancedParenthesis);
			assert_eq!(e.position, 2);
		}
		{
			let e: SyntaxError = Regex::parse("((a)", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::UnbalancedParenthesis);
			assert_eq!(e.position, 0);
		}
	}

	#[test]
	fn unclosed_parenthesis_at_end() {
		for (pattern, position) in [("(", 0), ("c(", 1), ("((", 1), ("(a+", 0), ("a(b+", 1)] {
			let e: SyntaxError = Regex::parse(pattern, &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::UnbalancedParenthesis, "{pattern:?}");
			assert_eq!(e.position, position, "{pattern:?}");
		}

		// Outside a group the operand is what is missing.
		let e: SyntaxError = Regex::parse("a+", &abc()).unwrap_err();
		assert_eq!(e.kind, SyntaxErrorKind::MissingOperand);
		assert_eq!(e.position, 2);
	}

	#[test]
	fn unknown_symbol() {
		let e: SyntaxError = Regex::parse("λa(bd)", &abc()).unwrap_err();
		assert_eq!(e.kind, SyntaxErrorKind::UnknownSymbol('d'));
		// Counted in characters, although 'λ' takes two bytes.
		assert_eq!(e.position, 4);
	}

	#[test]
	fn missing_operand() {
		{
			let e: SyntaxError = Regex::parse("*a", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::MissingOperand);
			assert_eq!(e.position, 0);
		}
		{
			let e: SyntaxError = Regex::parse("a+", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::MissingOperand);
			assert_eq!(e.position, 2);
		}
		{
			let e: SyntaxError = Regex::parse("(+a)", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::MissingOperand);
			assert_eq!(e.position, 1);
		}
		{
			let e: SyntaxError = Regex::parse("a(*)", &abc()).unwrap_err();
			assert_eq!(e.kind, SyntaxErrorKind::MissingOperand);
			assert_eq!(e.position, 2);
		}
	}

	#[test]
	fn display_round_trips_through_parse() {
		for pattern in ["c(a+b)*c", "ab+c", "a(b+c)", "(ab)*", "a**", "ϕ+λ", "a(bc)"] {
			let r: Regex<char> = Regex::parse(pattern, &abc()).unwrap();
			assert_eq!(r.to_string(), pattern);
			assert_eq!(Regex::parse(&r.to_string(), &abc()).unwrap(), r);
		}
	}

	#[test]
	fn foreign_symbol_in_tree() {
		let r: Regex<char> = Regex::symbol('a').concat(Regex::symbol('z'));
		assert_eq!(
			r.to_nfa(&abc()),
			Err(ConstructionError::UnknownSymbol {
				symbol: "'z'".to_owned()
			})
		);
	}
}
