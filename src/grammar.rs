use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use crate::error::ConstructionError;

/// Marks an empty right-hand side in text.
pub const EMPTY_STRING: char = 'λ';

/// Shape constraint a grammar's productions must satisfy.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum GrammarKind {
	ContextFree,
	/// Every production is `A -> w` or `A -> wB` with `w` terminal.
	RightLinear,
	/// Every production is `A -> w` or `A -> Bw` with `w` terminal.
	LeftLinear,
}

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Production {
	lhs: char,
	rhs: Vec<char>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Grammar {
	terminals: BTreeSet<char>,
	variables: BTreeSet<char>,
	productions: BTreeSet<Production>,
	start: char,
	kind: GrammarKind,
	// The empty string is a member although no production derives it.
	// Only set on grammars whose form cannot express it (CNF).
	accepts_empty: bool,
}

/// Assembles a grammar from textual productions such as `('A', "BB|a")`.
///
/// Without explicit sets, upper-case ASCII letters are variables and every other
/// symbol is a terminal.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
	terminals: Option<BTreeSet<char>>,
	variables: Option<BTreeSet<char>>,
	productions: Vec<Production>,
	start: char,
	kind: GrammarKind,
}

impl GrammarKind {
	fn admits(self, production: &Production, variables: &BTreeSet<char>) -> bool {
		let is_variable = |symbol: &char| variables.contains(symbol);
		match self {
			Self::ContextFree => true,
			Self::RightLinear => match production.rhs.split_last() {
				None => true,
				Some((_, init)) => !init.iter().any(is_variable),
			},
			Self::LeftLinear => match production.rhs.split_first() {
				None => true,
				Some((_, tail)) => !tail.iter().any(is_variable),
			},
		}
	}

	fn reversed(self) -> Self {
		match self {
			Self::ContextFree => Self::ContextFree,
			Self::RightLinear => Self::LeftLinear,
			Self::LeftLinear => Self::RightLinear,
		}
	}
}

impl Production {
	pub fn new<I>(lhs: char, rhs: I) -> Self
	where
		I: IntoIterator<Item = char>,
	{
		Self {
			lhs,
			rhs: rhs.into_iter().collect::<Vec<_>>(),
		}
	}

	pub fn lhs(&self) -> char {
		self.lhs
	}

	pub fn rhs(&self) -> &[char] {
		&self.rhs
	}

	pub fn is_empty(&self) -> bool {
		self.rhs.is_empty()
	}
}

impl std::fmt::Display for Production {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(fmt, "{} -> ", self.lhs)?;
		if self.rhs.is_empty() {
			return write!(fmt, "{EMPTY_STRING}");
		}
		for symbol in &self.rhs {
			write!(fmt, "{symbol}")?;
		}
		Ok(())
	}
}

impl Grammar {
	pub fn new<T, V, P>(
		terminals: T,
		variables: V,
		productions: P,
		start: char,
		kind: GrammarKind,
	) -> Result<Self, ConstructionError>
	where
		T: IntoIterator<Item = char>,
		V: IntoIterator<Item = char>,
		P: IntoIterator<Item = Production>,
	{
		let terminals: BTreeSet<char> = terminals.into_iter().collect::<BTreeSet<_>>();
		let variables: BTreeSet<char> = variables.into_iter().collect::<BTreeSet<_>>();
		let productions: BTreeSet<Production> = productions.into_iter().collect::<BTreeSet<_>>();

		if !variables.contains(&start) {
			return Err(ConstructionError::StartNotVariable { start });
		}
		if let Some(&symbol) = terminals.intersection(&variables).next() {
			return Err(ConstructionError::OverlappingSymbols { symbol });
		}
		for production in &productions {
			let unknown: Option<char> = std::iter::once(&production.lhs)
				.filter(|lhs| !variables.contains(*lhs))
				.chain(
					production
						.rhs
						.iter()
						.filter(|symbol| !variables.contains(*symbol) && !terminals.contains(*symbol)),
				)
				.next()
				.copied();
			if let Some(symbol) = unknown {
				return Err(ConstructionError::UnknownProductionSymbol {
					production: production.to_string(),
					symbol,
				});
			}
			if !kind.admits(production, &variables) {
				return Err(ConstructionError::ShapeViolation {
					kind,
					production: production.to_string(),
				});
			}
		}

		Ok(Self::from_parts(terminals, variables, productions, start, kind, false))
	}

	/// Skips validation; transformations that preserve the invariants use this.
	pub(crate) fn from_parts(
		terminals: BTreeSet<char>,
		variables: BTreeSet<char>,
		productions: BTreeSet<Production>,
		start: char,
		kind: GrammarKind,
		accepts_empty: bool,
	) -> Self {
		Self {
			terminals,
			variables,
			productions,
			start,
			kind,
			accepts_empty,
		}
	}

	pub fn terminals(&self) -> &BTreeSet<char> {
		&self.terminals
	}

	pub fn variables(&self) -> &BTreeSet<char> {
		&self.variables
	}

	pub fn productions(&self) -> &BTreeSet<Production> {
		&self.productions
	}

	pub fn productions_of(&self, variable: char) -> impl Iterator<Item = &Production> {
		self.productions
			.iter()
			.filter(move |production| production.lhs == variable)
	}

	pub fn start(&self) -> char {
		self.start
	}

	pub fn kind(&self) -> GrammarKind {
		self.kind
	}

	/// Whether the empty string is a member without being derivable by a production.
	pub fn accepts_empty(&self) -> bool {
		self.accepts_empty
	}

	pub fn is_variable(&self, symbol: char) -> bool {
		self.variables.contains(&symbol)
	}

	/// Terminal strings with a derivation of at most `max_depth` steps, shortest first.
	///
	/// Derivations are leftmost and explored breadth-first; every string with a
	/// derivation of at most `max_depth` steps has a leftmost one of the same length.
	pub fn produce(&self, max_depth: usize) -> Vec<String> {
		let rules: BTreeMap<char, Vec<&[char]>> = self.rules_by_variable();

		let mut produced: BTreeSet<String> = BTreeSet::new();
		if self.accepts_empty {
			produced.insert(String::new());
		}

		let mut seen: BTreeSet<Vec<char>> = BTreeSet::new();
		let mut queue: VecDeque<(Vec<char>, usize)> = VecDeque::new();
		seen.insert(vec![self.start]);
		queue.push_back((vec![self.start], 0));

		while let Some((form, depth)) = queue.pop_front() {
			let Some(leftmost) = form.iter().position(|symbol| self.variables.contains(symbol)) else {
				produced.insert(form.iter().collect::<String>());
				continue;
			};
			if depth == max_depth {
				continue;
			}
			for rhs in rules.get(&form[leftmost]).into_iter().flatten() {
				let mut next: Vec<char> = Vec::with_capacity(form.len() + rhs.len());
				next.extend_from_slice(&form[..leftmost]);
				next.extend_from_slice(rhs);
				next.extend_from_slice(&form[leftmost + 1..]);
				if seen.insert(next.clone()) {
					queue.push_back((next, depth + 1));
				}
			}
		}
		debug!("produced {} strings from {} sentential forms", produced.len(), seen.len());

		let mut produced: Vec<String> = produced.into_iter().collect::<Vec<_>>();
		produced.sort_by(|a, b| a.chars().count().cmp(&b.chars().count()).then_with(|| a.cmp(b)));
		produced
	}

	/// Grammar of the reversed language. Linear grammars swap sides.
	pub fn reversed(&self) -> Self {
		let productions: BTreeSet<Production> = self
			.productions
			.iter()
			.map(|production| Production::new(production.lhs, production.rhs.iter().rev().copied()))
			.collect::<BTreeSet<_>>();
		Self::from_parts(
			self.terminals.clone(),
			self.variables.clone(),
			productions,
			self.start,
			self.kind.reversed(),
			self.accepts_empty,
		)
	}

	pub(crate) fn rules_by_variable(&self) -> BTreeMap<char, Vec<&[char]>> {
		let mut rules: BTreeMap<char, Vec<&[char]>> = BTreeMap::new();
		for production in &self.productions {
			rules.entry(production.lhs).or_default().push(&production.rhs);
		}
		rules
	}
}

impl std::fmt::Display for Grammar {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for production in &self.productions {
			writeln!(fmt, "{production}")?;
		}
		Ok(())
	}
}

impl GrammarBuilder {
	pub fn new() -> Self {
		Self {
			terminals: None,
			variables: None,
			productions: Vec::new(),
			start: 'S',
			kind: GrammarKind::ContextFree,
		}
	}

	pub fn terminals<I: IntoIterator<Item = char>>(mut self, terminals: I) -> Self {
		self.terminals = Some(terminals.into_iter().collect::<BTreeSet<_>>());
		self
	}

	pub fn variables<I: IntoIterator<Item = char>>(mut self, variables: I) -> Self {
		self.variables = Some(variables.into_iter().collect::<BTreeSet<_>>());
		self
	}

	pub fn start(mut self, start: char) -> Self {
		self.start = start;
		self
	}

	pub fn kind(mut self, kind: GrammarKind) -> Self {
		self.kind = kind;
		self
	}

	/// Adds `lhs -> alternative` for each `|`-separated alternative.
	/// `λ` inside an alternative stands for nothing.
	pub fn production(mut self, lhs: char, alternatives: &str) -> Self {
		for alternative in alternatives.split('|') {
			self.productions.push(Production::new(
				lhs,
				alternative.chars().filter(|symbol| *symbol != EMPTY_STRING),
			));
		}
		self
	}

	pub fn build(self) -> Result<Grammar, ConstructionError> {
		let used: BTreeSet<char> = std::iter::once(self.start)
			.chain(
				self.productions
					.iter()
					.flat_map(|production| std::iter::once(production.lhs).chain(production.rhs.iter().copied())),
			)
			.collect::<BTreeSet<_>>();

		let variables: BTreeSet<char> = match self.variables {
			Some(variables) => variables,
			None => used
				.iter()
				.copied()
				.filter(|symbol| symbol.is_ascii_uppercase())
				.filter(|symbol| self.terminals.as_ref().is_none_or(|terminals| !terminals.contains(symbol)))
				.collect::<BTreeSet<_>>(),
		};
		let terminals: BTreeSet<char> = match self.terminals {
			Some(terminals) => terminals,
			None => used.difference(&variables).copied().collect::<BTreeSet<_>>(),
		};

		Grammar::new(terminals, variables, self.productions, self.start, self.kind)
	}
}

impl Default for GrammarBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
pub(crate) mod test {
	use super::*;

	/// S -> AB, A -> BB | a, B -> AB | b
	pub(crate) fn ab_grammar() -> Grammar {
		GrammarBuilder::new()
			.production('S', "AB")
			.production('A', "BB|a")
			.production('B', "AB|b")
			.build()
			.unwrap()
	}

	/// S -> AB, A -> aA | λ, B -> bB | λ
	pub(crate) fn nullable_grammar() -> Grammar {
		GrammarBuilder::new()
			.terminals(['a', 'b', 'c'])
			.production('S', "AB")
			.production('A', "aA|λ")
			.production('B', "bB|λ")
			.build()
			.unwrap()
	}

	#[test]
	fn builder_infers_symbols() {
		let g: Grammar = ab_grammar();
		assert_eq!(g.variables(), &BTreeSet::from(['A', 'B', 'S']));
		assert_eq!(g.terminals(), &BTreeSet::from(['a', 'b']));
		assert_eq!(g.start(), 'S');
		assert_eq!(g.productions().len(), 5);
		assert_eq!(g.productions_of('A').count(), 2);
		assert_eq!(g.kind(), GrammarKind::ContextFree);
	}

	#[test]
	fn builder_keeps_explicit_terminals() {
		let g: Grammar = nullable_grammar();
		assert_eq!(g.terminals(), &BTreeSet::from(['a', 'b', 'c']));
		assert!(g.productions().contains(&Production::new('A', [])));
	}

	#[test]
	fn production_display() {
		assert_eq!(Production::new('S', ['A', 'B']).to_string(), "S -> AB");
		assert_eq!(Production::new('A', []).to_string(), "A -> λ");
		assert!(Production::new('A', []).is_empty());
	}

	#[test]
	fn construction_errors() {
		assert_eq!(
			Grammar::new(['a'], ['A'], [], 'S', GrammarKind::ContextFree),
			Err(ConstructionError::StartNotVariable { start: 'S' })
		);
		assert_eq!(
			Grammar::new(['a', 'S'], ['S'], [], 'S', GrammarKind::ContextFree),
			Err(ConstructionError::OverlappingSymbols { symbol: 'S' })
		);
		assert_eq!(
			Grammar::new(
				['a'],
				['S'],
				[Production::new('S', ['a', 'x'])],
				'S',
				GrammarKind::ContextFree
			),
			Err(ConstructionError::UnknownProductionSymbol {
				production: "S -> ax".to_owned(),
				symbol: 'x',
			})
		);
		assert_eq!(
			Grammar::new(['a'], ['S'], [Production::new('T', ['a'])], 'S', GrammarKind::ContextFree),
			Err(ConstructionError::UnknownProductionSymbol {
				production: "T -> a".to_owned(),
				symbol: 'T',
			})
		);
	}

	#[test]
	fn linear_shapes() {
		let right: Result<Grammar, ConstructionError> = GrammarBuilder::new()
			.kind(GrammarKind::RightLinear)
			.production('S', "abS|λ")
			.build();
		assert!(right.is_ok());

		let wrong: Result<Grammar, ConstructionError> = GrammarBuilder::new()
			.kind(GrammarKind::RightLinear)
			.production('S', "Sa|b")
			.build();
		assert_eq!(
			wrong,
			Err(ConstructionError::ShapeViolation {
				kind: GrammarKind::RightLinear,
				production: "S -> Sa".to_owned(),
			})
		);

		let left: Result<Grammar, ConstructionError> = GrammarBuilder::new()
			.kind(GrammarKind::LeftLinear)
			.production('S', "aSb")
			.build();
		assert!(matches!(left, Err(ConstructionError::ShapeViolation { .. })));
	}

	#[test]
	fn produce_counts_derivation_steps() {
		let g: Grammar = ab_grammar();
		assert!(g.produce(0).is_empty());
		assert!(g.produce(2).is_empty());
		assert_eq!(g.produce(3), ["ab"]);
		assert_eq!(g.produce(4), ["ab"]);
		assert_eq!(g.produce(5), ["ab", "aab", "bbb"]);
	}

	#[test]
	fn produce_with_empty_productions() {
		let g: Grammar = nullable_grammar();
		assert_eq!(g.produce(3), [""]);
		assert_eq!(g.produce(4), ["", "a", "b"]);
	}

	#[test]
	fn reversal_swaps_linear_kinds() {
		let right: Grammar = GrammarBuilder::new()
			.kind(GrammarKind::RightLinear)
			.production('S', "abS|c")
			.build()
			.unwrap();
		let left: Grammar = right.reversed();
		assert_eq!(left.kind(), GrammarKind::LeftLinear);
		assert!(left.productions().contains(&Production::new('S', ['S', 'b', 'a'])));

		let reversed: Vec<String> = right
			.produce(3)
			.iter()
			.map(|s| s.chars().rev().collect::<String>())
			.collect::<Vec<_>>();
		assert_eq!(left.produce(3), reversed);
		assert_eq!(left.reversed(), right);
	}
}
