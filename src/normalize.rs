use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::error::ConstructionError;
use crate::grammar::Grammar;
use crate::grammar::GrammarKind;
use crate::grammar::Production;

/// Allocates variable names unused by a grammar.
///
/// The cursor only moves forward from `'A'` through upper-case characters and never
/// hands out a terminal, an existing variable or a name it returned before.
#[derive(Debug, Clone)]
pub struct FreshVariables {
	next: Option<char>,
	taken: BTreeSet<char>,
}

impl FreshVariables {
	pub fn new(grammar: &Grammar) -> Self {
		Self {
			next: Some('A'),
			taken: grammar
				.terminals()
				.union(grammar.variables())
				.copied()
				.collect::<BTreeSet<_>>(),
		}
	}

	pub fn allocate(&mut self) -> Result<char, ConstructionError> {
		while let Some(candidate) = self.next {
			self.next = (candidate as u32 + 1..=char::MAX as u32).find_map(char::from_u32);
			if candidate.is_uppercase() && self.taken.insert(candidate) {
				return Ok(candidate);
			}
		}
		Err(ConstructionError::VariablesExhausted)
	}
}

impl Grammar {
	/// Variables that derive the empty string.
	pub fn nullable_variables(&self) -> BTreeSet<char> {
		let mut nullable: BTreeSet<char> = BTreeSet::new();
		let mut changed: bool = true;
		while changed {
			changed = false;
			for production in self.productions() {
				if !nullable.contains(&production.lhs())
					&& production.rhs().iter().all(|symbol| nullable.contains(symbol))
				{
					nullable.insert(production.lhs());
					changed = true;
				}
			}
		}
		nullable
	}

	/// Drops variables that derive no terminal string, then those unreachable from the
	/// start symbol, along with every production mentioning them. The start symbol
	/// always stays a variable.
	pub fn remove_useless_productions(&self) -> Self {
		let mut generating: BTreeSet<char> = BTreeSet::new();
		let mut changed: bool = true;
		while changed {
			changed = false;
			for production in self.productions() {
				if !generating.contains(&production.lhs())
					&& production
						.rhs()
						.iter()
						.all(|symbol| !self.is_variable(*symbol) || generating.contains(symbol))
				{
					generating.insert(production.lhs());
					changed = true;
				}
			}
		}

		let generated: Vec<&Production> = self
			.productions()
			.iter()
			.filter(|production| {
				generating.contains(&production.lhs())
					&& production
						.rhs()
						.iter()
						.all(|symbol| !self.is_variable(*symbol) || generating.contains(symbol))
			})
			.collect::<Vec<_>>();

		let mut reachable: BTreeSet<char> = BTreeSet::from([self.start()]);
		let mut stack: Vec<char> = vec![self.start()];
		while let Some(variable) = stack.pop() {
			for production in generated.iter().filter(|production| production.lhs() == variable) {
				for &symbol in production.rhs() {
					if self.is_variable(symbol) && reachable.insert(symbol) {
						stack.push(symbol);
					}
				}
			}
		}

		let productions: BTreeSet<Production> = generated
			.into_iter()
			.filter(|production| reachable.contains(&production.lhs()))
			.cloned()
			.collect::<BTreeSet<_>>();
		debug!(
			"useless removal: {} generating, {} reachable, {} -> {} productions",
			generating.len(),
			reachable.len(),
			self.productions().len(),
			productions.len()
		);

		Self::from_parts(
			self.terminals().clone(),
			reachable,
			productions,
			self.start(),
			self.kind(),
			self.accepts_empty(),
		)
	}

	/// Replaces every production by all its variants with some nullable occurrences
	/// deleted, and drops empty productions. The result generates the original language
	/// without the empty string.
	pub fn remove_lambda_productions(&self) -> Self {
		let nullable: BTreeSet<char> = self.nullable_variables();

		let mut productions: BTreeSet<Production> = BTreeSet::new();
		for production in self.productions() {
			let mut variants: Vec<Vec<char>> = vec![Vec::new()];
			for &symbol in production.rhs() {
				let mut next: Vec<Vec<char>> = Vec::with_capacity(variants.len() * 2);
				for variant in variants {
					if nullable.contains(&symbol) {
						next.push(variant.clone());
					}
					let mut kept: Vec<char> = variant;
					kept.push(symbol);
					next.push(kept);
				}
				variants = next;
			}
			productions.extend(
				variants
					.into_iter()
					.filter(|rhs| !rhs.is_empty())
					.map(|rhs| Production::new(production.lhs(), rhs)),
			);
		}
		debug!(
			"lambda removal: {} nullable, {} -> {} productions",
			nullable.len(),
			self.productions().len(),
			productions.len()
		);

		Self::from_parts(
			self.terminals().clone(),
			self.variables().clone(),
			productions,
			self.start(),
			self.kind(),
			false,
		)
	}

	/// Replaces unit productions `A -> B` by copies of the non-unit productions of every
	/// variable reachable from `A` through unit productions.
	pub fn remove_unit_productions(&self) -> Self {
		let is_unit = |production: &Production| -> bool {
			production.rhs().len() == 1 && self.is_variable(production.rhs()[0])
		};

		let mut unit_targets: BTreeMap<char, Vec<char>> = BTreeMap::new();
		for production in self.productions().iter().filter(|production| is_unit(production)) {
			unit_targets
				.entry(production.lhs())
				.or_default()
				.push(production.rhs()[0]);
		}

		let mut productions: BTreeSet<Production> = BTreeSet::new();
		for &origin in self.variables() {
			let mut reached: Vec<char> = vec![origin];
			let mut visited: BTreeSet<char> = BTreeSet::from([origin]);
			let mut i: usize = 0;
			while i < reached.len() {
				for &target in unit_targets.get(&reached[i]).into_iter().flatten() {
					if visited.insert(target) {
						reached.push(target);
					}
				}
				i += 1;
			}
			for &variable in &reached {
				productions.extend(
					self.productions_of(variable)
						.filter(|production| !is_unit(production))
						.map(|production| Production::new(origin, production.rhs().iter().copied())),
				);
			}
		}
		debug!(
			"unit removal: {} -> {} productions",
			self.productions().len(),
			productions.len()
		);

		Self::from_parts(
			self.terminals().clone(),
			self.variables().clone(),
			productions,
			self.start(),
			self.kind(),
			self.accepts_empty(),
		)
	}

	/// New start variable `S'` with `S' -> λ | S`.
	pub fn add_empty_string(&self) -> Result<Self, ConstructionError> {
		let mut fresh: FreshVariables = FreshVariables::new(self);
		let start: char = fresh.allocate()?;

		let mut productions: BTreeSet<Production> = self.productions().clone();
		productions.insert(Production::new(start, []));
		productions.insert(Production::new(start, [self.start()]));

		let mut variables: BTreeSet<char> = self.variables().clone();
		variables.insert(start);

		Ok(Self::from_parts(
			self.terminals().clone(),
			variables,
			productions,
			start,
			self.kind(),
			false,
		))
	}

	/// Equivalent grammar with only `A -> BC` and `A -> a` productions.
	///
	/// Membership of the empty string survives as [`Grammar::accepts_empty`].
	pub fn to_chomsky_normal_form(&self) -> Result<Self, ConstructionError> {
		let accepts_empty: bool = self.accepts_empty() || self.nullable_variables().contains(&self.start());
		let reduced: Grammar = self
			.remove_lambda_productions()
			.remove_unit_productions()
			.remove_useless_productions();

		let mut fresh: FreshVariables = FreshVariables::new(&reduced);
		let mut variables: BTreeSet<char> = reduced.variables().clone();
		let mut terminal_variables: BTreeMap<char, char> = BTreeMap::new();
		let mut productions: BTreeSet<Production> = BTreeSet::new();

		for production in reduced.productions() {
			if production.rhs().len() < 2 {
				productions.insert(production.clone());
				continue;
			}

			let mut symbols: Vec<char> = Vec::with_capacity(production.rhs().len());
			for &symbol in production.rhs() {
				if reduced.is_variable(symbol) {
					symbols.push(symbol);
					continue;
				}
				let variable: char = match terminal_variables.get(&symbol) {
					Some(&variable) => variable,
					None => {
						let variable: char = fresh.allocate()?;
						terminal_variables.insert(symbol, variable);
						variables.insert(variable);
						productions.insert(Production::new(variable, [symbol]));
						variable
					},
				};
				symbols.push(variable);
			}

			// A -> X1 X2 ... Xn becomes A -> X1 C1, C1 -> X2 C2, ..., Cn-2 -> Xn-1 Xn
			let mut head: char = production.lhs();
			let (chained, last_pair): (&[char], &[char]) = symbols.split_at(symbols.len() - 2);
			for &symbol in chained {
				let next: char = fresh.allocate()?;
				variables.insert(next);
				productions.insert(Production::new(head, [symbol, next]));
				head = next;
			}
			productions.insert(Production::new(head, last_pair.iter().copied()));
		}
		debug!(
			"chomsky normal form: {} variables, {} productions, {} terminal variables",
			variables.len(),
			productions.len(),
			terminal_variables.len()
		);

		Ok(Self::from_parts(
			reduced.terminals().clone(),
			variables,
			productions,
			reduced.start(),
			GrammarKind::ContextFree,
			accepts_empty,
		))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::grammar::GrammarBuilder;
	use crate::grammar::test::nullable_grammar;

	fn short(produced: Vec<String>, max_len: usize) -> BTreeSet<String> {
		produced
			.into_iter()
			.filter(|s| s.chars().count() <= max_len)
			.collect::<BTreeSet<_>>()
	}

	#[test]
	fn nullable_variables() {
		assert_eq!(nullable_grammar().nullable_variables(), BTreeSet::from(['A', 'B', 'S']));
	}

	#[test]
	fn lambda_removal_keeps_non_empty_strings() {
		let g: Grammar = nullable_grammar();
		let free: Grammar = g.remove_lambda_productions();
		assert!(free.productions().iter().all(|production| !production.is_empty()));
		assert!(free.productions().contains(&Production::new('S', ['A'])));
		assert!(free.productions().contains(&Production::new('S', ['B'])));
		assert!(free.productions().contains(&Production::new('A', ['a'])));

		let mut expected: BTreeSet<String> = short(g.produce(6), 3);
		assert!(expected.remove(""));
		assert_eq!(short(free.produce(6), 3), expected);
		assert_eq!(expected.len(), 9);
		assert_eq!(free.remove_lambda_productions(), free);
	}

	#[test]
	fn useless_removal() {
		let g: Grammar = GrammarBuilder::new()
			.production('S', "AB|a")
			.production('A', "a")
			.production('B', "bB")
			.production('C', "c")
			.build()
			.unwrap();
		let reduced: Grammar = g.remove_useless_productions();
		assert_eq!(reduced.variables(), &BTreeSet::from(['S']));
		assert_eq!(reduced.productions(), &BTreeSet::from([Production::new('S', ['a'])]));
		assert_eq!(reduced.remove_useless_productions(), reduced);
	}

	#[test]
	fn useless_removal_keeps_start() {
		let g: Grammar = GrammarBuilder::new().production('S', "aS").build().unwrap();
		let reduced: Grammar = g.remove_useless_productions();
		assert_eq!(reduced.variables(), &BTreeSet::from(['S']));
		assert!(reduced.productions().is_empty());
		assert!(reduced.produce(5).is_empty());
	}

	#[test]
	fn unit_removal() {
		let g: Grammar = GrammarBuilder::new()
			.production('S', "A|b")
			.production('A', "B|a")
			.production('B', "c|S")
			.build()
			.unwrap();
		let reduced: Grammar = g.remove_unit_productions();
		let rhs_of = |variable: char| -> BTreeSet<String> {
			reduced
				.productions_of(variable)
				.map(|production| production.rhs().iter().collect::<String>())
				.collect::<BTreeSet<_>>()
		};
		// The unit cycle S -> A -> B -> S puts every terminal in every variable.
		for variable in ['S', 'A', 'B'] {
			assert_eq!(rhs_of(variable), BTreeSet::from(["a".to_owned(), "b".to_owned(), "c".to_owned()]));
		}
		assert_eq!(reduced.remove_unit_productions(), reduced);
	}

	#[test]
	fn empty_string_comes_back() {
		let g: Grammar = GrammarBuilder::new().production('S', "a").build().unwrap();
		let with_empty: Grammar = g.add_empty_string().unwrap();
		assert_eq!(with_empty.start(), 'A');
		assert!(with_empty.productions().contains(&Production::new('A', [])));
		assert!(with_empty.productions().contains(&Production::new('A', ['S'])));
		assert_eq!(with_empty.produce(2), ["", "a"]);
	}

	#[test]
	fn fresh_variables_skip_taken_names() {
		let g: Grammar = GrammarBuilder::new()
			.terminals(['B'])
			.variables(['S', 'A'])
			.production('S', "AB")
			.production('A', "B")
			.build()
			.unwrap();
		let mut fresh: FreshVariables = FreshVariables::new(&g);
		assert_eq!(fresh.allocate(), Ok('C'));
		assert_eq!(fresh.allocate(), Ok('D'));
		assert_eq!(fresh.allocate(), Ok('E'));
	}

	#[test]
	fn chomsky_normal_form_shape() {
		let g: Grammar = GrammarBuilder::new()
			.production('S', "aSb|ab|λ")
			.build()
			.unwrap();
		let cnf: Grammar = g.to_chomsky_normal_form().unwrap();
		assert!(cnf.accepts_empty());
		for production in cnf.productions() {
			match production.rhs() {
				[terminal] => assert!(cnf.terminals().contains(terminal), "{production}"),
				[first, second] => {
					assert!(cnf.is_variable(*first), "{production}");
					assert!(cnf.is_variable(*second), "{production}");
				},
				_ => panic!("{production}"),
			}
		}
		// a^n b^n takes 4n - 1 steps in normal form.
		assert_eq!(short(cnf.produce(11), 6), short(g.produce(11), 6));
		assert_eq!(cnf.to_chomsky_normal_form().unwrap(), cnf);
	}

	#[test]
	fn chomsky_normal_form_names() {
		// S -> abc: terminals get A, B, C in production order, the chain gets D.
		let g: Grammar = GrammarBuilder::new().production('S', "abc").build().unwrap();
		let cnf: Grammar = g.to_chomsky_normal_form().unwrap();
		let expected: BTreeSet<Production> = BTreeSet::from([
			Production::new('A', ['a']),
			Production::new('B', ['b']),
			Production::new('C', ['c']),
			Production::new('S', ['A', 'D']),
			Production::new('D', ['B', 'C']),
		]);
		assert_eq!(cnf.productions(), &expected);
		assert_eq!(cnf.variables(), &BTreeSet::from(['A', 'B', 'C', 'D', 'S']));
		assert!(!cnf.accepts_empty());
	}
}
