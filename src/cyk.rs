use std::collections::BTreeSet;

use crate::error::PreconditionError;
use crate::grammar::Grammar;
use crate::grammar::Production;

impl Grammar {
	pub fn is_chomsky_normal_form(&self) -> bool {
		self.first_non_normal_production().is_none()
	}

	fn first_non_normal_production(&self) -> Option<&Production> {
		self.productions().iter().find(|production| match production.rhs() {
			[symbol] => self.is_variable(*symbol),
			[first, second] => !self.is_variable(*first) || !self.is_variable(*second),
			_ => true,
		})
	}

	/// CYK membership test; the grammar must be in Chomsky normal form.
	/// Symbols that are not terminals make the input a non-member.
	pub fn is_member<I>(&self, input: I) -> Result<bool, PreconditionError>
	where
		I: IntoIterator<Item = char>,
	{
		if let Some(production) = self.first_non_normal_production() {
			return Err(PreconditionError::NotChomskyNormalForm {
				production: production.to_string(),
			});
		}

		let input: Vec<char> = input.into_iter().collect::<Vec<_>>();
		let n: usize = input.len();
		if n == 0 {
			return Ok(self.accepts_empty());
		}

		let mut terminal_rules: Vec<(char, char)> = Vec::new();
		let mut binary_rules: Vec<(char, char, char)> = Vec::new();
		for production in self.productions() {
			match production.rhs() {
				[terminal] => terminal_rules.push((production.lhs(), *terminal)),
				[first, second] => binary_rules.push((production.lhs(), *first, *second)),
				_ => {},
			}
		}

		// table[start * n + end] holds the variables deriving input[start..=end]
		let mut table: Vec<BTreeSet<char>> = vec![BTreeSet::new(); n * n];
		for (i, symbol) in input.iter().enumerate() {
			table[i * n + i] = terminal_rules
				.iter()
				.filter(|(_, terminal)| terminal == symbol)
				.map(|(lhs, _)| *lhs)
				.collect::<BTreeSet<_>>();
		}

		for span in 2..=n {
			for start in 0..=n - span {
				let end: usize = start + span - 1;
				let mut derivers: BTreeSet<char> = BTreeSet::new();
				for split in start..end {
					let left: &BTreeSet<char> = &table[start * n + split];
					let right: &BTreeSet<char> = &table[(split + 1) * n + end];
					if left.is_empty() || right.is_empty() {
						continue;
					}
					derivers.extend(
						binary_rules
							.iter()
							.filter(|(_, first, second)| left.contains(first) && right.contains(second))
							.map(|(lhs, _, _)| *lhs),
					);
				}
				table[start * n + end] = derivers;
			}
		}

		let member: bool = table[n - 1].contains(&self.start());
		trace!("CYK over {} symbols: member = {}", n, member);
		Ok(member)
	}
}
