use std::collections::BTreeSet;

use crate::alphabet::Alphabet;
use crate::alphabet::Symbol;
use crate::alphabet::TransitionTable;
use crate::error::AlphabetError;
use crate::error::ConstructionError;

/// Deterministic automaton with a total transition function.
/// State `0` is the initial state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Dfa<S: Symbol> {
	alphabet: Alphabet<S>,
	transitions: TransitionTable<usize>,
	finals: BTreeSet<usize>,
}

impl<S: Symbol> Dfa<S> {
	/// Every `(state, symbol)` pair must be given exactly one target.
	pub fn new<T, F>(alphabet: Alphabet<S>, states: usize, transitions: T, finals: F) -> Result<Self, ConstructionError>
	where
		T: IntoIterator<Item = (usize, S, usize)>,
		F: IntoIterator<Item = usize>,
	{
		let partial: TransitionTable<Option<usize>> = partial_table(&alphabet, states, transitions)?;
		let finals: BTreeSet<usize> = check_states(states, finals)?;

		let mut table: TransitionTable<usize> = TransitionTable::filled(states, alphabet.len(), 0);
		for state in 0..states {
			for symbol in 0..alphabet.len() {
				table[(state, symbol)] = partial[(state, symbol)].ok_or_else(|| ConstructionError::MissingTransition {
					state,
					symbol: format!("{:?}", alphabet.symbol(symbol)),
				})?;
			}
		}

		Ok(Self::from_parts(alphabet, table, finals))
	}

	/// Like [`Dfa::new`], but missing transitions lead to a trap state appended after the given states.
	/// The trap state is non-final and loops to itself on every symbol.
	pub fn with_trap<T, F>(
		alphabet: Alphabet<S>,
		states: usize,
		transitions: T,
		finals: F,
	) -> Result<Self, ConstructionError>
	where
		T: IntoIterator<Item = (usize, S, usize)>,
		F: IntoIterator<Item = usize>,
	{
		let partial: TransitionTable<Option<usize>> = partial_table(&alphabet, states, transitions)?;
		let finals: BTreeSet<usize> = check_states(states, finals)?;

		let trap: usize = states;
		let mut table: TransitionTable<usize> = TransitionTable::filled(states + 1, alphabet.len(), trap);
		for state in 0..states {
			for symbol in 0..alphabet.len() {
				if let Some(target) = partial[(state, symbol)] {
					table[(state, symbol)] = target;
				}
			}
		}

		Ok(Self::from_parts(alphabet, table, finals))
	}

	/// Callers guarantee the table is total and every state index is in range.
	pub(crate) fn from_parts(alphabet: Alphabet<S>, transitions: TransitionTable<usize>, finals: BTreeSet<usize>) -> Self {
		debug_assert_eq!(alphabet.len(), transitions.width());
		debug_assert!(finals.iter().all(|&f| f < transitions.num_states()));
		Self {
			alphabet,
			transitions,
			finals,
		}
	}
}

impl<S: Symbol> Dfa<S> {
	pub fn alphabet(&self) -> &Alphabet<S> {
		&self.alphabet
	}

	pub fn num_states(&self) -> usize {
		self.transitions.num_states()
	}

	pub fn finals(&self) -> &BTreeSet<usize> {
		&self.finals
	}

	pub fn is_final(&self, state: usize) -> bool {
		self.finals.contains(&state)
	}

	/// `None` if the state is out of range or the symbol is not in the alphabet.
	pub fn transition(&self, state: usize, symbol: &S) -> Option<usize> {
		let symbol: usize = self.alphabet.index_of(symbol)?;
		(state < self.num_states()).then(|| self.transitions[(state, symbol)])
	}

	pub fn recognizes<I>(&self, input: I) -> Result<bool, AlphabetError>
	where
		I: IntoIterator<Item = S>,
	{
		let input: Vec<usize> = self.alphabet.encode(input)?;
		let end: usize = input
			.iter()
			.fold(0, |state, &symbol| self.transitions[(state, symbol)]);
		trace!("input of length {} ended in state {end}", input.len());
		Ok(self.is_final(end))
	}

	pub fn reachable_states(&self) -> BTreeSet<usize> {
		let mut reachable: BTreeSet<usize> = BTreeSet::from([0]);
		let mut stack: Vec<usize> = vec![0];

		while let Some(state) = stack.pop() {
			for &next in self.transitions.row(state) {
				if reachable.insert(next) {
					stack.push(next);
				}
			}
		}

		reachable
	}

	/// Table-filling minimization.
	///
	/// Unreachable states are dropped first, then indistinguishable states are merged.
	/// Each class is numbered in order of its lowest surviving state,
	/// so the result only depends on the numbering of the input.
	pub fn minimize(&self) -> Self {
		let reachable: Self = self.without_unreachable();
		let n: usize = reachable.num_states();
		let distinguishable: Vec<Vec<bool>> = reachable.distinguishable_pairs();

		let mut class_of: Vec<usize> = vec![0; n];
		let mut classes: usize = 0;
		'states: for i in 0..n {
			for j in 0..i {
				if !distinguishable[i][j] {
					class_of[i] = class_of[j];
					continue 'states;
				}
			}
			class_of[i] = classes;
			classes += 1;
		}

		let width: usize = reachable.alphabet.len();
		let mut transitions: TransitionTable<usize> = TransitionTable::filled(classes, width, 0);
		for state in 0..n {
			for symbol in 0..width {
				transitions[(class_of[state], symbol)] = class_of[reachable.transitions[(state, symbol)]];
			}
		}
		let finals: BTreeSet<usize> = reachable.finals.iter().map(|&f| class_of[f]).collect::<BTreeSet<_>>();

		debug!(
			"minimized {} states to {classes} ({} reachable)",
			self.num_states(),
			n
		);

		Self::from_parts(reachable.alphabet, transitions, finals)
	}

	/// Whether every state is reachable and every pair of states is distinguishable.
	pub fn is_minimal(&self) -> bool {
		if self.reachable_states().len() != self.num_states() {
			return false;
		}
		let distinguishable: Vec<Vec<bool>> = self.distinguishable_pairs();
		(0..self.num_states()).all(|p| (0..p).all(|q| distinguishable[p][q]))
	}

	/// Keeps the reachable states, renumbered densely in their original relative order.
	fn without_unreachable(&self) -> Self {
		let reachable: BTreeSet<usize> = self.reachable_states();

		let mut renumbered: Vec<Option<usize>> = vec![None; self.num_states()];
		for (new, &old) in reachable.iter().enumerate() {
			renumbered[old] = Some(new);
		}

		let width: usize = self.alphabet.len();
		let mut transitions: TransitionTable<usize> = TransitionTable::new(width);
		for &old in reachable.iter() {
			let new: usize = transitions.push_state(0);
			for symbol in 0..width {
				// Targets of reachable states are reachable themselves.
				transitions[(new, symbol)] = renumbered[self.transitions[(old, symbol)]].unwrap_or_default();
			}
		}
		let finals: BTreeSet<usize> = self
			.finals
			.iter()
			.filter_map(|&f| renumbered[f])
			.collect::<BTreeSet<_>>();

		Self::from_parts(self.alphabet.clone(), transitions, finals)
	}

	/// `result[p][q]` (symmetric) is whether `p` and `q` are distinguishable.
	fn distinguishable_pairs(&self) -> Vec<Vec<bool>> {
		let n: usize = self.num_states();
		let mut marked: Vec<Vec<bool>> = vec![vec![false; n]; n];

		for p in 0..n {
			for q in 0..p {
				if self.is_final(p) != self.is_final(q) {
					marked[p][q] = true;
					marked[q][p] = true;
				}
			}
		}

		let mut passes: usize = 0;
		loop {
			passes += 1;
			let mut changed: bool = false;
			for p in 0..n {
				for q in 0..p {
					if marked[p][q] {
						continue;
					}
					let split: bool = (0..self.alphabet.len())
						.any(|symbol| marked[self.transitions[(p, symbol)]][self.transitions[(q, symbol)]]);
					if split {
						marked[p][q] = true;
						marked[q][p] = true;
						changed = true;
					}
				}
			}
			if !changed {
				break;
			}
		}
		debug!("table filling over {n} states settled after {passes} passes");

		marked
	}
}

fn partial_table<S, T>(
	alphabet: &Alphabet<S>,
	states: usize,
	transitions: T,
) -> Result<TransitionTable<Option<usize>>, ConstructionError>
where
	S: Symbol,
	T: IntoIterator<Item = (usize, S, usize)>,
{
	if states == 0 {
		return Err(ConstructionError::NoStates);
	}

	let mut table: TransitionTable<Option<usize>> = TransitionTable::filled(states, alphabet.len(), None);
	for (from, symbol, to) in transitions {
		check_state(states, from)?;
		check_state(states, to)?;
		let index: usize = alphabet.require(&symbol)?;
		match table[(from, index)] {
			Some(existing) if existing != to => {
				return Err(ConstructionError::ConflictingTransition {
					state: from,
					symbol: format!("{symbol:?}"),
				});
			},
			_ => {
				table[(from, index)] = Some(to);
			},
		}
	}

	Ok(table)
}

pub(crate) fn check_state(states: usize, state: usize) -> Result<usize, ConstructionError> {
	if state < states {
		Ok(state)
	} else {
		Err(ConstructionError::StateOutOfRange { state, states })
	}
}

pub(crate) fn check_states<F>(states: usize, finals: F) -> Result<BTreeSet<usize>, ConstructionError>
where
	F: IntoIterator<Item = usize>,
{
	finals
		.into_iter()
		.map(|state| check_state(states, state))
		.collect::<Result<BTreeSet<_>, _>>()
}
