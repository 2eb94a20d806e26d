use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::alphabet::Alphabet;
use crate::alphabet::Symbol;
use crate::alphabet::TransitionTable;
use crate::dfa::Dfa;
use crate::dfa::check_state;
use crate::error::AlphabetError;
use crate::error::ConstructionError;

/// Nondeterministic automaton with epsilon transitions.
/// State `0` is the initial state.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Nfa<S: Symbol> {
	alphabet: Alphabet<S>,
	transitions: TransitionTable<BTreeSet<usize>>,
	epsilon: Vec<BTreeSet<usize>>,
	finals: BTreeSet<usize>,
}

/// Incremental construction of an [`Nfa`].
///
/// Whole automata can be spliced in with [`NfaBuilder::splice`],
/// which shifts every state of the spliced automaton by the builder's current state count.
#[derive(Debug, Clone)]
pub struct NfaBuilder<S: Symbol> {
	alphabet: Alphabet<S>,
	transitions: TransitionTable<BTreeSet<usize>>,
	epsilon: Vec<BTreeSet<usize>>,
	finals: BTreeSet<usize>,
}

impl<S: Symbol> Nfa<S> {
	pub fn new<T, E, F>(
		alphabet: Alphabet<S>,
		states: usize,
		transitions: T,
		epsilon: E,
		finals: F,
	) -> Result<Self, ConstructionError>
	where
		T: IntoIterator<Item = (usize, S, usize)>,
		E: IntoIterator<Item = (usize, usize)>,
		F: IntoIterator<Item = usize>,
	{
		let mut builder: NfaBuilder<S> = NfaBuilder::new(alphabet);
		for _ in 0..states {
			builder.add_state();
		}
		for (from, symbol, to) in transitions {
			builder.add_transition(from, &symbol, to)?;
		}
		for (from, to) in epsilon {
			builder.add_epsilon(from, to)?;
		}
		for state in finals {
			builder.mark_final(state)?;
		}
		builder.build()
	}

	/// Recognizes nothing: one non-final state.
	pub fn empty_language(alphabet: Alphabet<S>) -> Self {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(alphabet);
		builder.add_state();
		builder.finish()
	}

	/// Recognizes only the empty word: one final state.
	pub fn empty_string(alphabet: Alphabet<S>) -> Self {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(alphabet);
		let state: usize = builder.add_state();
		builder.finals.insert(state);
		builder.finish()
	}

	pub fn symbol(alphabet: Alphabet<S>, symbol: &S) -> Result<Self, ConstructionError> {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(alphabet);
		let start: usize = builder.add_state();
		let end: usize = builder.add_state();
		builder.add_transition(start, symbol, end)?;
		builder.mark_final(end)?;
		builder.build()
	}

	/// Every final state of `first` gets an epsilon edge to the initial state of `second`.
	pub fn concatenation(first: &Self, second: &Self) -> Result<Self, ConstructionError> {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(first.alphabet.clone());
		let first_offset: usize = builder.splice(first)?;
		let second_offset: usize = builder.splice(second)?;

		for &f in first.finals.iter() {
			builder.add_epsilon(f + first_offset, second_offset)?;
		}
		for &f in second.finals.iter() {
			builder.mark_final(f + second_offset)?;
		}

		builder.build()
	}

	/// A fresh initial state branches into both operands,
	/// whose final states all lead into a fresh final state.
	pub fn union(left: &Self, right: &Self) -> Result<Self, ConstructionError> {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(left.alphabet.clone());
		let start: usize = builder.add_state();
		let left_offset: usize = builder.splice(left)?;
		let right_offset: usize = builder.splice(right)?;
		let end: usize = builder.add_state();

		for (operand, offset) in [(left, left_offset), (right, right_offset)] {
			builder.add_epsilon(start, offset)?;
			for &f in operand.finals.iter() {
				builder.add_epsilon(f + offset, end)?;
			}
		}
		builder.mark_final(end)?;

		builder.build()
	}

	/// Zero or more repetitions of `item`.
	pub fn star_closure(item: &Self) -> Result<Self, ConstructionError> {
		let mut builder: NfaBuilder<S> = NfaBuilder::new(item.alphabet.clone());
		let start: usize = builder.add_state();
		let offset: usize = builder.splice(item)?;
		let end: usize = builder.add_state();

		builder.add_epsilon(start, offset)?;
		builder.add_epsilon(start, end)?;
		for &f in item.finals.iter() {
			builder.add_epsilon(f + offset, start)?;
			builder.add_epsilon(f + offset, end)?;
		}
		builder.mark_final(end)?;

		builder.build()
	}
}

impl<S: Symbol> Nfa<S> {
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

	/// Targets of the labeled transitions only, without any epsilon closure.
	pub fn targets(&self, state: usize, symbol: &S) -> Option<&BTreeSet<usize>> {
		let symbol: usize = self.alphabet.index_of(symbol)?;
		(state < self.num_states()).then(|| &self.transitions[(state, symbol)])
	}

	pub fn epsilon_targets(&self, state: usize) -> &BTreeSet<usize> {
		&self.epsilon[state]
	}

	/// All states reachable from `states` through epsilon transitions alone, including `states`.
	///
	/// # Panics
	///
	/// If any state is out of range.
	pub fn epsilon_closure(&self, states: &BTreeSet<usize>) -> BTreeSet<usize> {
		let mut closure: BTreeSet<usize> = states.clone();
		let mut stack: Vec<usize> = states.iter().copied().collect::<Vec<_>>();

		while let Some(state) = stack.pop() {
			for &next in self.epsilon[state].iter() {
				if closure.insert(next) {
					stack.push(next);
				}
			}
		}

		closure
	}

	/// One input symbol from `state`: epsilon closure, one labeled step, epsilon closure again.
	/// `None` if the state is out of range or the symbol is not in the alphabet.
	pub fn step(&self, state: usize, symbol: &S) -> Option<BTreeSet<usize>> {
		let symbol: usize = self.alphabet.index_of(symbol)?;
		if state >= self.num_states() {
			return None;
		}
		let closure: BTreeSet<usize> = self.epsilon_closure(&BTreeSet::from([state]));
		Some(self.advance(&closure, symbol))
	}

	pub fn recognizes<I>(&self, input: I) -> Result<bool, AlphabetError>
	where
		I: IntoIterator<Item = S>,
	{
		let input: Vec<usize> = self.alphabet.encode(input)?;

		let mut current: BTreeSet<usize> = self.initial_closure();
		for (i, &symbol) in input.iter().enumerate() {
			current = self.advance(&current, symbol);
			trace!("after symbol {i}: {current:?}");
			if current.is_empty() {
				break;
			}
		}

		Ok(!current.is_disjoint(&self.finals))
	}

	pub fn accepts_empty(&self) -> bool {
		!self.initial_closure().is_disjoint(&self.finals)
	}

	/// Subset construction.
	///
	/// Only subsets reachable from the closure of the initial state are materialized;
	/// they are numbered in breadth-first discovery order.
	/// The empty subset, if reached, becomes a non-final trap state.
	pub fn to_dfa(&self) -> Dfa<S> {
		let width: usize = self.alphabet.len();

		let initial: BTreeSet<usize> = self.initial_closure();
		let mut names: BTreeMap<BTreeSet<usize>, usize> = BTreeMap::from([(initial.clone(), 0)]);
		let mut subsets: Vec<BTreeSet<usize>> = vec![initial];
		let mut transitions: TransitionTable<usize> = TransitionTable::new(width);
		transitions.push_state(0);

		// New subsets are appended to `subsets` inside the loop.
		let mut i: usize = 0;
		while i < subsets.len() {
			for symbol in 0..width {
				let next: BTreeSet<usize> = self.advance(&subsets[i], symbol);
				let target: usize = match names.get(&next) {
					Some(&target) => target,
					None => {
						let target: usize = transitions.push_state(0);
						names.insert(next.clone(), target);
						subsets.push(next);
						target
					},
				};
				transitions[(i, symbol)] = target;
			}
			i += 1;
		}

		let mut finals: BTreeSet<usize> = subsets
			.iter()
			.enumerate()
			.filter(|(_, subset)| !subset.is_disjoint(&self.finals))
			.map(|(i, _)| i)
			.collect::<BTreeSet<_>>();
		// The empty word is accepted without consuming anything.
		if self.accepts_empty() {
			finals.insert(0);
		}

		debug!(
			"subset construction: {} NFA states became {} DFA states",
			self.num_states(),
			subsets.len()
		);

		Dfa::from_parts(self.alphabet.clone(), transitions, finals)
	}

	fn initial_closure(&self) -> BTreeSet<usize> {
		self.epsilon_closure(&BTreeSet::from([0]))
	}

	/// Labeled step from every state of an already closed set, then closure.
	fn advance(&self, states: &BTreeSet<usize>, symbol: usize) -> BTreeSet<usize> {
		let mut next: BTreeSet<usize> = BTreeSet::new();
		for &state in states.iter() {
			next.extend(self.transitions[(state, symbol)].iter().copied());
		}
		self.epsilon_closure(&next)
	}
}

impl<S: Symbol> NfaBuilder<S> {
	pub fn new(alphabet: Alphabet<S>) -> Self {
		let width: usize = alphabet.len();
		Self {
			alphabet,
			transitions: TransitionTable::new(width),
			epsilon: Vec::new(),
			finals: BTreeSet::new(),
		}
	}

	pub fn alphabet(&self) -> &Alphabet<S> {
		&self.alphabet
	}

	pub fn num_states(&self) -> usize {
		self.epsilon.len()
	}

	pub fn add_state(&mut self) -> usize {
		self.epsilon.push(BTreeSet::new());
		self.transitions.push_state(BTreeSet::new())
	}

	pub fn add_transition(&mut self, from: usize, symbol: &S, to: usize) -> Result<(), ConstructionError> {
		check_state(self.num_states(), from)?;
		check_state(self.num_states(), to)?;
		let symbol: usize = self.alphabet.require(symbol)?;
		self.transitions[(from, symbol)].insert(to);
		Ok(())
	}

	pub fn add_epsilon(&mut self, from: usize, to: usize) -> Result<(), ConstructionError> {
		check_state(self.num_states(), from)?;
		check_state(self.num_states(), to)?;
		self.epsilon[from].insert(to);
		Ok(())
	}

	pub fn mark_final(&mut self, state: usize) -> Result<(), ConstructionError> {
		self.finals.insert(check_state(self.num_states(), state)?);
		Ok(())
	}

	/// Copies every state and transition of `nfa`, shifted by the current state count,
	/// and returns that shift. Final states of `nfa` are not carried over.
	pub fn splice(&mut self, nfa: &Nfa<S>) -> Result<usize, ConstructionError> {
		if nfa.alphabet != self.alphabet {
			return Err(ConstructionError::AlphabetMismatch);
		}

		let offset: usize = self.num_states();
		for state in 0..nfa.num_states() {
			let new: usize = self.add_state();
			for symbol in 0..self.alphabet.len() {
				self.transitions[(new, symbol)] = nfa.transitions[(state, symbol)]
					.iter()
					.map(|&target| target + offset)
					.collect::<BTreeSet<_>>();
			}
			self.epsilon[new] = nfa.epsilon[state]
				.iter()
				.map(|&target| target + offset)
				.collect::<BTreeSet<_>>();
		}

		Ok(offset)
	}

	pub fn build(self) -> Result<Nfa<S>, ConstructionError> {
		if self.num_states() == 0 {
			return Err(ConstructionError::NoStates);
		}
		Ok(self.finish())
	}

	fn finish(self) -> Nfa<S> {
		Nfa {
			alphabet: self.alphabet,
			transitions: self.transitions,
			epsilon: self.epsilon,
			finals: self.finals,
		}
	}
}
