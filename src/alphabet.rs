use crate::error::AlphabetError;
use crate::error::ConstructionError;

/// Anything discrete and totally ordered can be an input symbol.
pub trait Symbol: Clone + Ord + std::fmt::Debug {}

impl<T> Symbol for T where T: Clone + Ord + std::fmt::Debug {}

/// Finite set of symbols with a dense index: a symbol's index is its rank in sorted order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Alphabet<S: Symbol> {
	symbols: Vec<S>,
}

/// Row-major backing store holding one `T` per (state, symbol index) pair.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransitionTable<T: Clone> {
	width: usize,
	states: usize,
	cells: Vec<T>,
}

impl<S: Symbol> Alphabet<S> {
	pub fn new<I>(symbols: I) -> Self
	where
		I: IntoIterator<Item = S>,
	{
		let mut symbols: Vec<S> = symbols.into_iter().collect::<Vec<_>>();
		symbols.sort();
		symbols.dedup();
		Self { symbols }
	}

	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	pub fn contains(&self, symbol: &S) -> bool {
		self.index_of(symbol).is_some()
	}

	pub fn index_of(&self, symbol: &S) -> Option<usize> {
		self.symbols.binary_search(symbol).ok()
	}

	pub fn symbol(&self, index: usize) -> &S {
		&self.symbols[index]
	}

	pub fn iter(&self) -> std::slice::Iter<'_, S> {
		self.symbols.iter()
	}

	pub(crate) fn require(&self, symbol: &S) -> Result<usize, ConstructionError> {
		self.index_of(symbol).ok_or_else(|| ConstructionError::UnknownSymbol {
			symbol: format!("{symbol:?}"),
		})
	}

	/// Maps a query input onto symbol indices, rejecting the first symbol outside the alphabet.
	pub(crate) fn encode<I>(&self, input: I) -> Result<Vec<usize>, AlphabetError>
	where
		I: IntoIterator<Item = S>,
	{
		input
			.into_iter()
			.enumerate()
			.map(|(position, symbol)| {
				self.index_of(&symbol).ok_or_else(|| AlphabetError {
					symbol: format!("{symbol:?}"),
					position,
				})
			})
			.collect::<Result<Vec<_>, _>>()
	}
}

impl<S: Symbol> FromIterator<S> for Alphabet<S> {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self::new(iter)
	}
}

impl<'a, S: Symbol> IntoIterator for &'a Alphabet<S> {
	type Item = &'a S;
	type IntoIter = std::slice::Iter<'a, S>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

impl<T: Clone> TransitionTable<T> {
	pub fn new(width: usize) -> Self {
		Self {
			width,
			states: 0,
			cells: Vec::new(),
		}
	}

	pub fn filled(states: usize, width: usize, fill: T) -> Self {
		Self {
			width,
			states,
			cells: vec![fill; states * width],
		}
	}

	/// Appends a state whose every cell is `fill`; returns its index.
	pub fn push_state(&mut self, fill: T) -> usize {
		self.cells.extend(std::iter::repeat_n(fill, self.width));
		self.states += 1;
		self.states - 1
	}

	pub fn num_states(&self) -> usize {
		self.states
	}

	pub fn width(&self) -> usize {
		self.width
	}

	pub fn row(&self, state: usize) -> &[T] {
		&self.cells[state * self.width..(state + 1) * self.width]
	}
}

impl<T: Clone> std::ops::Index<(usize, usize)> for TransitionTable<T> {
	type Output = T;

	fn index(&self, (state, symbol): (usize, usize)) -> &Self::Output {
		assert!(symbol < self.width);
		&self.cells[state * self.width + symbol]
	}
}

impl<T: Clone> std::ops::IndexMut<(usize, usize)> for TransitionTable<T> {
	fn index_mut(&mut self, (state, symbol): (usize, usize)) -> &mut Self::Output {
		assert!(symbol < self.width);
		&mut self.cells[state * self.width + symbol]
	}
}
