use crate::classifier::Classifier;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::collections::HashMap;
use std::ops::Range;
use rand::seq::SliceRandom;
use rand::Rng;
use ordered_float::OrderedFloat;

/// A view over the rows of a [`Builder`]. Sorting and splitting only permute
/// the view's row index; the column data is shared.
#[derive(Clone, Debug)]
pub struct Dataset<'a> {
	columns: &'a [Vec<f64>],
	targets: &'a [usize],
	classes: &'a [String],

	index: Vec<usize>,
	range: Range<usize>,
}

impl<'a, 'b> Dataset<'a> {
	/// Fraction of rows the classifier labels correctly.
	pub fn evaluate<C: Classifier + Sync>(&self, classifier: &C) -> f64 {
		if self.rows_len() == 0 {
			return 0.0;
		}

		self.rows()
			.zip(self.targets())
			.collect::<Vec<_>>()
			.into_par_iter()
			.filter(|(x, y)| classifier.predict(x) == *y)
			.count() as f64 / self.rows_len() as f64
	}

	pub fn sort(&mut self, column: usize) {
		let values = &self.columns[column];
		self.index[self.range.start..self.range.end]
			.sort_by_key(|&x| OrderedFloat(values[x]));
	}

	/// Candidate thresholds for a column the view is sorted on. Each item is
	/// the number of rows left of the threshold and the threshold itself.
	pub fn get_splits(&'b self, column: usize) -> impl 'b + Iterator<Item = (usize, f64)> {
		let column = &self.columns[column];

		self.indices()
			.map(move |x| column[x])
			.enumerate()
			.scan(None, |prev: &mut Option<f64>, (i, x)| {
				let split = match *prev {
					Some(y) if (x - y).abs() > f64::EPSILON => Some((i, (x + y) / 2.0)),
					_ => None,
				};
				*prev = Some(x);

				Some(split)
			})
			.flatten()
	}

	pub fn split<F, T>(&mut self, row: usize, mut f: F) -> (T, T)
	where
		F: FnMut(&mut Self) -> T,
	{
		let row = row + self.range.start;
		let original = self.range.clone();

		self.range.end = row;
		let left = f(self);
		self.range.end = original.end;

		self.range.start = row;
		let right = f(self);
		self.range.start = original.start;

		(left, right)
	}

	/// Stratified split. Every class contributes `round(count * test_rate)`
	/// rows to the test partition. Returns `(train, test)`.
	pub fn train_test_split<R: Rng + ?Sized>(mut self, rng: &mut R, test_rate: f64) -> (Self, Self) {
		let mut by_class = vec![Vec::new(); self.classes.len()];
		for i in self.indices() {
			by_class[self.targets[i]].push(i);
		}

		let mut test_index = Vec::new();
		let mut train_index = Vec::new();

		for mut rows in by_class {
			rows.shuffle(rng);
			let test_num = (rows.len() as f64 * test_rate).round() as usize;
			let (test, train) = rows.split_at(test_num.min(rows.len()));
			test_index.extend_from_slice(test);
			train_index.extend_from_slice(train);
		}

		test_index.shuffle(rng);
		train_index.shuffle(rng);

		let test_num = test_index.len();
		test_index.extend(train_index);
		self.range = 0..test_index.len();
		self.index = test_index;

		let mut train = self.clone();
		let mut test = self;
		test.range.end = test_num;
		train.range.start = test_num;

		(train, test)
	}

	/// Samples `max_samples` rows with replacement.
	pub fn bootstrap<R: Rng + ?Sized>(&self, rng: &mut R, max_samples: usize) -> Self {
		let samples = std::cmp::min(max_samples, self.rows_len());

		let range = 0..samples;
		let index = range
			.clone()
			.map(|_| self.index[rng.gen_range(self.range.start, self.range.end)])
			.collect::<Vec<_>>();

		Self {
			index,
			range,
			columns: self.columns,
			targets: self.targets,
			classes: self.classes,
		}
	}

	fn indices(&'b self) -> impl 'b + Iterator<Item = usize> + Clone {
		self.index[self.range.start..self.range.end]
			.iter()
			.copied()
	}

	pub fn targets(&'b self) -> impl 'b + Iterator<Item = usize> {
		self.indices()
			.map(move |i| self.targets[i])
	}

	pub fn column(&'b self, column: usize) -> impl 'b + Iterator<Item = f64> {
		let column = &self.columns[column];

		self.indices()
			.map(move |i| column[i])
	}

	pub fn classes(&self) -> &'a [String] {
		self.classes
	}

	pub fn n_classes(&self) -> usize {
		self.classes.len()
	}

	pub fn features_len(&self) -> usize {
		self.columns.len()
	}

	pub fn rows_len(&self) -> usize {
		self.range.end - self.range.start
	}

	pub fn rows(&'b self) -> impl 'b + Iterator<Item = Vec<f64>> {
		self.indices().map(move |i| {
			(0..self.columns.len())
				.map(|j| self.columns[j][i])
				.collect()
		})
	}

	/// Row count per class, in class index order.
	pub fn class_counts(&self) -> Vec<usize> {
		crate::functions::histogram(self.targets(), self.n_classes()).0
	}
}

/// Accumulates labeled rows column by column. Labels are interned in order of
/// first appearance, which fixes the class index of every crop.
#[derive(Debug, Default)]
pub struct Builder {
	columns: Vec<Vec<f64>>,
	targets: Vec<usize>,
	classes: Vec<String>,
	lookup: HashMap<String, usize>,
}

impl Builder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn build(&self) -> Dataset<'_> {
		let range = 0..self.targets.len();

		Dataset {
			columns: &self.columns,
			targets: &self.targets,
			classes: &self.classes,

			range: range.clone(),
			index: range.collect(),
		}
	}

	pub fn add(&mut self, x: &[f64], label: &str) {
		if self.columns.is_empty() {
			self.columns = vec![Vec::new(); x.len()];
		}

		for (column, value) in self.columns.iter_mut().zip(x) {
			column.push(*value);
		}

		let target = match self.lookup.get(label) {
			Some(&target) => target,
			None => {
				self.classes.push(label.to_string());
				self.lookup.insert(label.to_string(), self.classes.len() - 1);
				self.classes.len() - 1
			}
		};

		self.targets.push(target);
	}

	pub fn classes(&self) -> &[String] {
		&self.classes
	}

	pub fn rows_len(&self) -> usize {
		self.targets.len()
	}

	pub fn features_len(&self) -> usize {
		self.columns.len()
	}
}
