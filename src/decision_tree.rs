use std::io::{self, Read, Write};
use rand::Rng;
use rand::seq::SliceRandom as _;

use crate::dataset::Dataset;
use crate::node::{Node, Split};
use crate::functions::{self, gini, gini_val, distribution};

// Sliding window of gini
// https://arxiv.org/pdf/1403.6348.pdf
struct SlidingGini {
	n: usize,
	ni: Vec<usize>,
	g: f64
}

impl SlidingGini {
	pub fn new(targets: impl Iterator<Item = usize>, n_classes: usize) -> Self {
		let (histogram, len) = functions::histogram(targets, n_classes);

		Self {
			n: len,
			g: gini_val(&histogram, len),
			ni: histogram,
		}
	}

	pub fn empty(n_classes: usize) -> Self {
		Self {
			n: 0,
			ni: vec![0; n_classes],
			g: 0.0,
		}
	}

	pub fn inc(&mut self, class: usize) {
		self.ni[class] += 1;
		self.n += 1;
		let entry = self.ni[class] as f64;
		self.g = 1.0 - 1.0 / (self.n as f64).powi(2) * (((self.n - 1) as f64).powi(2) * (1.0 - self.g) + 2.0 * entry - 1.0);
	}

	pub fn dec(&mut self, class: usize) {
		self.ni[class] -= 1;
		self.n -= 1;

		if self.n == 0 {
			self.g = 0.0;
			return;
		}

		let entry = self.ni[class] as f64;
		self.g = 1.0 - 1.0 / (self.n as f64).powi(2) * (((self.n + 1) as f64).powi(2) * (1.0 - self.g) - 2.0 * entry - 1.0);
	}

	pub fn gini(&self) -> f64 {
		self.g
	}
}

struct NodeBuilder<R> {
	max_features: usize,
	max_depth: usize,
	min_samples_split: usize,
	min_samples_leaf: usize,
	n_classes: usize,
	rng: R
}

impl<R: Rng> NodeBuilder<R> {
	fn build(&mut self, dataset: &mut Dataset, depth: usize) -> Node {
		if depth > self.max_depth || dataset.rows_len() < self.min_samples_split {
			return self.leaf(dataset);
		}

		let impurity = gini(dataset.targets(), self.n_classes);
		if impurity <= f64::EPSILON {
			return self.leaf(dataset);
		}

		let rows_len = dataset.rows_len();
		let mut best_split: Option<Split> = None;
		let mut best_gain = f64::MIN;
		let columns = (0..dataset.features_len()).collect::<Vec<usize>>();
		let max_features = std::cmp::min(columns.len(), self.max_features);

		for &column in columns.choose_multiple(&mut self.rng, max_features) {
			dataset.sort(column);

			let targets = dataset.targets().collect::<Vec<_>>();
			let mut left = SlidingGini::empty(self.n_classes);
			let mut right = SlidingGini::new(targets.iter().copied(), self.n_classes);
			let mut moved = 0;

			for (row, value) in dataset.get_splits(column) {
				for &class in &targets[moved..row] {
					left.inc(class);
					right.dec(class);
				}
				moved = row;

				if row < self.min_samples_leaf || rows_len - row < self.min_samples_leaf {
					continue;
				}

				let ratio_l = row as f64 / rows_len as f64;
				let ratio_r = 1.0 - ratio_l;

				let gain = impurity - (ratio_l * left.gini() + ratio_r * right.gini());

				if best_gain < gain {
					best_split = Some(Split { column, value });
					best_gain = gain;
				}
			}
		}

		if let Some(split) = best_split {
			self.build_children(dataset, split, depth)
		} else {
			self.leaf(dataset)
		}
	}

	fn build_children(&mut self, dataset: &mut Dataset, split: Split, depth: usize) -> Node {
		dataset.sort(split.column);

		let split_row = dataset
			.column(split.column)
			.take_while(|&f| f <= split.value)
			.count();

		// A midpoint can round onto one of its neighbours.
		if split_row == 0 || split_row == dataset.rows_len() {
			return self.leaf(dataset);
		}

		let (left, right) = dataset.split(split_row, |x| Box::new(self.build(x, depth + 1)));

		Node::Children {
			left, right, split
		}
	}

	fn leaf(&self, dataset: &Dataset) -> Node {
		Node::Leaf(distribution(dataset.targets(), self.n_classes))
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
	root: Node,
}

impl DecisionTree {
	pub fn predict_proba(&self, x: &[f64]) -> &[f64] {
		self.root.predict(x)
	}

	pub fn leaves(&self) -> usize {
		self.root.leaves()
	}

	pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
		self.root.serialize(writer)
	}

	pub fn deserialize<R: Read>(reader: &mut R, n_features: usize, n_classes: usize) -> io::Result<Self> {
		let root = Node::deserialize(reader, n_features, n_classes)?;

		Ok(Self {
			root
		})
	}
}

pub struct DecisionTreeBuilder {
	pub max_features: Option<usize>,
	pub max_depth: usize,
	pub min_samples_split: usize,
	pub min_samples_leaf: usize,
}

impl Default for DecisionTreeBuilder {
	fn default() -> Self {
		Self {
			max_features: None,
			max_depth: 32,
			min_samples_split: 2,
			min_samples_leaf: 1,
		}
	}
}

impl DecisionTreeBuilder {
	pub fn fit<R: Rng + ?Sized>(&self, rng: &mut R, mut dataset: Dataset) -> DecisionTree {
		let max_features = self.max_features.unwrap_or(dataset.features_len());
		let root = (NodeBuilder {
			max_features,
			max_depth: self.max_depth,
			min_samples_split: self.min_samples_split.max(2),
			min_samples_leaf: self.min_samples_leaf.max(1),
			n_classes: dataset.n_classes(),
			rng
		}).build(&mut dataset, 1);

		DecisionTree { root }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dataset::Builder;
	use rand::rngs::StdRng;
	use rand::SeedableRng;

	#[test]
	fn sliding_gini_matches_direct_gini() {
		let targets = [0, 1, 1, 2, 0, 2, 2, 1];
		let mut left = SlidingGini::empty(3);
		let mut right = SlidingGini::new(targets.iter().copied(), 3);

		for (i, &class) in targets.iter().enumerate().take(targets.len() - 1) {
			left.inc(class);
			right.dec(class);

			let expected_l = gini(targets[..=i].iter().copied(), 3);
			let expected_r = gini(targets[i + 1..].iter().copied(), 3);
			assert!((left.gini() - expected_l).abs() < 1e-9);
			assert!((right.gini() - expected_r).abs() < 1e-9);
		}
	}

	#[test]
	fn separates_two_clusters() {
		let mut builder = Builder::new();
		for i in 0..20 {
			builder.add(&[i as f64, 0.0], "low");
			builder.add(&[100.0 + i as f64, 0.0], "high");
		}

		let mut rng = StdRng::seed_from_u64(1);
		let tree = DecisionTreeBuilder::default().fit(&mut rng, builder.build());

		assert_eq!(tree.predict_proba(&[5.0, 0.0]), &[1.0, 0.0]);
		assert_eq!(tree.predict_proba(&[150.0, 0.0]), &[0.0, 1.0]);
		assert_eq!(tree.leaves(), 2);
	}

	#[test]
	fn respects_min_samples_leaf() {
		let mut builder = Builder::new();
		builder.add(&[0.0], "odd");
		for i in 1..10 {
			builder.add(&[i as f64], "even");
		}

		let mut rng = StdRng::seed_from_u64(1);
		let tree = (DecisionTreeBuilder {
			min_samples_leaf: 2,
			..DecisionTreeBuilder::default()
		}).fit(&mut rng, builder.build());

		let p = tree.predict_proba(&[0.0]);
		assert!(p[0] < 1.0);
		assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
	}

	#[test]
	fn depth_limit_yields_single_leaf() {
		let mut builder = Builder::new();
		for i in 0..10 {
			builder.add(&[i as f64], if i < 5 { "a" } else { "b" });
		}

		let mut rng = StdRng::seed_from_u64(1);
		let tree = (DecisionTreeBuilder {
			max_depth: 0,
			..DecisionTreeBuilder::default()
		}).fit(&mut rng, builder.build());

		assert_eq!(tree.leaves(), 1);
		assert_eq!(tree.predict_proba(&[0.0]), &[0.5, 0.5]);
	}
}
