use std::cmp::Reverse;
use ordered_float::OrderedFloat;

pub fn histogram(values: impl Iterator<Item = usize>, n_classes: usize) -> (Vec<usize>, usize) {
	let mut histogram = vec![0; n_classes];
	let mut len = 0;

	for value in values {
		histogram[value] += 1;
		len += 1;
	}

	(histogram, len)
}

pub fn gini_val(histogram: &[usize], len: usize) -> f64 {
	if len == 0 {
		return 0.0;
	}

	1.0 - histogram
		.iter()
		.map(|&n| (n as f64 / len as f64).powi(2))
		.sum::<f64>()
}

pub fn gini(values: impl Iterator<Item = usize>, n_classes: usize) -> f64 {
	let (histogram, len) = histogram(values, n_classes);
	gini_val(&histogram, len)
}

/// Relative class frequencies. An empty input yields a uniform distribution.
pub fn distribution(values: impl Iterator<Item = usize>, n_classes: usize) -> Vec<f64> {
	let (histogram, len) = histogram(values, n_classes);

	if len == 0 {
		return vec![1.0 / n_classes as f64; n_classes];
	}

	histogram
		.into_iter()
		.map(|n| n as f64 / len as f64)
		.collect()
}

/// Class indices ordered by descending probability. Equal probabilities keep
/// ascending index order.
pub fn rank(probabilities: &[f64]) -> Vec<usize> {
	let mut order = (0..probabilities.len()).collect::<Vec<_>>();
	order.sort_by_key(|&i| Reverse(OrderedFloat(probabilities[i])));
	order
}

pub fn argmax(probabilities: &[f64]) -> usize {
	rank(probabilities).first().copied().unwrap_or(0)
}
