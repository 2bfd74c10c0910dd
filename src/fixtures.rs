//! Synthetic crop measurements shared by the unit tests.

use std::io::{self, Write};
use std::path::Path;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dataset::Builder;
use crate::features::FEATURE_NAMES;
use crate::random_forest::{RandomForestBuilder, RandomForestClassifier};

/// Cluster centres per crop, in feature order. The reference sample
/// `[90, 42, 43, 20.87, 82, 6.5, 202.93]` falls inside the rice cluster on
/// every feature.
pub const CROPS: [(&str, [f64; 7]); 4] = [
	("rice", [88.0, 42.0, 43.0, 21.0, 82.0, 6.5, 203.0]),
	("maize", [78.0, 48.0, 20.0, 24.0, 65.0, 5.8, 85.0]),
	("chickpea", [40.0, 67.0, 80.0, 18.0, 16.0, 7.3, 80.0]),
	("banana", [100.0, 82.0, 50.0, 27.0, 75.0, 6.0, 105.0]),
];

const ROWS_PER_CROP: usize = 50;

pub fn rows() -> Vec<(String, [f64; 7])> {
	let mut rng = StdRng::seed_from_u64(7);
	let mut rows = Vec::new();

	for _ in 0..ROWS_PER_CROP {
		for (label, centre) in CROPS.iter() {
			let mut x = *centre;
			for value in x.iter_mut() {
				*value *= 1.0 + rng.gen_range(-0.03, 0.03);
			}
			rows.push((label.to_string(), x));
		}
	}

	rows
}

pub fn crop_builder() -> Builder {
	let mut builder = Builder::new();
	for (label, x) in rows() {
		builder.add(&x, &label);
	}
	builder
}

pub fn trained_model() -> RandomForestClassifier {
	RandomForestBuilder {
		n_trees: 15,
		..RandomForestBuilder::default()
	}.fit(&crop_builder().build())
}

/// Writes the synthetic rows as a CSV file with the usual header.
pub fn write_csv(path: &Path) -> io::Result<()> {
	let mut file = std::fs::File::create(path)?;
	writeln!(file, "{},label", FEATURE_NAMES.join(","))?;

	for (label, x) in rows() {
		let values = x.iter().map(|v| v.to_string()).collect::<Vec<_>>();
		writeln!(file, "{},{}", values.join(","), label)?;
	}

	Ok(())
}
