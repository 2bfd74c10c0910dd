//! Offline training run: load the crop CSV, fit a forest, report its accuracy
//! and write the model artifact the server loads.

use std::io;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::DEFAULT_MODEL_PATH;
use crate::crop_data::{self, LoadError};
use crate::features::FeatureRecord;
use crate::predict::{self, PredictError, Ranking};
use crate::random_forest::{RandomForestBuilder, RandomForestClassifier};

pub const DATASET_PATH: &str = "data/Crop_recommendation.csv";

/// Smoke-test input run through the saved model after training.
pub const REFERENCE_SAMPLE: [f64; 7] = [90.0, 42.0, 43.0, 20.87, 82.00, 6.50, 202.93];

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
	#[error(transparent)]
	Load(#[from] LoadError),

	#[error("dataset has no rows")]
	NoRows,

	#[error("failed to save model to {}: {source}", .path.display())]
	Save { path: PathBuf, source: io::Error },

	#[error("failed to reload model from {}: {source}", .path.display())]
	Reload { path: PathBuf, source: io::Error },

	#[error("smoke test failed: {0}")]
	SmokeTest(#[from] PredictError),
}

#[derive(Debug, Clone)]
pub struct TrainConfig {
	pub dataset_path: PathBuf,
	pub model_path: PathBuf,
	pub test_rate: f64,
	pub split_seed: u64,
	pub forest: RandomForestBuilder,
}

impl Default for TrainConfig {
	fn default() -> Self {
		Self {
			dataset_path: PathBuf::from(DATASET_PATH),
			model_path: PathBuf::from(DEFAULT_MODEL_PATH),
			test_rate: 0.2,
			split_seed: 42,
			forest: RandomForestBuilder::default(),
		}
	}
}

#[derive(Debug, Clone)]
pub struct TrainReport {
	pub rows: usize,
	/// Header width of the source CSV.
	pub columns: usize,
	pub classes: Vec<String>,
	pub train_rows: usize,
	pub test_rows: usize,
	/// Test accuracy as a percentage.
	pub accuracy: f64,
	pub smoke_test: Ranking,
}

fn banner(title: &str) {
	println!("{}", "=".repeat(50));
	println!("{}", title);
	println!("{}", "=".repeat(50));
}

pub fn train(config: &TrainConfig) -> Result<TrainReport, TrainError> {
	banner("CROP RECOMMENDATION MODEL TRAINING");

	println!("\n[1] Loading dataset ...");
	let table = crop_data::read(&config.dataset_path)?;
	let builder = table.builder;
	if builder.rows_len() == 0 {
		return Err(TrainError::NoRows);
	}

	let dataset = builder.build();
	println!("Dataset loaded: {} rows, {} columns", builder.rows_len(), table.columns);
	println!("Crops in dataset: {}", builder.classes().len());
	println!("Crop distribution:");
	let mut distribution = builder.classes().iter().zip(dataset.class_counts()).collect::<Vec<_>>();
	distribution.sort_by(|(a, x), (b, y)| y.cmp(x).then_with(|| a.cmp(b)));
	for (crop, count) in distribution {
		println!("  {:<14} {}", crop, count);
	}

	println!("\n[2] Splitting data ({:.0}% train, {:.0}% test) ...", (1.0 - config.test_rate) * 100.0, config.test_rate * 100.0);
	let mut rng = StdRng::seed_from_u64(config.split_seed);
	let (train, test) = dataset.train_test_split(&mut rng, config.test_rate);
	println!("Training samples: {}", train.rows_len());
	println!("Testing samples: {}", test.rows_len());

	let forest = &config.forest;
	println!(
		"\n[3] Fitting random forest classifier [trees: {}, depth: {}, min split: {}, min leaf: {}] ...",
		forest.n_trees, forest.max_depth, forest.min_samples_split, forest.min_samples_leaf
	);
	let model = forest.fit(&train);
	info!(trees = model.trees_len(), classes = model.classes().len(), "training completed");

	println!("\n[4] Evaluating model ...");
	let accuracy = test.evaluate(&model) * 100.0;
	println!("Model Accuracy: {:.2}%", accuracy);

	println!("\n[5] Saving trained model ...");
	model.save(&config.model_path).map_err(|source| TrainError::Save {
		path: config.model_path.clone(),
		source,
	})?;
	println!("Model saved to: {}", config.model_path.display());

	println!("\n[6] Testing prediction with sample data ...");
	let saved = RandomForestClassifier::load(&config.model_path).map_err(|source| TrainError::Reload {
		path: config.model_path.clone(),
		source,
	})?;
	let smoke_test = predict::recommend(&saved, &FeatureRecord::from(REFERENCE_SAMPLE))?;

	let [n, p, k, temperature, humidity, ph, rainfall] = REFERENCE_SAMPLE;
	println!(
		"Sample Input: N={}, P={}, K={}, Temp={}, Humidity={}, pH={:.2}, Rainfall={}",
		n, p, k, temperature, humidity, ph, rainfall
	);
	println!(
		"Primary Recommendation: {} (Confidence: {:.2}%)",
		smoke_test.primary.crop, smoke_test.primary.confidence
	);
	let others = smoke_test
		.others
		.iter()
		.map(|r| format!("{} ({:.2}%)", r.crop, r.confidence))
		.collect::<Vec<_>>();
	println!("Other Recommendations: {}", others.join(", "));

	println!();
	banner("MODEL TRAINING COMPLETED SUCCESSFULLY");

	Ok(TrainReport {
		rows: builder.rows_len(),
		columns: table.columns,
		classes: saved.classes().to_vec(),
		train_rows: train.rows_len(),
		test_rows: test.rows_len(),
		accuracy,
		smoke_test,
	})
}
