//! Turning a request object into ranked crop recommendations.
//!
//! Input checking happens in two passes over [`FEATURE_NAMES`]. The first
//! pass only checks presence and stops at the first missing field. The second
//! coerces each value to `f64`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classifier::Classifier;
use crate::features::{FeatureRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::functions::rank;
use crate::random_forest::RandomForestClassifier;

/// Number of crops reported per prediction.
pub const TOP_K: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
	#[error("Model not loaded. Please train the model first.")]
	ModelUnavailable,

	#[error("Missing required field: {0}")]
	MissingField(&'static str),

	#[error("Invalid input values: {0}")]
	InvalidValue(String),

	#[error("Prediction error: {0}")]
	Unexpected(String),
}

impl PredictError {
	/// Whether the caller is at fault, as opposed to the service.
	pub fn is_client_error(&self) -> bool {
		matches!(self, PredictError::MissingField(_) | PredictError::InvalidValue(_))
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
	pub crop: String,
	/// Percentage rounded to two decimals.
	pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
	pub primary: Recommendation,
	pub others: Vec<Recommendation>,
}

pub fn parse_features(input: &Map<String, Value>) -> Result<FeatureRecord, PredictError> {
	if let Some(missing) = FEATURE_NAMES.iter().copied().find(|name| !input.contains_key(*name)) {
		return Err(PredictError::MissingField(missing));
	}

	let mut x = [0.0; FEATURE_COUNT];
	for (value, name) in x.iter_mut().zip(FEATURE_NAMES.iter()) {
		*value = coerce(name, &input[*name])?;
	}

	Ok(FeatureRecord::from(x))
}

fn coerce(name: &str, value: &Value) -> Result<f64, PredictError> {
	let number = match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
		_ => None,
	};

	match number {
		Some(x) if x.is_finite() => Ok(x),
		Some(_) => Err(PredictError::InvalidValue(format!("{}: value must be finite, got {}", name, value))),
		None => Err(PredictError::InvalidValue(format!("{}: could not convert {} to a number", name, value))),
	}
}

pub fn confidence(probability: f64) -> f64 {
	(probability * 10_000.0).round() / 100.0
}

/// Top [`TOP_K`] crops for `record`, most probable first.
pub fn recommend(model: &RandomForestClassifier, record: &FeatureRecord) -> Result<Ranking, PredictError> {
	if model.features_len() != FEATURE_COUNT {
		return Err(PredictError::Unexpected(format!(
			"model expects {} features, got {}",
			model.features_len(),
			FEATURE_COUNT
		)));
	}

	if model.classes().len() < TOP_K {
		return Err(PredictError::Unexpected(format!(
			"model knows {} crops, at least {} are required",
			model.classes().len(),
			TOP_K
		)));
	}

	let probabilities = model.predict_proba(&record.to_array());
	let mut top = rank(&probabilities)
		.into_iter()
		.take(TOP_K)
		.map(|i| Recommendation {
			crop: model.classes()[i].clone(),
			confidence: confidence(probabilities[i]),
		});

	let primary = top
		.next()
		.ok_or_else(|| PredictError::Unexpected("model returned no probabilities".to_string()))?;

	Ok(Ranking {
		primary,
		others: top.collect(),
	})
}
