//! HTTP surface of the recommendation service (warp-based).

use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

use crate::predict::{self, PredictError, Recommendation};
use crate::random_forest::RandomForestClassifier;

/// The model loaded at startup, or `None` when loading failed. Never replaced
/// afterwards.
pub type SharedModel = Option<Arc<RandomForestClassifier>>;

/// Loads the artifact at `path`. A missing or unreadable file is logged and
/// yields `None`, so the service still starts and answers health checks.
pub fn load_model(path: &Path) -> SharedModel {
	match RandomForestClassifier::load(path) {
		Ok(model) => {
			info!(
				path = %path.display(),
				crops = model.classes().len(),
				trees = model.trees_len(),
				"model loaded successfully"
			);
			Some(Arc::new(model))
		}
		Err(e) => {
			error!(path = %path.display(), error = %e, "error loading model");
			None
		}
	}
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
	pub status: String,
	pub message: String,
	pub model_loaded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
	pub success: bool,
	pub primary_crop: String,
	pub primary_confidence: f64,
	pub other_recommendations: Vec<Recommendation>,
	pub input_parameters: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub success: bool,
	pub message: String,
}

// =============================================================================
// Routes
// =============================================================================

pub fn routes(model: SharedModel) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
	let health = warp::path("health")
		.and(warp::path::end())
		.and(warp::get())
		.and(with_model(model.clone()))
		.and_then(handle_health);

	let predict = warp::path("predict")
		.and(warp::path::end())
		.and(warp::post())
		.and(warp::body::bytes())
		.and(with_model(model))
		.and_then(handle_predict);

	let cors = warp::cors()
		.allow_any_origin()
		.allow_methods(vec!["GET", "POST", "OPTIONS"])
		.allow_headers(vec!["content-type"]);

	health
		.or(predict)
		.with(cors)
		.with(warp::trace::request())
}

fn with_model(model: SharedModel) -> impl Filter<Extract = (SharedModel,), Error = Infallible> + Clone {
	warp::any().map(move || model.clone())
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_health(model: SharedModel) -> Result<impl Reply, Infallible> {
	let resp = HealthResponse {
		status: "OK".to_string(),
		message: "ML Service is running".to_string(),
		model_loaded: model.is_some(),
	};

	Ok(warp::reply::with_status(warp::reply::json(&resp), StatusCode::OK))
}

async fn handle_predict(body: Bytes, model: SharedModel) -> Result<warp::reply::Response, Infallible> {
	match predict(body, model).await {
		Ok(resp) => Ok(warp::reply::with_status(warp::reply::json(&resp), StatusCode::OK).into_response()),
		Err(err) => Ok(error_response(err)),
	}
}

async fn predict(body: Bytes, model: SharedModel) -> Result<PredictResponse, PredictError> {
	let model = model.ok_or(PredictError::ModelUnavailable)?;

	let input: Map<String, Value> = serde_json::from_slice(&body)
		.map_err(|e| PredictError::InvalidValue(e.to_string()))?;
	let record = predict::parse_features(&input)?;

	let ranking = tokio::task::spawn_blocking(move || predict::recommend(&model, &record))
		.await
		.map_err(|e| PredictError::Unexpected(e.to_string()))??;

	Ok(PredictResponse {
		success: true,
		primary_crop: ranking.primary.crop,
		primary_confidence: ranking.primary.confidence,
		other_recommendations: ranking.others,
		input_parameters: input,
	})
}

// =============================================================================
// Helpers
// =============================================================================

fn error_response(err: PredictError) -> warp::reply::Response {
	let status = if err.is_client_error() {
		warn!(error = %err, "rejected prediction request");
		StatusCode::BAD_REQUEST
	} else {
		error!(error = %err, "prediction failed");
		StatusCode::INTERNAL_SERVER_ERROR
	};

	let body = ErrorResponse {
		success: false,
		message: err.to_string(),
	};
	warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures;
	use serde_json::json;

	fn loaded() -> SharedModel {
		Some(Arc::new(fixtures::trained_model()))
	}

	fn sample() -> Value {
		json!({
			"N": 90, "P": 42, "K": 43,
			"temperature": 20.87, "humidity": 82.00, "ph": 6.50, "rainfall": 202.93
		})
	}

	async fn post(model: SharedModel, body: &Value) -> (StatusCode, Value) {
		let resp = warp::test::request()
			.method("POST")
			.path("/predict")
			.json(body)
			.reply(&routes(model))
			.await;

		(resp.status(), serde_json::from_slice(resp.body()).unwrap())
	}

	#[tokio::test]
	async fn test_health_without_model() {
		let resp = warp::test::request()
			.method("GET")
			.path("/health")
			.reply(&routes(None))
			.await;

		assert_eq!(resp.status(), StatusCode::OK);
		let body: HealthResponse = serde_json::from_slice(resp.body()).unwrap();
		assert_eq!(body.status, "OK");
		assert!(!body.model_loaded);
	}

	#[tokio::test]
	async fn test_health_with_model() {
		let resp = warp::test::request()
			.method("GET")
			.path("/health")
			.reply(&routes(loaded()))
			.await;

		let body: HealthResponse = serde_json::from_slice(resp.body()).unwrap();
		assert!(body.model_loaded);
	}

	#[tokio::test]
	async fn test_predict_without_model() {
		let (status, body) = post(None, &sample()).await;

		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(body["success"], json!(false));
		assert_eq!(body["message"], json!("Model not loaded. Please train the model first."));
	}

	#[tokio::test]
	async fn test_predict_sample() {
		let model = loaded();
		let classes = model.as_ref().unwrap().classes().to_vec();
		let (status, body) = post(model, &sample()).await;

		assert_eq!(status, StatusCode::OK);
		let body: PredictResponse = serde_json::from_value(body).unwrap();
		assert!(body.success);
		assert!(classes.contains(&body.primary_crop));
		assert_eq!(body.other_recommendations.len(), 2);
		for other in &body.other_recommendations {
			assert!(classes.contains(&other.crop));
			assert!(other.confidence >= 0.0 && other.confidence <= 100.0);
			assert!(body.primary_confidence >= other.confidence);
		}
		assert_eq!(Value::Object(body.input_parameters), sample());
	}

	#[tokio::test]
	async fn test_predict_is_repeatable() {
		let model = loaded();
		let (_, first) = post(model.clone(), &sample()).await;
		let (_, second) = post(model, &sample()).await;

		assert_eq!(first, second);
	}

	#[tokio::test]
	async fn test_predict_accepts_numeric_strings() {
		let body = json!({
			"N": "90", "P": "42", "K": "43",
			"temperature": "20.87", "humidity": "82", "ph": "6.5", "rainfall": "202.93"
		});
		let (status, resp) = post(loaded(), &body).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(resp["input_parameters"], body);
	}

	#[tokio::test]
	async fn test_predict_echoes_extra_fields() {
		let mut body = sample();
		body["location"] = json!("north field");
		let (status, resp) = post(loaded(), &body).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(resp["input_parameters"]["location"], json!("north field"));
	}

	#[tokio::test]
	async fn test_predict_missing_field() {
		for field in crate::features::FEATURE_NAMES.iter() {
			let mut body = sample();
			body.as_object_mut().unwrap().remove(*field);
			let (status, resp) = post(loaded(), &body).await;

			assert_eq!(status, StatusCode::BAD_REQUEST);
			assert_eq!(resp["success"], json!(false));
			assert_eq!(resp["message"], json!(format!("Missing required field: {}", field)));
		}
	}

	#[tokio::test]
	async fn test_predict_invalid_value() {
		let mut body = sample();
		body["temperature"] = json!("abc");
		let (status, resp) = post(loaded(), &body).await;

		assert_eq!(status, StatusCode::BAD_REQUEST);
		let message = resp["message"].as_str().unwrap();
		assert!(message.starts_with("Invalid input values:"));
		assert!(message.contains("temperature"));
	}

	#[tokio::test]
	async fn test_predict_malformed_body() {
		let resp = warp::test::request()
			.method("POST")
			.path("/predict")
			.body("N=90&P=42")
			.reply(&routes(loaded()))
			.await;

		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
		let body: ErrorResponse = serde_json::from_slice(resp.body()).unwrap();
		assert!(!body.success);
	}

	#[tokio::test]
	async fn test_predict_with_too_few_crops() {
		let mut builder = crate::dataset::Builder::new();
		for i in 0..10 {
			let x = [i as f64; 7];
			builder.add(&x, if i < 5 { "rice" } else { "maize" });
		}
		let model = crate::random_forest::RandomForestBuilder {
			n_trees: 3,
			..Default::default()
		}.fit(&builder.build());

		let (status, resp) = post(Some(Arc::new(model)), &sample()).await;

		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		assert!(resp["message"].as_str().unwrap().starts_with("Prediction error:"));
	}

	#[tokio::test]
	async fn test_predict_large_body() {
		let mut body = sample();
		body["notes"] = json!("x".repeat(20_000));
		let (status, resp) = post(loaded(), &body).await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(resp["input_parameters"]["notes"].as_str().map(str::len), Some(20_000));
	}

	#[test]
	fn load_model_from_valid_artifact() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crop_model.pkl");
		let model = fixtures::trained_model();
		model.save(&path).unwrap();

		let loaded = load_model(&path).unwrap();
		assert_eq!(*loaded, model);
	}

	#[test]
	fn load_model_tolerates_corrupt_artifact() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crop_model.pkl");
		std::fs::write(&path, b"\x80\x04\x95 not a forest").unwrap();

		assert!(load_model(&path).is_none());
	}

	#[test]
	fn load_model_tolerates_missing_artifact() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load_model(&dir.path().join("absent.pkl")).is_none());
	}

	#[tokio::test]
	async fn test_corrupt_artifact_serves_health_but_not_predict() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crop_model.pkl");
		std::fs::write(&path, b"CRF1\x00").unwrap();
		let model = load_model(&path);

		let resp = warp::test::request()
			.method("GET")
			.path("/health")
			.reply(&routes(model.clone()))
			.await;
		let body: HealthResponse = serde_json::from_slice(resp.body()).unwrap();
		assert!(!body.model_loaded);

		let (status, _) = post(model, &sample()).await;
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[tokio::test]
	async fn test_unknown_route() {
		let resp = warp::test::request()
			.method("GET")
			.path("/models")
			.reply(&routes(loaded()))
			.await;

		assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	}
}
