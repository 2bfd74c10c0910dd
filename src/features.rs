/// Feature columns in the order the model sees them.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = ["N", "P", "K", "temperature", "humidity", "ph", "rainfall"];
pub const FEATURE_COUNT: usize = 7;
pub const LABEL_COLUMN: &str = "label";

/// Soil and weather measurements for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
	pub nitrogen: f64,
	pub phosphorus: f64,
	pub potassium: f64,
	pub temperature: f64,
	pub humidity: f64,
	pub ph: f64,
	pub rainfall: f64,
}

impl FeatureRecord {
	pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
		[
			self.nitrogen,
			self.phosphorus,
			self.potassium,
			self.temperature,
			self.humidity,
			self.ph,
			self.rainfall,
		]
	}
}

impl From<[f64; FEATURE_COUNT]> for FeatureRecord {
	fn from(x: [f64; FEATURE_COUNT]) -> Self {
		let [nitrogen, phosphorus, potassium, temperature, humidity, ph, rainfall] = x;

		Self { nitrogen, phosphorus, potassium, temperature, humidity, ph, rainfall }
	}
}
